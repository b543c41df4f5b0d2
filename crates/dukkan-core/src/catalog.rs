use serde::{Deserialize, Serialize};

/// Fixed listing text used when the catalog could not be fetched.
/// Customers see grounding degrade, never a technical error.
pub const CATALOG_UNAVAILABLE: &str = "المخزون غير متوفر حالياً (صيانة).";

/// A single catalog product. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub price: String,
    pub stock: String,
    pub image_url: Option<String>,
}

/// A normalized, read-only view of the product list plus an optional
/// policy-text override, valid for one orchestration run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub products: Vec<Product>,
    /// Remote persona/policy text that overrides the configured default.
    pub policy_override: Option<String>,
    /// Set when the fetch failed and this is the degraded placeholder.
    pub unavailable: bool,
}

impl CatalogSnapshot {
    /// Build a snapshot from fetched products.
    pub fn new(products: Vec<Product>, policy_override: Option<String>) -> Self {
        Self {
            products,
            policy_override,
            unavailable: false,
        }
    }

    /// The deterministic degraded snapshot returned on any fetch or parse
    /// failure: empty product list, fixed maintenance listing.
    pub fn placeholder() -> Self {
        Self {
            products: Vec::new(),
            policy_override: None,
            unavailable: true,
        }
    }

    /// Render the human-readable product listing injected into the system
    /// instruction — one line per product, in the sheet's field order.
    pub fn render_listing(&self) -> String {
        if self.unavailable {
            return CATALOG_UNAVAILABLE.to_string();
        }
        if self.products.is_empty() {
            return "لا توجد منتجات في القائمة حالياً.".to_string();
        }

        let mut listing = String::new();
        for p in &self.products {
            listing.push_str(&format!(
                "المنتج: {} | السعر: {} | الحالة: {}",
                p.name, p.price, p.stock
            ));
            if let Some(ref url) = p.image_url {
                listing.push_str(&format!(" | الرابط: {url}"));
            }
            listing.push('\n');
        }
        listing.trim_end().to_string()
    }
}
