//! CSV-over-HTTP catalog source.
//!
//! Fetches the sheet's CSV export, tolerates minor schema drift (renamed
//! or missing header columns fall back to positional fields), and never
//! fails: any transport or parse problem degrades to the placeholder
//! snapshot.

use async_trait::async_trait;
use dukkan_core::{
    catalog::{CatalogSnapshot, Product},
    config::CatalogConfig,
    error::DukkanError,
    traits::CatalogSource,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Catalog source backed by a spreadsheet CSV export URL.
pub struct SheetCatalog {
    client: reqwest::Client,
    sheet_url: String,
    policy_url: Option<String>,
}

impl SheetCatalog {
    /// Create from config values. The client carries the configured
    /// timeout so a slow sheet can never stall an orchestration run.
    pub fn from_config(config: &CatalogConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            sheet_url: config.sheet_url.clone(),
            policy_url: config.policy_url.clone(),
        }
    }

    async fn fetch_csv(&self) -> Result<String, DukkanError> {
        if self.sheet_url.is_empty() {
            return Err(DukkanError::Catalog("sheet_url is not configured".into()));
        }
        let resp = self
            .client
            .get(&self.sheet_url)
            .send()
            .await
            .map_err(|e| DukkanError::Catalog(format!("sheet request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(DukkanError::Catalog(format!(
                "sheet returned {}",
                resp.status()
            )));
        }
        resp.text()
            .await
            .map_err(|e| DukkanError::Catalog(format!("sheet body read failed: {e}")))
    }

    /// Fetch the optional remote policy override. Failure or an empty body
    /// just means no override.
    async fn fetch_policy(&self) -> Option<String> {
        let url = self.policy_url.as_ref()?;
        match self.client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => {
                    let body = body.trim().to_string();
                    if body.is_empty() {
                        None
                    } else {
                        debug!("catalog: loaded policy override ({} chars)", body.len());
                        Some(body)
                    }
                }
                Err(e) => {
                    warn!("catalog: policy body read failed: {e}");
                    None
                }
            },
            Ok(resp) => {
                warn!("catalog: policy fetch returned {}", resp.status());
                None
            }
            Err(e) => {
                warn!("catalog: policy fetch failed: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl CatalogSource for SheetCatalog {
    async fn fetch(&self) -> CatalogSnapshot {
        let csv = match self.fetch_csv().await {
            Ok(body) => body,
            Err(e) => {
                warn!("catalog: {e}; serving placeholder");
                return CatalogSnapshot::placeholder();
            }
        };

        let products = parse_products(&csv);
        if products.is_empty() && !csv.trim().is_empty() {
            debug!("catalog: sheet parsed to zero products");
        }

        let policy_override = self.fetch_policy().await;
        CatalogSnapshot::new(products, policy_override)
    }
}

/// Column indexes resolved from the header row, positional by default.
struct Columns {
    name: usize,
    price: usize,
    stock: usize,
    image: usize,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            name: 0,
            price: 1,
            stock: 2,
            image: 3,
        }
    }
}

/// Parse the CSV body into products.
///
/// The first row is treated as a header when any cell matches a known
/// column keyword; matched headers override the positional mapping, so a
/// reordered sheet still loads, and an unlabeled sheet falls back to the
/// (name, price, stock, image) order.
pub(crate) fn parse_products(csv: &str) -> Vec<Product> {
    let rows: Vec<Vec<String>> = csv
        .lines()
        .map(parse_csv_line)
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect();

    if rows.is_empty() {
        return Vec::new();
    }

    let mut columns = Columns::default();
    let mut data_start = 0;
    if let Some(header) = detect_header(&rows[0]) {
        columns = header;
        data_start = 1;
    }

    rows[data_start..]
        .iter()
        .filter_map(|row| {
            let cell = |idx: usize| row.get(idx).map(String::as_str).unwrap_or("").trim();
            let name = cell(columns.name);
            if name.is_empty() {
                return None;
            }
            let image = cell(columns.image);
            Some(Product {
                name: name.to_string(),
                price: cell(columns.price).to_string(),
                stock: cell(columns.stock).to_string(),
                image_url: if image.is_empty() {
                    None
                } else {
                    Some(image.to_string())
                },
            })
        })
        .collect()
}

/// Match the first row against known header keywords. Returns `None` when
/// the row looks like data.
fn detect_header(row: &[String]) -> Option<Columns> {
    let mut columns = Columns::default();
    let mut matched = false;

    for (idx, cell) in row.iter().enumerate() {
        let lower = cell.trim().to_lowercase();
        if lower.is_empty() {
            continue;
        }
        if lower.contains("name") || lower.contains("product") || lower.contains("اسم") {
            columns.name = idx;
            matched = true;
        } else if lower.contains("price") || lower.contains("سعر") {
            columns.price = idx;
            matched = true;
        } else if lower.contains("stock") || lower.contains("مخزون") || lower.contains("حالة")
        {
            columns.stock = idx;
            matched = true;
        } else if lower.contains("image") || lower.contains("url") || lower.contains("صورة") {
            columns.image = idx;
            matched = true;
        }
    }

    if matched {
        Some(columns)
    } else {
        None
    }
}

/// Split one CSV line into cells, honoring double-quoted fields with
/// embedded commas and `""` escapes.
fn parse_csv_line(line: &str) -> Vec<String> {
    let line = line.trim_end_matches('\r');
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    cell.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if cell.is_empty() => in_quotes = true,
            ',' if !in_quotes => {
                cells.push(cell.trim().to_string());
                cell = String::new();
            }
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}
