//! # dukkan-catalog
//!
//! Fetches the remote product sheet (CSV export) and normalizes it into a
//! [`dukkan_core::catalog::CatalogSnapshot`] for one orchestration run.

mod sheet;

pub use sheet::SheetCatalog;
