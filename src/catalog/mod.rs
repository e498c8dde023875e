//! Catalog snapshot
//!
//! - `index`: flat records → insertion-ordered nested index
//! - `service`: owner of the current snapshot (index + dialog graph)

mod index;
mod service;

pub use index::{BrandEntry, CatalogIndex, CategoryEntry, DepartmentEntry};
pub use service::{CatalogError, CatalogService, CatalogSnapshot};
