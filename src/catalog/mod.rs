// Catalog loading: per-brand JSON files into uniform product records.

pub mod loader;
pub mod price;
pub mod product;

pub use loader::{Catalog, CatalogError};
pub use price::normalize_price;
pub use product::{Product, category_label};
