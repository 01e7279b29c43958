pub mod catalog;
pub mod config;
pub mod core;
pub mod stats;

pub use catalog::{Catalog, CatalogError, Product};
pub use config::SearchConfig;
pub use crate::core::{
    Fingerprint, FingerprintIndex, HttpImageSource, ImageHasher, ImageInput, ImageSource,
    IndexBuilder, IndexCache, ProductSummary, RankedResult, SearchEngine, SearchOutcome,
};
