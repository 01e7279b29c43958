use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::cache::IndexCache;
use super::fingerprint::Fingerprint;
use super::hasher::{ImageHasher, ImageInput};
use crate::catalog::Product;

/// The product fields a search result needs, as stored in the index file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(rename = "precio", default)]
    pub price: u64,
    #[serde(rename = "marca", default)]
    pub brand: String,
    #[serde(default)]
    pub link: String,
    #[serde(rename = "imagen", default)]
    pub image_url: String,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self {
            name: p.name.clone(),
            price: p.price,
            brand: p.brand.clone(),
            link: p.link.clone(),
            image_url: p.image_url.clone(),
        }
    }
}

impl fmt::Display for ProductSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - ${} - {}", self.name, self.price, self.brand)
    }
}

/// Fingerprint (canonical hex) to every product whose image hashed to it.
///
/// Keys are kept as strings because a loaded index may contain entries the
/// current parser rejects; those stay in place and rank last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintIndex {
    entries: BTreeMap<String, Vec<ProductSummary>>,
}

impl FingerprintIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fingerprint: Fingerprint, product: ProductSummary) {
        self.insert_raw(fingerprint.to_hex(), product);
    }

    pub(crate) fn insert_raw(&mut self, key: String, product: ProductSummary) {
        self.entries.entry(key).or_default().push(product);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct fingerprints.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn product_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn get(&self, fingerprint: Fingerprint) -> Option<&[ProductSummary]> {
        self.entries.get(&fingerprint.to_hex()).map(Vec::as_slice)
    }

    /// Entries in key order, products in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ProductSummary])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Builds the fingerprint index, reusing the persisted copy when allowed.
pub struct IndexBuilder<'a> {
    hasher: &'a ImageHasher,
    cache: &'a IndexCache,
    progress: ProgressBar,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(hasher: &'a ImageHasher, cache: &'a IndexCache) -> Self {
        Self {
            hasher,
            cache,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Return the cached index unless `force_rebuild`, otherwise fingerprint
    /// every product image again and persist the result.
    pub fn build(&self, products: &[Product], force_rebuild: bool) -> FingerprintIndex {
        if !force_rebuild {
            match self.cache.load() {
                Ok(Some(index)) => {
                    self.progress.finish_and_clear();
                    log::info!(
                        "Reusing fingerprint index from {} ({} fingerprints)",
                        self.cache.path().display(),
                        index.len()
                    );
                    return index;
                }
                Ok(None) => {}
                Err(e) => log::warn!("Ignoring fingerprint cache: {}", e),
            }
        }

        let index = self.rebuild(products);

        // An empty index means nothing could be fetched; keep it out of the
        // cache so the next run tries again.
        if index.is_empty() {
            log::warn!("No product images could be fingerprinted");
        } else if let Err(e) = self.cache.store(&index) {
            log::warn!(
                "Could not persist fingerprint index to {}: {}",
                self.cache.path().display(),
                e
            );
        }
        index
    }

    /// Fingerprint every product with an image URL. Unavailable images are skipped.
    pub fn rebuild(&self, products: &[Product]) -> FingerprintIndex {
        let with_images: Vec<&Product> = products.iter().filter(|p| p.has_image()).collect();
        self.progress.set_length(with_images.len() as u64);

        // `collect` keeps catalog order, so grouping does not depend on which
        // download finishes first.
        let hashed: Vec<Option<(Fingerprint, &Product)>> = with_images
            .par_iter()
            .map(|product| {
                let fp = self.hasher.fingerprint_of(ImageInput::Url(&product.image_url));
                self.progress.inc(1);
                fp.map(|fp| (fp, *product))
            })
            .collect();
        self.progress.finish_and_clear();

        let mut index = FingerprintIndex::new();
        let mut skipped = 0usize;
        for entry in hashed {
            match entry {
                Some((fp, product)) => index.insert(fp, ProductSummary::from(product)),
                None => skipped += 1,
            }
        }

        log::info!(
            "Indexed {} products under {} fingerprints ({} images unavailable, {} products without image)",
            index.product_count(),
            index.len(),
            skipped,
            products.len() - with_images.len()
        );
        index
    }
}
