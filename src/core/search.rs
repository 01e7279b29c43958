use indicatif::ProgressBar;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use super::cache::IndexCache;
use super::fetch::{HttpImageSource, ImageSource};
use super::fingerprint::{Fingerprint, similarity_score};
use super::hasher::{ImageHasher, ImageInput};
use super::index::{FingerprintIndex, IndexBuilder, ProductSummary};
use crate::catalog::Product;
use crate::config::SearchConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    /// `1 - hamming / 64`; 1.0 means an identical fingerprint.
    pub score: f64,
    pub product: ProductSummary,
}

/// What a search produced. Callers tell "engine not ready" apart from
/// "nothing similar" by the variant, never by an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// No product image could be indexed.
    IndexUnavailable,
    /// The query image could not be read or decoded.
    QueryUnavailable,
    Matches(Vec<RankedResult>),
}

impl SearchOutcome {
    /// Ranked results, empty for the unavailable variants.
    pub fn results(&self) -> &[RankedResult] {
        match self {
            SearchOutcome::Matches(results) => results,
            _ => &[],
        }
    }

    pub fn into_results(self) -> Vec<RankedResult> {
        match self {
            SearchOutcome::Matches(results) => results,
            _ => Vec::new(),
        }
    }
}

/// Rank every indexed product by Hamming distance to `query`, closest first.
///
/// Products sharing a fingerprint share a distance. Ties keep index order
/// (fingerprint key order, then insertion order within a key).
pub fn rank(query: Fingerprint, index: &FingerprintIndex, top_n: usize) -> Vec<RankedResult> {
    if top_n == 0 {
        return Vec::new();
    }

    let mut candidates: Vec<(u32, &ProductSummary)> = index
        .iter()
        .flat_map(|(key, items)| {
            let distance = query.distance_to_key(key);
            items.iter().map(move |item| (distance, item))
        })
        .collect();

    // Stable sort keeps encounter order among equal distances.
    candidates.sort_by_key(|(distance, _)| *distance);
    candidates.truncate(top_n);

    candidates
        .into_iter()
        .map(|(distance, item)| RankedResult {
            score: similarity_score(distance),
            product: item.clone(),
        })
        .collect()
}

/// Visual product search: image hasher plus the persisted index.
pub struct SearchEngine {
    hasher: ImageHasher,
    cache: IndexCache,
}

impl SearchEngine {
    pub fn new(hasher: ImageHasher, cache: IndexCache) -> Self {
        Self { hasher, cache }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        let source = HttpImageSource::with_limit(config.fetch_timeout(), config.max_image_bytes);
        Self::new(
            ImageHasher::with_http(source),
            IndexCache::new(&config.cache_file),
        )
    }

    pub fn with_source(source: Arc<dyn ImageSource>, cache: IndexCache) -> Self {
        Self::new(ImageHasher::new(source), cache)
    }

    pub fn hasher(&self) -> &ImageHasher {
        &self.hasher
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    pub fn index_builder(&self) -> IndexBuilder<'_> {
        IndexBuilder::new(&self.hasher, &self.cache)
    }

    pub fn build_index(&self, products: &[Product], force_rebuild: bool) -> FingerprintIndex {
        self.index_builder().build(products, force_rebuild)
    }

    /// Build (or reuse) the index for `products`, then rank it against the
    /// image at `query_image`.
    pub fn search(
        &self,
        query_image: &Path,
        products: &[Product],
        top_n: usize,
        force_rebuild: bool,
    ) -> SearchOutcome {
        self.search_with_progress(
            query_image,
            products,
            top_n,
            force_rebuild,
            ProgressBar::hidden(),
        )
    }

    pub fn search_with_progress(
        &self,
        query_image: &Path,
        products: &[Product],
        top_n: usize,
        force_rebuild: bool,
        progress: ProgressBar,
    ) -> SearchOutcome {
        let index = self
            .index_builder()
            .with_progress(progress)
            .build(products, force_rebuild);
        self.search_index(ImageInput::Path(query_image), &index, top_n)
    }

    pub fn search_index(
        &self,
        query: ImageInput<'_>,
        index: &FingerprintIndex,
        top_n: usize,
    ) -> SearchOutcome {
        if index.is_empty() {
            log::warn!("Search requested but no product images are indexed");
            return SearchOutcome::IndexUnavailable;
        }

        let Some(fingerprint) = self.hasher.fingerprint_of(query) else {
            log::warn!("Could not fingerprint query image {}", query);
            return SearchOutcome::QueryUnavailable;
        };

        log::debug!("Query fingerprint {} for {}", fingerprint, query);
        SearchOutcome::Matches(rank(fingerprint, index, top_n))
    }
}
