// Visual similarity search:
// - perceptual fingerprints of catalog and query images
// - fingerprint index, built from the catalog and persisted between runs
// - ranking by Hamming distance

pub mod cache;
pub mod fetch;
pub mod fingerprint;
pub mod hasher;
pub mod index;
pub mod search;

pub use cache::{CacheError, CacheInfo, IndexCache};
pub use fetch::{FetchError, HttpImageSource, ImageSource, StaticImageSource};
pub use fingerprint::{FINGERPRINT_BITS, Fingerprint, similarity_score};
pub use hasher::{FingerprintError, ImageHasher, ImageInput};
pub use index::{FingerprintIndex, IndexBuilder, ProductSummary};
pub use search::{RankedResult, SearchEngine, SearchOutcome, rank};
