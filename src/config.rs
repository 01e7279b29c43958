use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// File name of the persisted fingerprint index inside the temp directory.
pub const DEFAULT_CACHE_FILE_NAME: &str = "product_image_phashes.json";

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 8;
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;
pub const DEFAULT_TOP_N: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Directory holding the per-brand JSON files.
    pub data_dir: PathBuf,
    pub cache_file: PathBuf,
    pub fetch_timeout_secs: u64,
    /// Downloads larger than this are treated as unavailable.
    pub max_image_bytes: u64,
    pub top_n: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            cache_file: default_cache_file(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl SearchConfig {
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_cache_file(mut self, cache_file: impl Into<PathBuf>) -> Self {
        self.cache_file = cache_file.into();
        self
    }

    pub fn with_fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

pub fn default_cache_file() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_CACHE_FILE_NAME)
}
