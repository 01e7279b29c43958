use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use super::hasher::HASH_ALGORITHM;
use super::index::FingerprintIndex;
use crate::config::default_cache_file;

/// Bump when the file layout changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed cache file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache file has no format version")]
    Unversioned,

    #[error("Cache was written by format {found} / {algorithm:?}, expected format {expected}")]
    Incompatible {
        found: u32,
        expected: u32,
        algorithm: String,
    },
}

/// On-disk layout: a small header followed by the fingerprint mapping.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    algorithm: Option<String>,
    #[serde(default)]
    built_at: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: FingerprintIndex,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheInfo {
    pub version: u32,
    pub algorithm: String,
    pub built_at: Option<DateTime<Utc>>,
    pub fingerprints: usize,
    pub products: usize,
}

/// The persisted fingerprint index at one well-known path.
#[derive(Debug, Clone)]
pub struct IndexCache {
    path: PathBuf,
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new(default_cache_file())
    }
}

impl IndexCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no cache file exists yet.
    pub fn load(&self) -> Result<Option<FingerprintIndex>, CacheError> {
        Ok(self.read()?.map(|file| file.entries))
    }

    pub fn info(&self) -> Result<Option<CacheInfo>, CacheError> {
        Ok(self.read()?.map(|file| CacheInfo {
            version: file.version.unwrap_or_default(),
            algorithm: file.algorithm.unwrap_or_default(),
            built_at: file.built_at,
            fingerprints: file.entries.len(),
            products: file.entries.product_count(),
        }))
    }

    /// Write to a sibling temp file, then rename over the old cache.
    pub fn store(&self, index: &FingerprintIndex) -> Result<(), CacheError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let file = CacheFile {
            version: Some(CACHE_FORMAT_VERSION),
            algorithm: Some(HASH_ALGORITHM.to_string()),
            built_at: Some(Utc::now()),
            entries: index.clone(),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &file)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| CacheError::Io(e.error))?;

        log::debug!(
            "Wrote {} fingerprints to {}",
            index.len(),
            self.path.display()
        );
        Ok(())
    }

    pub fn clear(&self) -> Result<bool, CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn read(&self) -> Result<Option<CacheFile>, CacheError> {
        let f = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: CacheFile = serde_json::from_reader(BufReader::new(f))?;

        let version = file.version.ok_or(CacheError::Unversioned)?;
        let algorithm = file.algorithm.as_deref().unwrap_or_default();
        if version != CACHE_FORMAT_VERSION || algorithm != HASH_ALGORITHM {
            return Err(CacheError::Incompatible {
                found: version,
                expected: CACHE_FORMAT_VERSION,
                algorithm: algorithm.to_string(),
            });
        }
        Ok(Some(file))
    }
}
