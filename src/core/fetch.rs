use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;
use ureq::AgentBuilder;

use crate::config::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_IMAGE_BYTES};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Image at {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: u64 },

    #[error("No image available at {url}")]
    Missing { url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where remote catalog images come from.
pub trait ImageSource: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP downloads with a per-request timeout and no retries.
pub struct HttpImageSource {
    agent: ureq::Agent,
    max_bytes: u64,
}

impl HttpImageSource {
    pub fn new(timeout: Duration) -> Self {
        Self::with_limit(timeout, DEFAULT_MAX_IMAGE_BYTES)
    }

    pub fn with_limit(timeout: Duration, max_bytes: u64) -> Self {
        let agent = AgentBuilder::new().timeout(timeout).build();
        Self { agent, max_bytes }
    }
}

impl Default for HttpImageSource {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(status, _) => FetchError::Status {
                url: url.to_string(),
                status,
            },
            ureq::Error::Transport(t) => FetchError::Transport {
                url: url.to_string(),
                message: t.to_string(),
            },
        })?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(self.max_bytes + 1)
            .read_to_end(&mut bytes)?;

        if bytes.len() as u64 > self.max_bytes {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit: self.max_bytes,
            });
        }
        Ok(bytes)
    }
}

/// Serves images from memory, keyed by URL. Unknown URLs are missing.
#[derive(Debug, Clone, Default)]
pub struct StaticImageSource {
    images: HashMap<String, Vec<u8>>,
}

impl StaticImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.images.insert(url.into(), bytes);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(url.into(), bytes);
    }
}

impl ImageSource for StaticImageSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Missing {
                url: url.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_source() {
        let source = StaticImageSource::new().with_image("https://img/a.png", vec![1, 2, 3]);
        assert_eq!(source.fetch("https://img/a.png").unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            source.fetch("https://img/b.png"),
            Err(FetchError::Missing { .. })
        ));
    }

    #[test]
    fn test_http_unreachable_host_fails_soft() {
        let source = HttpImageSource::new(Duration::from_millis(500));
        // Nothing listens on the discard port.
        let result = source.fetch("http://127.0.0.1:9/image.jpg");
        assert!(matches!(result, Err(FetchError::Transport { .. })));
    }

    #[test]
    fn test_http_rejects_malformed_url() {
        let source = HttpImageSource::default();
        assert!(source.fetch("not a url").is_err());
    }
}
