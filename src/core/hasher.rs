use image::{DynamicImage, ImageReader};
use image_hasher::{HashAlg, Hasher, HasherConfig};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::fetch::{FetchError, HttpImageSource, ImageSource};
use super::fingerprint::Fingerprint;

/// Tag stored next to persisted fingerprints. Change it whenever the
/// hasher configuration below changes.
pub const HASH_ALGORITHM: &str = "phash-dct-median-8x8";

const HASH_SIDE: u32 = 8;

#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Image fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Unexpected hash width: {bytes} bytes")]
    HashWidth { bytes: usize },
}

/// What to fingerprint.
#[derive(Debug, Clone, Copy)]
pub enum ImageInput<'a> {
    Path(&'a Path),
    Url(&'a str),
    Bytes(&'a [u8]),
}

impl fmt::Display for ImageInput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageInput::Path(p) => write!(f, "{}", p.display()),
            ImageInput::Url(u) => write!(f, "{}", u),
            ImageInput::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Computes perceptual fingerprints for local and remote images.
pub struct ImageHasher {
    hasher: Hasher,
    source: Arc<dyn ImageSource>,
}

impl ImageHasher {
    pub fn new(source: Arc<dyn ImageSource>) -> Self {
        let hasher = HasherConfig::new()
            .hash_alg(HashAlg::Median)
            .hash_size(HASH_SIDE, HASH_SIDE)
            .preproc_dct()
            .to_hasher();
        Self { hasher, source }
    }

    pub fn with_http(source: HttpImageSource) -> Self {
        Self::new(Arc::new(source))
    }

    /// Fingerprint `input`, or `None` when the image cannot be fetched or decoded.
    pub fn fingerprint_of(&self, input: ImageInput<'_>) -> Option<Fingerprint> {
        match self.try_fingerprint(input) {
            Ok(fp) => Some(fp),
            Err(e) => {
                log::debug!("Image unavailable ({}): {}", input, e);
                None
            }
        }
    }

    pub fn try_fingerprint(&self, input: ImageInput<'_>) -> Result<Fingerprint, FingerprintError> {
        let image = match input {
            ImageInput::Path(path) => ImageReader::open(path)?.with_guessed_format()?.decode()?,
            ImageInput::Url(url) => {
                let bytes = self.source.fetch(url)?;
                image::load_from_memory(&bytes)?
            }
            ImageInput::Bytes(bytes) => image::load_from_memory(bytes)?,
        };
        self.fingerprint_image(&image)
    }

    pub fn fingerprint_image(&self, image: &DynamicImage) -> Result<Fingerprint, FingerprintError> {
        // Normalize channel layout first; grayscale, RGBA and 16-bit inputs
        // must hash the same as their RGB8 rendering.
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let hash = self.hasher.hash_image(&rgb);
        let bytes = hash.as_bytes();
        Fingerprint::from_bytes(bytes).ok_or(FingerprintError::HashWidth { bytes: bytes.len() })
    }
}
