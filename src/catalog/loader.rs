use super::price::normalize_price;
use super::product::{Product, UNKNOWN_BRAND, UNNAMED_PRODUCT};
use serde::Deserialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Data directory not found: {path}")]
    InvalidPath { path: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed catalog file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Listing as the scrapers write it; every field is optional.
#[derive(Debug, Default, Deserialize)]
struct RawListing {
    nombre: Option<String>,
    precio: Option<Value>,
    link: Option<String>,
    url: Option<String>,
    imagen: Option<String>,
    marca: Option<String>,
}

impl From<RawListing> for Product {
    fn from(raw: RawListing) -> Self {
        let link = raw
            .link
            .filter(|l| !l.is_empty())
            .or(raw.url)
            .unwrap_or_default();

        Product {
            name: raw.nombre.unwrap_or_else(|| UNNAMED_PRODUCT.to_string()),
            price: raw.precio.as_ref().map(normalize_price).unwrap_or(0),
            link,
            image_url: raw.imagen.unwrap_or_default(),
            brand: raw.marca.unwrap_or_else(|| UNKNOWN_BRAND.to_string()),
        }
    }
}

/// The in-memory product collection, owned by the process entry point.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Load every `*.json` file sitting directly in `dir`, in file-name order.
    pub fn load(dir: &Path) -> Result<Self, CatalogError> {
        if !dir.is_dir() {
            return Err(CatalogError::InvalidPath {
                path: dir.to_string_lossy().to_string(),
            });
        }

        let mut products = Vec::new();
        for file in catalog_files(dir)? {
            let listings = read_listings(&file)?;
            log::debug!("Loaded {} listings from {}", listings.len(), file.display());
            products.extend(listings.into_iter().map(Product::from));
        }

        log::info!("Catalog loaded: {} products from {}", products.len(), dir.display());
        Ok(Self { products })
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Product> {
        self.products.iter()
    }

    /// Write all products as a single pretty-printed JSON array.
    pub fn export_json(&self, out: &Path) -> Result<usize, CatalogError> {
        let file = File::create(out).map_err(|source| CatalogError::Io {
            path: out.to_string_lossy().to_string(),
            source,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.products).map_err(|source| {
            CatalogError::Json {
                path: out.to_string_lossy().to_string(),
                source,
            }
        })?;
        Ok(self.products.len())
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Product;
    type IntoIter = std::slice::Iter<'a, Product>;

    fn into_iter(self) -> Self::IntoIter {
        self.products.iter()
    }
}

fn catalog_files(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().and_then(|e| e.to_str()) == Some("json")
        {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

fn read_listings(path: &Path) -> Result<Vec<RawListing>, CatalogError> {
    let path_str = || path.to_string_lossy().to_string();
    let file = fs::File::open(path).map_err(|source| CatalogError::Io {
        path: path_str(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CatalogError::Json {
        path: path_str(),
        source,
    })
}
