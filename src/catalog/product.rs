use serde::{Deserialize, Serialize};
use std::fmt;

pub const UNKNOWN_BRAND: &str = "Desconocida";
pub const UNNAMED_PRODUCT: &str = "Sin nombre";

/// One catalog listing. Field names on the wire follow the scrapers' output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "precio")]
    pub price: u64,
    pub link: String,
    #[serde(rename = "imagen")]
    pub image_url: String,
    #[serde(rename = "marca")]
    pub brand: String,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        price: u64,
        link: impl Into<String>,
        image_url: impl Into<String>,
        brand: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            price,
            link: link.into(),
            image_url: image_url.into(),
            brand: brand.into(),
        }
    }

    pub fn has_image(&self) -> bool {
        !self.image_url.trim().is_empty()
    }

    pub fn category_label(&self) -> Option<&'static str> {
        category_label(&self.brand)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - ${} - {}", self.name, self.price, self.brand)
    }
}

/// Lowercases and strips spaces and dashes so "Sierra-Mora" and "sierramora" match.
pub fn normalize_brand(brand: &str) -> String {
    brand
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect::<String>()
        .trim()
        .to_lowercase()
}

/// Display label for the brands we know about.
pub fn category_label(brand: &str) -> Option<&'static str> {
    match normalize_brand(brand).as_str() {
        "sisi" => Some("Lencería (SISI)"),
        "rotunda" => Some("Ropa (Rotunda)"),
        "sierramora" => Some("Ropa (Sierramora)"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let p = Product::new("Top encaje", 12990, "https://x/p/1", "", "SiSi");
        assert_eq!(p.to_string(), "Top encaje - $12990 - SiSi");
    }

    #[test]
    fn test_category_label_normalizes_brand() {
        assert_eq!(category_label("SISI"), Some("Lencería (SISI)"));
        assert_eq!(category_label(" Rotunda "), Some("Ropa (Rotunda)"));
        assert_eq!(category_label("Sierra-Mora"), Some("Ropa (Sierramora)"));
        assert_eq!(category_label("sierra mora"), Some("Ropa (Sierramora)"));
        assert_eq!(category_label("Zara"), None);
        assert_eq!(category_label(""), None);
    }

    #[test]
    fn test_has_image() {
        assert!(Product::new("a", 1, "l", "https://img/a.jpg", "b").has_image());
        assert!(!Product::new("a", 1, "l", "", "b").has_image());
        assert!(!Product::new("a", 1, "l", "   ", "b").has_image());
    }

    #[test]
    fn test_serializes_with_catalog_field_names() {
        let p = Product::new("Remera", 5000, "https://x/r", "https://x/r.jpg", "Rotunda");
        let value = serde_json::to_value(&p).unwrap();
        assert_eq!(value["nombre"], "Remera");
        assert_eq!(value["precio"], 5000);
        assert_eq!(value["link"], "https://x/r");
        assert_eq!(value["imagen"], "https://x/r.jpg");
        assert_eq!(value["marca"], "Rotunda");
    }
}
