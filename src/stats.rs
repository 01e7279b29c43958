use crate::catalog::Product;
use crate::catalog::product::UNKNOWN_BRAND;
use serde::Serialize;
use std::collections::BTreeMap;

pub const TOP_PRICED_COUNT: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct CatalogReport<'a> {
    pub total: usize,
    pub by_brand: BTreeMap<String, usize>,
    pub average_price: BTreeMap<String, f64>,
    pub top_priced: Vec<&'a Product>,
    pub with_errors: Vec<&'a Product>,
}

impl<'a> CatalogReport<'a> {
    pub fn new(products: &'a [Product]) -> Self {
        Self {
            total: products.len(),
            by_brand: products_by_brand(products),
            average_price: average_price_by_brand(products),
            top_priced: top_priced(products, TOP_PRICED_COUNT),
            with_errors: products_with_errors(products),
        }
    }
}

fn brand_key(product: &Product) -> &str {
    if product.brand.is_empty() {
        UNKNOWN_BRAND
    } else {
        &product.brand
    }
}

pub fn products_by_brand(products: &[Product]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for p in products {
        *counts.entry(brand_key(p).to_string()).or_insert(0) += 1;
    }
    counts
}

/// Mean price per brand, rounded to two decimals.
pub fn average_price_by_brand(products: &[Product]) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, (u128, usize)> = BTreeMap::new();
    for p in products {
        let entry = totals.entry(brand_key(p).to_string()).or_insert((0, 0));
        entry.0 += u128::from(p.price);
        entry.1 += 1;
    }

    totals
        .into_iter()
        .map(|(brand, (sum, count))| {
            let mean = sum as f64 / count as f64;
            (brand, (mean * 100.0).round() / 100.0)
        })
        .collect()
}

/// The `n` most expensive products; ties keep catalog order.
pub fn top_priced(products: &[Product], n: usize) -> Vec<&Product> {
    let mut sorted: Vec<&Product> = products.iter().collect();
    sorted.sort_by(|a, b| b.price.cmp(&a.price));
    sorted.truncate(n);
    sorted
}

/// Products with a zero price, an empty name, or no link.
pub fn products_with_errors(products: &[Product]) -> Vec<&Product> {
    products
        .iter()
        .filter(|p| p.price == 0 || p.name.is_empty() || p.link.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Product> {
        vec![
            Product::new("Body", 1290, "https://s/1", "", "SISI"),
            Product::new("Culotte", 990, "https://s/2", "", "SISI"),
            Product::new("Campera", 45000, "https://r/1", "", "Rotunda"),
            Product::new("Remera", 0, "https://r/2", "", "Rotunda"),
            Product::new("", 1500, "https://m/1", "", "Sierramora"),
            Product::new("Pollera", 8000, "", "", ""),
        ]
    }

    #[test]
    fn test_products_by_brand() {
        let counts = products_by_brand(&sample());
        assert_eq!(counts["SISI"], 2);
        assert_eq!(counts["Rotunda"], 2);
        assert_eq!(counts["Sierramora"], 1);
        assert_eq!(counts[UNKNOWN_BRAND], 1);
        assert_eq!(counts.values().sum::<usize>(), 6);
    }

    #[test]
    fn test_average_price_by_brand() {
        let products = vec![
            Product::new("a", 100, "l", "", "X"),
            Product::new("b", 200, "l", "", "X"),
            Product::new("c", 101, "l", "", "Y"),
            Product::new("d", 100, "l", "", "Y"),
            Product::new("e", 100, "l", "", "Y"),
        ];
        let averages = average_price_by_brand(&products);
        assert_eq!(averages["X"], 150.0);
        assert_eq!(averages["Y"], 100.33);
    }

    #[test]
    fn test_average_price_with_huge_prices() {
        let huge = crate::catalog::normalize_price(&serde_json::json!(1e30));
        assert_eq!(huge, u64::MAX);
        let products = vec![
            Product::new("a", huge, "l", "", "X"),
            Product::new("b", huge, "l", "", "X"),
            Product::new("c", u64::MAX - 1, "l", "", "X"),
        ];
        let averages = average_price_by_brand(&products);
        assert_eq!(averages["X"], u64::MAX as f64);
    }

    #[test]
    fn test_top_priced() {
        let products = sample();
        let top = top_priced(&products, TOP_PRICED_COUNT);
        let names: Vec<_> = top.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Campera", "Pollera", "", "Body", "Culotte"]);

        assert!(top_priced(&products, 0).is_empty());
        assert_eq!(top_priced(&products, 100).len(), products.len());
    }

    #[test]
    fn test_top_priced_ties_keep_catalog_order() {
        let products = vec![
            Product::new("first", 500, "l", "", "X"),
            Product::new("second", 500, "l", "", "X"),
            Product::new("third", 900, "l", "", "X"),
        ];
        let names: Vec<_> = top_priced(&products, 3).iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, vec!["third", "first", "second"]);
    }

    #[test]
    fn test_products_with_errors() {
        let products = sample();
        let errors = products_with_errors(&products);
        let names: Vec<_> = errors.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Remera", "", "Pollera"]);
    }

    #[test]
    fn test_report_on_empty_catalog() {
        let report = CatalogReport::new(&[]);
        assert_eq!(report.total, 0);
        assert!(report.by_brand.is_empty());
        assert!(report.average_price.is_empty());
        assert!(report.top_priced.is_empty());
        assert!(report.with_errors.is_empty());
    }
}
