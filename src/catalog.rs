//! Product catalog backed by a flat CSV file.
//!
//! The catalog is loaded once and treated as a read-only table: row access by
//! position or by id, plus column membership tests.

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, io::Read, path::Path, time::Instant};

/// Errors that can occur while loading the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("catalog is missing required column '{0}'")]
    MissingColumn(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,

    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub rating: Option<f32>,
}

/// Read-only tabular view over catalog rows.
pub trait CatalogLookup {
    fn has_column(&self, column: &str) -> bool;
    fn rows(&self) -> &[Product];
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    columns: Vec<String>,
    products: Vec<Product>,
    by_id: HashMap<i64, usize>,
}

impl Catalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let now = Instant::now();
        let catalog = Self::from_csv(csv::Reader::from_path(path.as_ref())?)?;

        log::debug!(
            "took {}ms to read catalog ({} products)",
            now.elapsed().as_micros() as f64 / 1000.0,
            catalog.len()
        );

        Ok(catalog)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, CatalogError> {
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        if !columns.iter().any(|c| c == "id") {
            return Err(CatalogError::MissingColumn("id"));
        }

        let mut products = vec![];
        for record in reader.deserialize() {
            let product: Product = record?;
            products.push(product);
        }

        Ok(Self::from_products(columns, products))
    }

    /// Build a catalog from rows that are already in memory.
    ///
    /// When ids repeat, `get` resolves to the first row carrying the id.
    pub fn from_products(columns: Vec<String>, products: Vec<Product>) -> Self {
        let mut by_id = HashMap::with_capacity(products.len());
        for (pos, product) in products.iter().enumerate() {
            by_id.entry(product.id).or_insert(pos);
        }

        Self {
            columns,
            products,
            by_id,
        }
    }

    #[allow(dead_code)]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: i64) -> Option<&Product> {
        self.position(id).and_then(|pos| self.products.get(pos))
    }

    /// Row position of the product with the given id.
    pub fn position(&self, id: i64) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl CatalogLookup for Catalog {
    fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    fn rows(&self) -> &[Product] {
        &self.products
    }
}
