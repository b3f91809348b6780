//! Display-side filtering and ordering of personalized results.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::search::hit::SearchHit;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Highest (personalized) score first.
    #[default]
    Score,
    /// Keep retrieval order.
    Retrieval,
    PriceAsc,
    PriceDesc,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl ResultFilter {
    pub fn apply(&self, hits: Vec<SearchHit>) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = hits
            .into_iter()
            .filter(|hit| matches_exact(self.brand.as_deref(), hit.brand.as_deref()))
            .filter(|hit| matches_exact(self.category.as_deref(), hit.category.as_deref()))
            .collect();

        match self.sort {
            SortOrder::Retrieval => {}
            SortOrder::Score => hits.sort_by(|a, b| {
                b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
            }),
            SortOrder::PriceAsc => hits.sort_by(|a, b| cmp_price(a.price, b.price)),
            SortOrder::PriceDesc => hits.sort_by(|a, b| match (a.price, b.price) {
                (Some(a), Some(b)) => b.total_cmp(&a),
                (a, b) => cmp_price(a, b),
            }),
        }

        if let Some(limit) = self.limit {
            hits.truncate(limit);
        }

        hits
    }
}

fn matches_exact(wanted: Option<&str>, actual: Option<&str>) -> bool {
    wanted.map_or(true, |wanted| actual == Some(wanted))
}

/// Ascending price, products without a price last.
fn cmp_price(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Distinct brands and categories present in a result set, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facets {
    pub brands: Vec<String>,
    pub categories: Vec<String>,
}

impl Facets {
    pub fn collect(hits: &[SearchHit]) -> Self {
        let brands: BTreeSet<&str> = hits.iter().filter_map(|h| h.brand.as_deref()).collect();
        let categories: BTreeSet<&str> =
            hits.iter().filter_map(|h| h.category.as_deref()).collect();

        Self {
            brands: brands.into_iter().map(String::from).collect(),
            categories: categories.into_iter().map(String::from).collect(),
        }
    }
}
