//! Query-time retrieval over the catalog.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::{Catalog, CatalogError, Product};
use crate::personalization::value_counts;
use crate::search::hit::SearchHit;
use crate::search::query::parse_price_from_query;
use crate::semantic::{Embedder, EmbeddingError, IndexError, IndexStorageError, StoredIndex};

pub const DEFAULT_TOP_K: usize = 50;
pub const DEFAULT_PRICE_MAX: f64 = 1e9;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("index not found, build it first with `shopsearch index`")]
    IndexNotFound,

    #[error("embedding model is not loaded")]
    ModelNotLoaded,

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("index storage error: {0}")]
    Storage(#[from] IndexStorageError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Keep only these categories. Empty means no category filter.
    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub price_min: f64,

    #[serde(default = "default_price_max")]
    pub price_max: f64,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_price_max() -> f64 {
    DEFAULT_PRICE_MAX
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            categories: vec![],
            price_min: 0.0,
            price_max: DEFAULT_PRICE_MAX,
        }
    }
}

impl SearchOptions {
    fn accepts(&self, product: &Product) -> bool {
        self.price_in_range(product.price) && self.category_allowed(product.category.as_deref())
    }

    /// Products without a price pass only while the range is unbounded.
    fn price_in_range(&self, price: Option<f64>) -> bool {
        match price {
            Some(price) => self.price_min <= price && price <= self.price_max,
            None => self.price_min <= 0.0 && self.price_max >= DEFAULT_PRICE_MAX,
        }
    }

    fn category_allowed(&self, category: Option<&str>) -> bool {
        self.categories.is_empty()
            || category.is_some_and(|c| self.categories.iter().any(|allowed| allowed == c))
    }
}

/// Products of one preferred category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRecommendation {
    pub category: String,
    pub clicks: usize,
    pub products: Vec<SearchHit>,
}

pub struct Searcher {
    catalog: Arc<Catalog>,
    embedder: Option<Arc<dyn Embedder>>,
    index: Option<StoredIndex>,
}

impl Searcher {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            embedder: None,
            index: None,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_index(mut self, index: StoredIndex) -> Self {
        if index.index.len() != self.catalog.len() {
            log::warn!(
                "index has {} rows but catalog has {} products, rebuild the index",
                index.index.len(),
                self.catalog.len()
            );
        }
        self.index = Some(index);
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Retrieve products for `query`.
    ///
    /// An empty query lists catalog products in order. Otherwise price hints
    /// in the query narrow the price range, the `top_k` nearest products are
    /// fetched and then filtered, so fewer than `top_k` hits may come back.
    pub fn search(&self, query: &str, opts: &SearchOptions) -> Result<Vec<SearchHit>, SearchError> {
        let query = query.trim();

        if query.is_empty() {
            return Ok(self
                .catalog
                .products()
                .iter()
                .filter(|product| opts.accepts(product))
                .take(opts.top_k)
                .map(|product| SearchHit::from_product(product, 0.0))
                .collect());
        }

        let mut opts = opts.clone();
        let (low, high) = parse_price_from_query(query);
        if let Some(low) = low {
            opts.price_min = opts.price_min.max(low);
        }
        if let Some(high) = high {
            opts.price_max = opts.price_max.min(high);
        }

        let stored = self.index.as_ref().ok_or(SearchError::IndexNotFound)?;
        let embedder = self.embedder.as_ref().ok_or(SearchError::ModelNotLoaded)?;
        if stored.index.is_empty() {
            return Ok(vec![]);
        }

        let query_vector = embedder.embed(query)?;
        let neighbors = stored.index.search(&query_vector, opts.top_k)?;

        let hits: Vec<SearchHit> = neighbors
            .into_iter()
            .filter_map(|neighbor| {
                self.product_at(stored, neighbor.row)
                    .map(|product| (product, neighbor.score))
            })
            .filter(|(product, _)| opts.accepts(product))
            .map(|(product, score)| SearchHit::from_product(product, score))
            .collect();

        log::debug!(
            "query {query:?}: {} hits, price range {}..={}",
            hits.len(),
            opts.price_min,
            opts.price_max
        );

        Ok(hits)
    }

    /// Catalog product behind an index row. Rows are mapped through the
    /// stored ids when present, by position otherwise.
    fn product_at(&self, stored: &StoredIndex, row: usize) -> Option<&Product> {
        if stored.ids.is_empty() {
            self.catalog.products().get(row)
        } else {
            stored
                .ids
                .get(row)
                .and_then(|id| self.catalog.get(*id))
        }
    }

    /// Category frequencies among clicked catalog products, most frequent first.
    pub fn category_counts(&self, click_history: &[i64]) -> Vec<(String, usize)> {
        let clicked: std::collections::HashSet<i64> = click_history.iter().copied().collect();

        value_counts(
            self.catalog
                .products()
                .iter()
                .filter(|product| clicked.contains(&product.id))
                .filter_map(|product| product.category.as_deref()),
        )
    }

    /// First `per_category` products of each category the user clicked into.
    pub fn recommendations(
        &self,
        click_history: &[i64],
        per_category: usize,
    ) -> Vec<CategoryRecommendation> {
        self.category_counts(click_history)
            .into_iter()
            .map(|(category, clicks)| {
                let products = self
                    .catalog
                    .products()
                    .iter()
                    .filter(|product| product.category.as_deref() == Some(category.as_str()))
                    .take(per_category)
                    .map(|product| SearchHit::from_product(product, 0.0))
                    .collect();

                CategoryRecommendation {
                    category,
                    clicks,
                    products,
                }
            })
            .filter(|rec| !rec.products.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::Indexer;
    use crate::tests::support::{sample_catalog, KeywordEmbedder};

    fn searcher() -> Searcher {
        let catalog = Arc::new(sample_catalog());
        let embedder = Arc::new(KeywordEmbedder::default());
        let index = Indexer::new(embedder.as_ref(), 8)
            .build_index(&catalog)
            .unwrap();
        let ids = catalog.products().iter().map(|p| p.id).collect();

        Searcher::new(catalog)
            .with_embedder(embedder)
            .with_index(StoredIndex { index, ids })
    }

    fn ids(hits: &[SearchHit]) -> Vec<i64> {
        hits.iter().filter_map(|h| h.id.as_int()).collect()
    }

    #[test]
    fn test_semantic_search_ranks_matching_products_first() {
        let hits = searcher().search("sneakers", &SearchOptions::default()).unwrap();
        let top = &hits[0];
        assert_eq!(top.category.as_deref(), Some("shoes"));
        assert!(top.title.as_deref().unwrap_or_default().contains("Sneakers"));
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_query_price_hint_filters() {
        let hits = searcher()
            .search("sneakers under 3000", &SearchOptions::default())
            .unwrap();
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.price.unwrap_or(f64::MAX) <= 3000.0));
    }

    #[test]
    fn test_query_price_hint_narrows_but_never_widens() {
        let opts = SearchOptions {
            price_max: 2000.0,
            ..Default::default()
        };
        let hits = searcher().search("bag under 9000", &opts).unwrap();
        assert!(hits.iter().all(|h| h.price.unwrap_or(f64::MAX) <= 2000.0));
    }

    #[test]
    fn test_category_filter() {
        let opts = SearchOptions {
            categories: vec!["bags".to_string()],
            ..Default::default()
        };
        let hits = searcher().search("blue", &opts).unwrap();
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.category.as_deref() == Some("bags")));
    }

    #[test]
    fn test_top_k_limits_candidates() {
        let opts = SearchOptions {
            top_k: 2,
            ..Default::default()
        };
        let hits = searcher().search("blue", &opts).unwrap();
        assert!(hits.len() <= 2);
    }

    #[test]
    fn test_empty_query_lists_catalog_in_order() {
        let searcher = searcher();
        let opts = SearchOptions {
            top_k: 3,
            ..Default::default()
        };
        let hits = searcher.search("  ", &opts).unwrap();

        let expected: Vec<i64> = searcher.catalog().products()[..3]
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids(&hits), expected);
        assert!(hits.iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn test_empty_query_applies_filters() {
        let opts = SearchOptions {
            price_min: 1000.0,
            price_max: 3000.0,
            categories: vec!["shoes".to_string()],
            ..Default::default()
        };
        let hits = searcher().search("", &opts).unwrap();
        assert!(!hits.is_empty());
        for hit in hits {
            assert_eq!(hit.category.as_deref(), Some("shoes"));
            let price = hit.price.unwrap();
            assert!((1000.0..=3000.0).contains(&price));
        }
    }

    #[test]
    fn test_missing_index() {
        let searcher = Searcher::new(Arc::new(sample_catalog()));
        assert!(matches!(
            searcher.search("shoes", &SearchOptions::default()),
            Err(SearchError::IndexNotFound)
        ));
        // listing the catalog needs no index
        assert!(searcher.search("", &SearchOptions::default()).is_ok());
    }

    #[test]
    fn test_unknown_index_rows_are_skipped() {
        let catalog = Arc::new(sample_catalog());
        let embedder = Arc::new(KeywordEmbedder::default());
        let index = Indexer::new(embedder.as_ref(), 8)
            .build_index(&catalog)
            .unwrap();
        let ids = vec![-1; catalog.len()];

        let searcher = Searcher::new(catalog)
            .with_embedder(embedder)
            .with_index(StoredIndex { index, ids });
        assert!(searcher
            .search("sneakers", &SearchOptions::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_category_counts_and_recommendations() {
        let searcher = searcher();
        // ids 1 and 2 are shoes, 4 is a bag
        let counts = searcher.category_counts(&[4, 1, 2, 99]);
        assert_eq!(
            counts,
            vec![("shoes".to_string(), 2), ("bags".to_string(), 1)]
        );

        let recs = searcher.recommendations(&[4, 1, 2], 2);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].category, "shoes");
        assert_eq!(recs[0].clicks, 2);
        assert_eq!(recs[0].products.len(), 2);
        assert!(recs[1]
            .products
            .iter()
            .all(|p| p.category.as_deref() == Some("bags")));
    }

    #[test]
    fn test_recommendations_empty_without_clicks() {
        assert!(searcher().recommendations(&[], 5).is_empty());
    }
}
