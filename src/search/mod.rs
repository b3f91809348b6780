//! Catalog retrieval: scored hits, query parsing, filtering and ordering.

mod filters;
mod hit;
mod query;
mod searcher;

pub use filters::{Facets, ResultFilter, SortOrder};
pub use hit::{ItemId, SearchHit};
pub use query::parse_price_from_query;
pub use searcher::{CategoryRecommendation, SearchError, SearchOptions, Searcher, DEFAULT_TOP_K};
