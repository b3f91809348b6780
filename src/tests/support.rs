//! Fixtures shared across tests: a small catalog and a deterministic
//! keyword embedder that needs no model download.

use std::sync::Arc;

use crate::app::Session;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::prefs::{PreferenceStore, DEFAULT_PREFS_IDENT};
use crate::search::Searcher;
use crate::semantic::embeddings::normalize;
use crate::semantic::{Embedder, EmbeddingError, Indexer, StoredIndex};
use crate::storage::BackendLocal;

pub const SAMPLE_CATALOG_CSV: &str = "\
id,title,short_description,brand,color,rating,price,category,image_url
1,White Sneakers,Classic canvas sneakers for everyday wear,Stride,white,4.3,2499,shoes,https://img.example/1.jpg
2,Blue Running Shoes,Lightweight running shoes with blue mesh,Stride,blue,4.6,3999,shoes,https://img.example/2.jpg
3,Leather Boots,Waterproof leather boots,Hike,brown,4.2,5999,shoes,
4,Blue Canvas Tote Bag,Roomy tote bag in blue canvas,Carry,blue,4.1,1299,bags,https://img.example/4.jpg
5,Leather Backpack,Black leather backpack bag for laptops,Carry,black,4.4,3499,bags,
6,Red Summer Dress,Flowy red dress,Bloom,red,4.0,1899,dresses,
7,Steel Watch,Analog watch with steel strap,Tick,silver,4.7,7999,watches,
8,Red Sneakers,High-top sneakers in red,Stride,red,4.1,2799,shoes,
9,Blue Denim Jacket,Classic blue denim jacket,Bloom,blue,3.9,2999,jackets,
";

pub fn sample_catalog() -> Catalog {
    Catalog::from_reader(SAMPLE_CATALOG_CSV.as_bytes()).expect("sample catalog parses")
}

const VOCABULARY: [&str; 18] = [
    "sneakers", "shoes", "running", "boots", "leather", "bag", "tote", "backpack", "dress",
    "watch", "jacket", "blue", "red", "black", "white", "brown", "canvas", "denim",
];

/// Bag-of-words embedder over a fixed vocabulary, plus a constant bias
/// dimension so no text maps to the zero vector.
#[derive(Debug, Default)]
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    fn vectorize(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; VOCABULARY.len() + 1];
        vector[VOCABULARY.len()] = 0.1;

        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            if let Some(pos) = VOCABULARY.iter().position(|word| *word == token) {
                vector[pos] += 1.0;
            }
        }

        normalize(&mut vector);
        vector
    }
}

impl Embedder for KeywordEmbedder {
    fn dimensions(&self) -> usize {
        VOCABULARY.len() + 1
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| Self::vectorize(text)).collect())
    }
}

/// Searcher over the sample catalog, indexed with [`KeywordEmbedder`].
pub fn keyword_searcher() -> Searcher {
    let catalog = Arc::new(sample_catalog());
    let embedder = Arc::new(KeywordEmbedder);
    let index = Indexer::new(embedder.as_ref(), 4)
        .build_index(&catalog)
        .expect("sample catalog indexes");
    let ids = catalog.products().iter().map(|p| p.id).collect();

    Searcher::new(catalog)
        .with_embedder(embedder)
        .with_index(StoredIndex { index, ids })
}

/// Session with a default config and preference file under `tmp`.
pub fn session_in(tmp: &tempfile::TempDir) -> Session {
    let base = tmp.path().to_str().expect("utf8 temp path");
    let config = Config::load_with(base).expect("default config loads");
    let backend = BackendLocal::new(base).expect("storage dir");
    let prefs = PreferenceStore::new(Arc::new(backend), DEFAULT_PREFS_IDENT);

    Session::new(config, keyword_searcher(), prefs).expect("session starts")
}

pub fn session() -> (Session, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("temp dir");
    (session_in(&tmp), tmp)
}
