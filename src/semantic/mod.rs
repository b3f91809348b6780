//! Semantic retrieval infrastructure for the product catalog.
//!
//! Products are embedded locally with fastembed-rs and kept in a flat
//! inner-product index.
//!
//! # Architecture
//!
//! - `embeddings`: Wraps fastembed for embedding generation
//! - `index`: Flat inner-product index over row-ordered vectors
//! - `storage`: Binary file I/O for the index and its id sidecar
//! - `preprocess`: Text preparation for embedding input
//! - `indexer`: Builds and saves the index from the catalog

pub mod embeddings;
mod index;
mod indexer;
mod preprocess;
mod storage;

pub use embeddings::{model_id_hash, Embedder, EmbeddingError, EmbeddingModel};
pub use index::{FlatIndex, IndexError, Neighbor};
pub use indexer::Indexer;
pub use preprocess::document_text;
pub use storage::{IndexStorage, IndexStorageError, StoredIndex};

/// Default embedding model name (384-dimensional)
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

#[derive(Debug, thiserror::Error)]
pub enum SemanticError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Storage error: {0}")]
    Storage(#[from] IndexStorageError),
}
