//! Builds the flat index from the catalog.

use indicatif::{ProgressBar, ProgressStyle};

use crate::catalog::Catalog;
use crate::semantic::embeddings::Embedder;
use crate::semantic::index::FlatIndex;
use crate::semantic::preprocess::document_text;
use crate::semantic::storage::IndexStorage;
use crate::semantic::SemanticError;

pub struct Indexer<'a> {
    embedder: &'a dyn Embedder,
    batch_size: usize,
    show_progress: bool,
}

impl<'a> Indexer<'a> {
    pub fn new(embedder: &'a dyn Embedder, batch_size: usize) -> Self {
        Self {
            embedder,
            batch_size: batch_size.max(1),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Embed every catalog row, in row order.
    pub fn build_index(&self, catalog: &Catalog) -> Result<FlatIndex, SemanticError> {
        let texts: Vec<String> = catalog.products().iter().map(document_text).collect();
        let mut index = FlatIndex::new(self.embedder.dimensions())?;

        let progress = if self.show_progress {
            let bar = ProgressBar::new(texts.len() as u64);
            if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} products") {
                bar.set_style(style);
            }
            bar
        } else {
            ProgressBar::hidden()
        };

        for batch in texts.chunks(self.batch_size) {
            let vectors = self.embedder.embed_batch(batch)?;
            index.add(&vectors)?;
            progress.inc(batch.len() as u64);
        }
        progress.finish_and_clear();

        log::info!("embedded {} products", index.len());

        Ok(index)
    }

    /// Build the index and write it, with the catalog's ids, to `storage`.
    pub fn build_and_save(
        &self,
        catalog: &Catalog,
        storage: &IndexStorage,
        model_id: &[u8; 32],
    ) -> Result<FlatIndex, SemanticError> {
        let index = self.build_index(catalog)?;
        let ids: Vec<i64> = catalog.products().iter().map(|p| p.id).collect();

        storage.save(&index, &ids, model_id)?;
        log::info!("index built and saved to {}", storage.path().display());

        Ok(index)
    }
}
