use crate::{
    app::session::Session,
    catalog::Catalog,
    config::Config,
    prefs::{PreferenceStore, DEFAULT_PREFS_IDENT},
    search::Searcher,
    semantic::{
        model_id_hash, Embedder, EmbeddingModel, IndexStorage, IndexStorageError, Indexer,
        StoredIndex,
    },
    storage,
};
use anyhow::{Context, Result};
use homedir::my_home;
use std::path::PathBuf;
use std::sync::Arc;

/// Application factory for creating and configuring application components
pub struct AppFactory;

impl AppFactory {
    /// Get application paths, creating the base directory
    pub fn get_paths() -> Result<AppPaths> {
        let base_path = Self::get_base_path()?;

        std::fs::create_dir_all(&base_path)
            .context("Failed to create application base directory")?;

        Ok(AppPaths { base_path })
    }

    fn get_base_path() -> Result<String> {
        if let Ok(base_path) = std::env::var("SHOPSEARCH_BASE_PATH") {
            return Ok(base_path);
        }

        let home = my_home()
            .context("Could not determine home directory")?
            .context("Home directory path is empty")?;
        Ok(format!("{}/.local/share/shopsearch", home.to_string_lossy()))
    }

    pub fn create_config(paths: &AppPaths) -> Result<Config> {
        Config::load_with(&paths.base_path)
    }

    pub fn load_catalog(config: &Config) -> Result<Arc<Catalog>> {
        let path = config.resolve(&config.catalog_path);
        let catalog = Catalog::load(&path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?;

        if catalog.is_empty() {
            log::warn!("catalog {} has no products", path.display());
        } else {
            log::info!("loaded {} products from {}", catalog.len(), path.display());
        }
        Ok(Arc::new(catalog))
    }

    pub fn load_model(config: &Config) -> Result<Arc<EmbeddingModel>> {
        let model = EmbeddingModel::new(
            &config.semantic_search.model,
            PathBuf::from(config.base_path()),
        )?;
        Ok(Arc::new(model))
    }

    pub fn index_storage(config: &Config) -> IndexStorage {
        IndexStorage::new(config.resolve(&config.semantic_search.index_path))
    }

    /// Searcher over the configured catalog.
    ///
    /// The model is loaded only when an index exists; without one, empty
    /// queries still list the catalog.
    pub fn create_searcher(config: &Config, catalog: Arc<Catalog>) -> Result<Searcher> {
        let storage = Self::index_storage(config);
        let searcher = Searcher::new(catalog);

        if !storage.exists() {
            log::warn!(
                "no index at {}, run `shopsearch index` to enable search",
                storage.path().display()
            );
            return Ok(searcher);
        }

        let model = Self::load_model(config)?;
        let model_id = model_id_hash(model.name());

        let searcher = match open_index(&storage, &model_id, model.dimensions())? {
            Some(index) => searcher.with_index(index),
            None => searcher,
        };

        Ok(searcher.with_embedder(model))
    }

    pub fn create_preference_store(paths: &AppPaths) -> Result<PreferenceStore> {
        let backend = storage::BackendLocal::new(&paths.base_path)?;
        Ok(PreferenceStore::new(Arc::new(backend), DEFAULT_PREFS_IDENT))
    }

    /// Everything a search session needs: config, catalog, searcher and
    /// saved click history.
    pub fn create_session(paths: &AppPaths) -> Result<Session> {
        let config = Self::create_config(paths)?;
        let catalog = Self::load_catalog(&config)?;
        let searcher = Self::create_searcher(&config, catalog)?;
        let prefs = Self::create_preference_store(paths)?;

        Ok(Session::new(config, searcher, prefs)?)
    }

    /// Session for commands that never embed a query (clicks, preferences,
    /// recommendations), so neither model nor index is loaded.
    pub fn create_offline_session(paths: &AppPaths) -> Result<Session> {
        let config = Self::create_config(paths)?;
        let catalog = Self::load_catalog(&config)?;
        let prefs = Self::create_preference_store(paths)?;

        Ok(Session::new(config, Searcher::new(catalog), prefs)?)
    }

    /// Embed the whole catalog and write the index, returning the row count.
    pub fn build_index(config: &Config) -> Result<usize> {
        let catalog = Self::load_catalog(config)?;
        let model = Self::load_model(config)?;
        let storage = Self::index_storage(config);

        let index = Indexer::new(model.as_ref(), config.semantic_search.batch_size)
            .with_progress(true)
            .build_and_save(&catalog, &storage, &model_id_hash(model.name()))?;

        Ok(index.len())
    }
}

/// Read a stored index, treating one built for another model or format as absent.
pub(crate) fn open_index(
    storage: &IndexStorage,
    model_id: &[u8; 32],
    dimensions: usize,
) -> Result<Option<StoredIndex>, IndexStorageError> {
    match storage.load(model_id, dimensions) {
        Ok(stored) => {
            log::info!("loaded index with {} rows", stored.index.len());
            Ok(Some(stored))
        }
        Err(IndexStorageError::ModelMismatch) => {
            log::warn!("index was built with another model, rebuild it with `shopsearch index`");
            Ok(None)
        }
        Err(IndexStorageError::DimensionMismatch { expected, got }) => {
            log::warn!("index has {got} dimensions, model has {expected}, rebuild the index");
            Ok(None)
        }
        Err(IndexStorageError::VersionMismatch(file_ver, _)) => {
            log::warn!("index format version {file_ver} unsupported, rebuild the index");
            Ok(None)
        }
        Err(err) => {
            log::error!("failed to load index: {err}");
            Err(err)
        }
    }
}

/// Application paths structure
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_path: String,
}
