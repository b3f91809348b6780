use crate::{
    personalization::{
        BoostWeights, DEFAULT_BOOST_CATEGORY, DEFAULT_BOOST_COLOR, DEFAULT_BOOST_EXACT_CLICK,
        DEFAULT_PROFILE_TOP_K,
    },
    search::DEFAULT_TOP_K,
    semantic::DEFAULT_MODEL,
    storage::{self, StorageManager},
};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

const CONFIG_IDENT: &str = "config.yaml";

const DEFAULT_CATALOG_PATH: &str = "catalog.csv";
const DEFAULT_INDEX_PATH: &str = "index/faiss_index.bin";
const DEFAULT_BATCH_SIZE: usize = 64;
const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
const DEFAULT_DISPLAY_LIMIT: usize = 10;
const DEFAULT_RECOMMENDATIONS_PER_CATEGORY: usize = 5;

/// Configuration for embedding and retrieval
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SemanticSearchConfig {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_semantic_model")]
    pub model: String,

    /// Index file, relative to the base directory unless absolute
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// Number of neighbors fetched per query before filtering
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Products embedded per model call when building the index
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for SemanticSearchConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            index_path: DEFAULT_INDEX_PATH.to_string(),
            top_k: DEFAULT_TOP_K,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

fn default_semantic_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_index_path() -> String {
    DEFAULT_INDEX_PATH.to_string()
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Click-based re-ranking weights
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonalizationConfig {
    #[serde(default = "default_boost_exact_click")]
    pub boost_exact_click: f32,
    #[serde(default = "default_boost_category")]
    pub boost_category: f32,
    #[serde(default = "default_boost_color")]
    pub boost_color: f32,

    /// Preferred categories/colors kept in a profile
    #[serde(default = "default_profile_top_k")]
    pub profile_top_k: usize,
}

impl Default for PersonalizationConfig {
    fn default() -> Self {
        Self {
            boost_exact_click: DEFAULT_BOOST_EXACT_CLICK,
            boost_category: DEFAULT_BOOST_CATEGORY,
            boost_color: DEFAULT_BOOST_COLOR,
            profile_top_k: DEFAULT_PROFILE_TOP_K,
        }
    }
}

impl PersonalizationConfig {
    pub fn weights(&self) -> BoostWeights {
        BoostWeights {
            exact_click: self.boost_exact_click,
            category: self.boost_category,
            color: self.boost_color,
        }
    }
}

fn default_boost_exact_click() -> f32 {
    DEFAULT_BOOST_EXACT_CLICK
}

fn default_boost_category() -> f32 {
    DEFAULT_BOOST_CATEGORY
}

fn default_boost_color() -> f32 {
    DEFAULT_BOOST_COLOR
}

fn default_profile_top_k() -> usize {
    DEFAULT_PROFILE_TOP_K
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Results shown per search
    #[serde(default = "default_display_limit")]
    pub display_limit: usize,

    #[serde(default = "default_recommendations_per_category")]
    pub recommendations_per_category: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            display_limit: DEFAULT_DISPLAY_LIMIT,
            recommendations_per_category: DEFAULT_RECOMMENDATIONS_PER_CATEGORY,
        }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_display_limit() -> usize {
    DEFAULT_DISPLAY_LIMIT
}

fn default_recommendations_per_category() -> usize {
    DEFAULT_RECOMMENDATIONS_PER_CATEGORY
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Catalog CSV, relative to the base directory unless absolute
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
    #[serde(default)]
    pub semantic_search: SemanticSearchConfig,
    #[serde(default)]
    pub personalization: PersonalizationConfig,
    #[serde(default)]
    pub web: WebConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: DEFAULT_CATALOG_PATH.to_string(),
            semantic_search: SemanticSearchConfig::default(),
            personalization: PersonalizationConfig::default(),
            web: WebConfig::default(),
            base_path: String::new(),
        }
    }
}

fn default_catalog_path() -> String {
    DEFAULT_CATALOG_PATH.to_string()
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let sem = &self.semantic_search;
        if sem.top_k == 0 {
            bail!("semantic_search.top_k must be greater than 0");
        }
        if sem.batch_size == 0 {
            bail!("semantic_search.batch_size must be greater than 0");
        }

        let pers = &self.personalization;
        for (name, value) in [
            ("boost_exact_click", pers.boost_exact_click),
            ("boost_category", pers.boost_category),
            ("boost_color", pers.boost_color),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("personalization.{name} must be a non-negative number, got {value}");
            }
        }
        if pers.profile_top_k == 0 {
            bail!("personalization.profile_top_k must be greater than 0");
        }

        if self.web.display_limit == 0 {
            bail!("web.display_limit must be greater than 0");
        }

        Ok(())
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(base_path)
            .with_context(|| format!("failed to create base directory {base_path}"))?;

        // create new if does not exist
        if !store.exists(CONFIG_IDENT) {
            log::info!("writing default config to {base_path}/{CONFIG_IDENT}");
            store.write(CONFIG_IDENT, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str = String::from_utf8(store.read(CONFIG_IDENT)?)
            .context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_IDENT, config_str.as_bytes())?;
        Ok(())
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Resolve a configured path against the base directory.
    pub fn resolve(&self, path: &str) -> std::path::PathBuf {
        let path = std::path::Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::path::Path::new(&self.base_path).join(path)
        }
    }
}
