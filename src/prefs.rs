//! Click-history persistence.
//!
//! The click history is the only personalization state that is stored; the
//! profile is always re-derived from it. File shape:
//! `{"click_history": [<id>, ...]}`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::storage::StorageManager;

pub const DEFAULT_PREFS_IDENT: &str = "preference/user_prefs.json";

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed preference file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub click_history: Vec<i64>,
}

#[derive(Clone)]
pub struct PreferenceStore {
    store: Arc<dyn StorageManager>,
    ident: String,
}

impl PreferenceStore {
    pub fn new(store: Arc<dyn StorageManager>, ident: &str) -> Self {
        Self {
            store,
            ident: ident.to_string(),
        }
    }

    /// Saved click history, empty when nothing was saved yet.
    pub fn load(&self) -> Result<Vec<i64>, PreferenceError> {
        if !self.store.exists(&self.ident) {
            return Ok(vec![]);
        }

        let data = self.store.read(&self.ident)?;
        let prefs: Preferences = serde_json::from_slice(&data)?;
        log::debug!("loaded {} clicks from {}", prefs.click_history.len(), self.ident);

        Ok(prefs.click_history)
    }

    pub fn save(&self, click_history: &[i64]) -> Result<(), PreferenceError> {
        let prefs = Preferences {
            click_history: click_history.to_vec(),
        };
        self.store.write(&self.ident, &serde_json::to_vec(&prefs)?)?;
        Ok(())
    }
}
