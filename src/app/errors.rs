use crate::{prefs::PreferenceError, search::SearchError};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("product {0} not found")]
    NotFound(i64),

    #[error("invalid product id: {0}")]
    InvalidId(String),

    #[error("invalid search request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Search(#[from] SearchError),

    #[error("preference error: {0}")]
    Preference(#[from] PreferenceError),
}
