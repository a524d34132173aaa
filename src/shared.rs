use std::sync::Arc;
use thiserror::Error;

use crate::api::{ApiError, GameApi};
use crate::calendar::CalendarError;
use crate::config::ConfigError;
use crate::rating::RatingError;
use crate::store::Store;

/// Shared dependencies handed to every service
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub api: Arc<dyn GameApi>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, api: Arc<dyn GameApi>) -> Self {
        Self { store, api }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("Rating error: {0}")]
    Rating(#[from] RatingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Batch timed out after {0} seconds")]
    Timeout(u64),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}
