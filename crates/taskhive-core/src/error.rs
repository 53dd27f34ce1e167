use thiserror::Error;

use crate::model::task::StatusError;

#[derive(Debug, Error)]
pub enum HiveError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Transition(#[from] StatusError),
}

pub type Result<T> = std::result::Result<T, HiveError>;
