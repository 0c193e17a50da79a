//! Router error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("History error: {0}")]
    History(#[from] wayline_history::HistoryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
