//! History error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Host navigation failed: {0}")]
    Host(String),
}
