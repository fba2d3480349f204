//! Error types for gantry-script

use thiserror::Error;

/// Configuration loading error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
