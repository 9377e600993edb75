//! Error types for gridloom

use thiserror::Error;

/// Core error type for gridloom operations
#[derive(Error, Debug)]
pub enum GridError {
    #[error("Remote call failed with status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for gridloom operations
pub type Result<T> = std::result::Result<T, GridError>;
