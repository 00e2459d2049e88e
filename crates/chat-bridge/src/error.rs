//! Bridge error types.

use thiserror::Error;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// The translation provider answered with an error.
    #[error("translation provider error: {0}")]
    Provider(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Required configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BridgeError {
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
