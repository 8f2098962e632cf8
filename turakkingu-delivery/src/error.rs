//! Error types for event delivery.

use thiserror::Error;

/// Result type for delivery operations.
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Why a single delivery attempt failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The request never got a response.
    #[error("network error: {0}")]
    Network(String),

    /// The collector answered with a non-success status.
    #[error("collector returned status {0}")]
    Status(u16),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
