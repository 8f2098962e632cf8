//! Error types for identity and fingerprint handling.

use thiserror::Error;

/// Result type for cookie codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors decoding a persisted identity. Every one of these means
/// "no identity here", never a partially trusted record.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Base64 text whose length leaves a remainder of 1 modulo 4 cannot
    /// be padded into valid input.
    #[error("invalid base64 length {0}")]
    InvalidLength(usize),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid identity record: {0}")]
    Invalid(#[from] turakkingu_types::Error),
}

/// Result type for fingerprint capability operations.
pub type FingerprintResult<T> = Result<T, FingerprintError>;

/// Errors from the fingerprint capability.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// The capability could not be loaded (script unreachable, blocked).
    #[error("fingerprint capability unavailable: {0}")]
    Unavailable(String),

    /// The capability loaded but failed to produce a value.
    #[error("fingerprint generation failed: {0}")]
    Generation(String),

    /// Loading or generation exceeded the allotted wait.
    #[error("fingerprint timed out")]
    Timeout,
}
