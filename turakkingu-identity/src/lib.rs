//! Visitor identity management for the turakkingu tracker.
//!
//! This crate handles:
//! - Encoding the identity record into a cookie-safe value and back
//! - Resolving, establishing, refreshing and clearing the identity
//! - Best-effort device fingerprinting behind a pluggable capability
//!
//! # Cookie Format
//!
//! The cookie value is `base64(json)` with padding stripped, where the
//! JSON is the [`IdentityRecord`](turakkingu_types::IdentityRecord) shape.
//! The key-value store holds the same JSON unencoded.

mod codec;
mod error;
mod fingerprint;
mod manager;

pub mod mock;

pub use codec::{decode_cookie, encode_cookie, restore_padding};
pub use error::{CodecError, CodecResult, FingerprintError, FingerprintResult};
pub use fingerprint::{
    DeviceTraits, FingerprintProvider, FingerprintSource, FingerprintState, TraitsFingerprint,
};
pub use manager::{IdentityConfig, IdentityManager};
