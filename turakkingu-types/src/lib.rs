//! Core type definitions for the turakkingu tracker.
//!
//! This crate defines the host-agnostic types shared by every component:
//! - Visitor identifiers and the persisted identity record
//! - Millisecond wall-clock timestamps and the clock port
//! - Trackable events and their property bags
//!
//! Nothing here touches a browser, a network or a storage backend.

mod clock;
mod event;
mod identity;
mod ids;
mod timestamp;

pub mod mock;

pub use clock::{Clock, SystemClock};
pub use event::{names, Event, Properties};
pub use identity::{Identity, IdentityRecord, ORGANIC_CAMPAIGN};
pub use ids::SessionId;
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
}
