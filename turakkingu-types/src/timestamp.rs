//! Wall-clock timestamps in milliseconds since the Unix epoch.
//!
//! This is the unit the collector, the cookie payload and the dedup table
//! all agree on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Inbound values below this are taken to be seconds, not milliseconds.
/// 10^11 ms is early 1973; 10^11 s is past the year 5000.
const SECONDS_THRESHOLD: u64 = 100_000_000_000;

/// Milliseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Returns the current wall-clock time.
    ///
    /// A system clock set before the epoch reads as the epoch itself.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    /// Creates a timestamp from milliseconds since the epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Interprets a raw inbound value as seconds or milliseconds,
    /// depending on its magnitude.
    #[must_use]
    pub const fn from_secs_or_millis(raw: u64) -> Self {
        if raw < SECONDS_THRESHOLD {
            Self(raw.saturating_mul(1000))
        } else {
            Self(raw)
        }
    }

    /// Returns milliseconds since the epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    #[must_use]
    pub fn saturating_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// Returns this timestamp shifted forward by `d`.
    #[must_use]
    pub fn saturating_add(&self, d: Duration) -> Self {
        Self(self.0.saturating_add(d.as_millis() as u64))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
