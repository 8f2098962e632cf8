//! Port for obtaining the current wall-clock time.
//!
//! Every time-dependent decision (dedup window, identity stamps, session
//! duration) reads an injected clock, so tests can drive time explicitly.
//! See [`crate::mock::ManualClock`] for the controllable test clock.

use crate::Timestamp;
use std::fmt::Debug;

/// Source of "now".
pub trait Clock: Send + Sync + Debug {
    /// Get the current time.
    fn now(&self) -> Timestamp;
}

/// System clock implementation using [`Timestamp::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
