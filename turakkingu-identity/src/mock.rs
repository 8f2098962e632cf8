//! Test doubles for the fingerprint capability.

use crate::error::{FingerprintError, FingerprintResult};
use crate::fingerprint::FingerprintSource;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a [`MockFingerprint`] does when loaded.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Loads after `delay` and returns the fixed value.
    Fixed { value: String, delay: Duration },
    /// Fails to load.
    Unreachable,
    /// Never finishes loading.
    Hang,
}

/// A fingerprint source with scripted behavior that counts loads.
///
/// Clones share the load counter.
#[derive(Debug, Clone)]
pub struct MockFingerprint {
    behavior: MockBehavior,
    loads: Arc<AtomicUsize>,
}

impl MockFingerprint {
    /// Returns `value` immediately.
    pub fn fixed(value: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::Fixed {
            value: value.into(),
            delay: Duration::ZERO,
        })
    }

    /// Returns `value` after `delay`.
    pub fn delayed(value: impl Into<String>, delay: Duration) -> Self {
        Self::with_behavior(MockBehavior::Fixed {
            value: value.into(),
            delay,
        })
    }

    pub fn unreachable() -> Self {
        Self::with_behavior(MockBehavior::Unreachable)
    }

    pub fn hanging() -> Self {
        Self::with_behavior(MockBehavior::Hang)
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many times `load` was called.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FingerprintSource for MockFingerprint {
    async fn load(&self) -> FingerprintResult<()> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Fixed { delay, .. } => {
                if !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
                Ok(())
            }
            MockBehavior::Unreachable => {
                Err(FingerprintError::Unavailable("script failed to load".into()))
            }
            MockBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    async fn fingerprint(&self) -> FingerprintResult<String> {
        match &self.behavior {
            MockBehavior::Fixed { value, .. } => Ok(value.clone()),
            _ => Err(FingerprintError::Generation("not loaded".into())),
        }
    }
}
