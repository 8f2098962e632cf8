//! Device fingerprinting.
//!
//! The fingerprint is a secondary matching signal. It is produced by an
//! external capability that has to be loaded first (in a browser, a
//! dynamically injected script), so it is strictly best-effort: loading is
//! bounded in time, a failure yields an empty string, and nothing in the
//! identity flow ever waits for it.

use crate::error::{FingerprintError, FingerprintResult};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// A capability that can compute a device fingerprint.
#[async_trait]
pub trait FingerprintSource: Send + Sync {
    /// Makes the capability available (fetches and evaluates it).
    async fn load(&self) -> FingerprintResult<()>;

    /// Computes the fingerprint. Only called after a successful `load`.
    async fn fingerprint(&self) -> FingerprintResult<String>;
}

/// Lifecycle of a [`FingerprintProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintState {
    Unloaded,
    Loading,
    Ready,
    Unavailable,
}

/// Caches one fingerprint per page load.
///
/// Concurrent [`generate`](Self::generate) calls made before the first one
/// completes all await the same load.
pub struct FingerprintProvider {
    source: Arc<dyn FingerprintSource>,
    timeout: Duration,
    started: AtomicBool,
    value: OnceCell<String>,
}

impl FingerprintProvider {
    pub fn new(source: Arc<dyn FingerprintSource>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            started: AtomicBool::new(false),
            value: OnceCell::new(),
        }
    }

    pub fn state(&self) -> FingerprintState {
        match self.value.get() {
            Some(fp) if fp.is_empty() => FingerprintState::Unavailable,
            Some(_) => FingerprintState::Ready,
            None if self.started.load(Ordering::SeqCst) => FingerprintState::Loading,
            None => FingerprintState::Unloaded,
        }
    }

    /// Returns the fingerprint, loading the capability on first use.
    ///
    /// Resolves to an empty string when the capability fails or does not
    /// answer within the timeout.
    pub async fn generate(&self) -> String {
        self.value
            .get_or_init(|| async {
                self.started.store(true, Ordering::SeqCst);
                match tokio::time::timeout(self.timeout, self.compute()).await {
                    Ok(Ok(fp)) => {
                        debug!("device fingerprint ready");
                        fp
                    }
                    Ok(Err(e)) => {
                        warn!(error = %e, "fingerprinting disabled");
                        String::new()
                    }
                    Err(_) => {
                        warn!(error = %FingerprintError::Timeout, "fingerprinting disabled");
                        String::new()
                    }
                }
            })
            .await
            .clone()
    }

    async fn compute(&self) -> FingerprintResult<String> {
        self.source.load().await?;
        self.source.fingerprint().await
    }
}

/// Browser traits available to a script without any external capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTraits {
    pub user_agent: String,
    pub language: String,
    /// Minutes offset from UTC, as `Date#getTimezoneOffset` reports it.
    pub timezone_offset: i32,
    /// `"{width}x{height}"`.
    pub screen: String,
    pub platform: String,
}

/// A fingerprint source that hashes [`DeviceTraits`].
///
/// Weaker than a full fingerprinting library but needs nothing loaded;
/// used where no external capability is available.
#[derive(Debug, Clone)]
pub struct TraitsFingerprint {
    traits: DeviceTraits,
}

impl TraitsFingerprint {
    pub fn new(traits: DeviceTraits) -> Self {
        Self { traits }
    }

    /// The stable hash of the traits.
    #[must_use]
    pub fn compute(&self) -> String {
        let combined = [
            self.traits.user_agent.as_str(),
            self.traits.language.as_str(),
            &self.traits.timezone_offset.to_string(),
            self.traits.screen.as_str(),
            self.traits.platform.as_str(),
        ]
        .join("|");

        let mut hasher = Sha256::new();
        hasher.update(combined.as_bytes());
        let hash = hasher.finalize();

        BASE64.encode(&hash[..16])
    }
}

#[async_trait]
impl FingerprintSource for TraitsFingerprint {
    async fn load(&self) -> FingerprintResult<()> {
        Ok(())
    }

    async fn fingerprint(&self) -> FingerprintResult<String> {
        Ok(self.compute())
    }
}
