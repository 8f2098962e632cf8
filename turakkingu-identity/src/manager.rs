//! Identity manager: owns the persisted visitor identity.
//!
//! The cookie is the primary copy (it is visible across subdomains of the
//! registrable domain); the key-value store is the backup for browsers
//! that cap or drop script-written cookies. Both copies always carry the
//! same payload.
//!
//! Validity is presence of a non-empty id only. Whether an identity is
//! still inside an attribution window is the collector's decision.

use crate::codec::{decode_cookie, encode_cookie};
use std::sync::Arc;
use tracing::{debug, info, warn};
use turakkingu_storage::StorageAdapter;
use turakkingu_types::{Clock, Identity, IdentityRecord, SessionId, Timestamp};

/// Where and how long the identity is kept.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Cookie name.
    pub cookie_name: String,
    /// Key in the key-value store.
    pub storage_key: String,
    /// Cookie lifetime in seconds.
    pub cookie_max_age_secs: i64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            cookie_name: "_zt_id".to_string(),
            storage_key: "_zt_identity".to_string(),
            cookie_max_age_secs: 30 * 24 * 60 * 60,
        }
    }
}

/// Creates, reads back, refreshes and clears the visitor identity.
pub struct IdentityManager {
    storage: Arc<StorageAdapter>,
    clock: Arc<dyn Clock>,
    config: IdentityConfig,
}

impl IdentityManager {
    pub fn new(storage: Arc<StorageAdapter>, clock: Arc<dyn Clock>, config: IdentityConfig) -> Self {
        Self {
            storage,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Reads the persisted identity, cookie first, then the store copy.
    ///
    /// A copy that fails to decode or validate is skipped, never repaired.
    pub fn resolve(&self) -> Option<Identity> {
        if let Some(value) = self.storage.read_cookie(&self.config.cookie_name) {
            match decode_cookie(&value) {
                Ok(identity) => return Some(identity),
                Err(e) => debug!(error = %e, "identity cookie rejected"),
            }
        }

        self.storage
            .read_valid(&self.config.storage_key, |record: IdentityRecord| {
                Identity::try_from(record)
            })
    }

    /// Creates a new identity and persists it to both copies.
    pub fn establish(
        &self,
        id: SessionId,
        campaign: Option<String>,
        timestamp: Timestamp,
    ) -> Identity {
        let identity = Identity::new(id, campaign, timestamp);
        self.persist(&identity);
        info!(id = %identity.id(), "established identity");
        identity
    }

    /// Stamps a resumed identity as seen now and re-persists it.
    pub fn touch(&self, identity: Identity) -> Identity {
        let identity = identity.seen(self.clock.now());
        self.persist(&identity);
        identity
    }

    /// Re-reads the persisted identity and writes it back with
    /// `refreshed_at` stamped, restarting the cookie lifetime.
    ///
    /// Returns the refreshed identity, or `None` if there was nothing to
    /// refresh.
    pub fn refresh(&self) -> Option<Identity> {
        let identity = self.resolve()?.refreshed(self.clock.now());
        self.persist(&identity);
        debug!(id = %identity.id(), "refreshed identity");
        Some(identity)
    }

    /// Writes the same payload to the cookie and the store.
    pub fn persist(&self, identity: &Identity) {
        match encode_cookie(identity) {
            Ok(encoded) => self.storage.write_cookie(
                &self.config.cookie_name,
                &encoded,
                self.config.cookie_max_age_secs,
            ),
            Err(e) => warn!(error = %e, "failed to encode identity cookie"),
        }
        if !self.storage.write(&self.config.storage_key, identity) {
            debug!("identity kept in cookie only");
        }
    }

    /// Deletes both persisted copies.
    pub fn clear(&self) {
        self.storage.delete_cookie(&self.config.cookie_name);
        self.storage.remove(&self.config.storage_key);
        info!("cleared identity");
    }
}
