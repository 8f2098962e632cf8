//! Event deduplication.
//!
//! An event is identified by its name plus a handful of significant
//! properties, not by its whole payload. Once sent, the same key is
//! suppressed for the deduplication window. The table is persisted so the
//! window survives reloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use turakkingu_storage::StorageAdapter;
use turakkingu_types::{Clock, Event, Properties, Timestamp};

/// Property names used when an event kind has no configured field list.
const FALLBACK_FIELD_COUNT: usize = 5;

/// Length of the hex key kept per event.
const KEY_LEN: usize = 16;

/// Computes the dedup key for an event.
///
/// `fields` lists the significant properties; with `None` the first few
/// property names in sorted order are used. Null and missing properties
/// are both omitted, so they produce the same key.
pub fn dedup_key(name: &str, properties: &Properties, fields: Option<&[String]>) -> String {
    let significant: BTreeMap<&str, &Value> = match fields {
        Some(fields) => fields
            .iter()
            .filter_map(|f| {
                properties
                    .get_key_value(f.as_str())
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k.as_str(), v))
            })
            .collect(),
        None => properties
            .iter()
            .filter(|(_, v)| !v.is_null())
            .take(FALLBACK_FIELD_COUNT)
            .map(|(k, v)| (k.as_str(), v))
            .collect(),
    };

    let canonical = serde_json::json!({ "name": name, "fields": significant });
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    let mut key = hex::encode(hasher.finalize());
    key.truncate(KEY_LEN);
    key
}

/// When each key was last sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupTable {
    #[serde(default)]
    sent: BTreeMap<String, Timestamp>,
}

impl DedupTable {
    /// Whether `key` was sent less than `window` before `now`.
    pub fn is_recent(&self, key: &str, now: Timestamp, window: Duration) -> bool {
        self.sent
            .get(key)
            .is_some_and(|&at| now.saturating_since(at) < window)
    }

    pub fn mark(&mut self, key: String, now: Timestamp) {
        self.sent.insert(key, now);
    }

    /// Drops every entry that no longer blocks a resend.
    pub fn prune(&mut self, now: Timestamp, window: Duration) {
        self.sent.retain(|_, at| now.saturating_since(*at) < window);
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}

/// Deduplication settings.
#[derive(Debug, Clone)]
pub struct DedupConfig {
    pub enabled: bool,
    pub window: Duration,
    pub storage_key: String,
    pub significant_fields: BTreeMap<String, Vec<String>>,
}

/// A persisted [`DedupTable`].
///
/// Single writer: the tracker owns it and mutates it under its own lock.
pub struct DedupStore {
    storage: Arc<StorageAdapter>,
    clock: Arc<dyn Clock>,
    config: DedupConfig,
    table: DedupTable,
}

impl DedupStore {
    /// Loads the persisted table, discarding expired entries.
    pub fn load(storage: Arc<StorageAdapter>, clock: Arc<dyn Clock>, config: DedupConfig) -> Self {
        let mut table: DedupTable = storage.read(&config.storage_key).unwrap_or_default();
        table.prune(clock.now(), config.window);
        Self {
            storage,
            clock,
            config,
            table,
        }
    }

    pub fn key_for(&self, event: &Event) -> String {
        let fields = self
            .config
            .significant_fields
            .get(event.name())
            .map(Vec::as_slice);
        dedup_key(event.name(), event.properties(), fields)
    }

    /// False if an identical event was sent within the window.
    pub fn should_send(&self, event: &Event) -> bool {
        if !self.config.enabled {
            return true;
        }
        let key = self.key_for(event);
        if self.table.is_recent(&key, self.clock.now(), self.config.window) {
            debug!(event = event.name(), key, "blocked duplicate event");
            return false;
        }
        true
    }

    /// Records the event as sent now and persists the pruned table.
    pub fn mark_sent(&mut self, event: &Event) {
        if !self.config.enabled {
            return;
        }
        let now = self.clock.now();
        let key = self.key_for(event);
        self.table.mark(key, now);
        self.table.prune(now, self.config.window);
        if !self.storage.write(&self.config.storage_key, &self.table) {
            debug!("dedup table not persisted");
        }
    }

    pub fn table(&self) -> &DedupTable {
        &self.table
    }
}
