//! Tracker configuration.
//!
//! Every field has a default, so a host can hand over a partial JSON
//! object and get the deployed behaviour for everything it leaves out.

use crate::params::ParamNames;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use turakkingu_delivery::{DeliveryConfig, WireFormat};
use turakkingu_identity::IdentityConfig;
use turakkingu_types::names;

/// Retry and transport-selection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub beacon_events: BTreeSet<String>,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        let defaults = DeliveryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            base_delay_ms: defaults.base_delay_ms,
            max_delay_ms: defaults.max_delay_ms,
            beacon_events: defaults.beacon_events,
        }
    }
}

/// Configuration for a [`Tracker`](crate::Tracker).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Collector base URL.
    pub endpoint: String,
    pub wire_format: WireFormat,

    pub cookie_name: String,
    pub cookie_max_age_secs: i64,
    /// Explicit cookie domain; detected when absent.
    pub cookie_domain: Option<String>,
    pub storage_key: String,
    pub dedup_storage_key: String,

    /// URL parameter names used for inbound and outbound attribution.
    pub params: ParamNames,

    pub dedup_window_ms: u64,
    /// Property names that identify an event, per event name.
    pub significant_fields: BTreeMap<String, Vec<String>>,

    pub refresh_interval_ms: u64,
    pub fingerprint_timeout_ms: u64,

    pub enable_fingerprint: bool,
    pub enable_itp_handling: bool,
    pub enable_auto_tracking: bool,
    pub enable_deduplication: bool,
    pub enable_cross_domain_propagation: bool,

    /// Domains (and their subdomains) that receive propagated parameters.
    /// Empty means every domain.
    pub propagate_to_domains: Vec<String>,

    pub delivery: DeliverySettings,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        let identity = IdentityConfig::default();
        Self {
            endpoint: "http://localhost:8080".to_string(),
            wire_format: WireFormat::Compact,
            cookie_name: identity.cookie_name,
            cookie_max_age_secs: identity.cookie_max_age_secs,
            cookie_domain: None,
            storage_key: identity.storage_key,
            dedup_storage_key: "_zt_dedup".to_string(),
            params: ParamNames::default(),
            dedup_window_ms: 60 * 60 * 1000,
            significant_fields: default_significant_fields(),
            refresh_interval_ms: 23 * 60 * 60 * 1000,
            fingerprint_timeout_ms: 5_000,
            enable_fingerprint: true,
            enable_itp_handling: true,
            enable_auto_tracking: true,
            enable_deduplication: true,
            enable_cross_domain_propagation: true,
            propagate_to_domains: Vec::new(),
            delivery: DeliverySettings::default(),
        }
    }
}

impl TrackerConfig {
    pub fn identity_config(&self) -> IdentityConfig {
        IdentityConfig {
            cookie_name: self.cookie_name.clone(),
            storage_key: self.storage_key.clone(),
            cookie_max_age_secs: self.cookie_max_age_secs,
        }
    }

    pub fn delivery_config(&self) -> DeliveryConfig {
        DeliveryConfig {
            endpoint: self.endpoint.clone(),
            wire_format: self.wire_format,
            max_attempts: self.delivery.max_attempts,
            base_delay_ms: self.delivery.base_delay_ms,
            max_delay_ms: self.delivery.max_delay_ms,
            beacon_events: self.delivery.beacon_events.clone(),
        }
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    /// `None` when `refresh_interval_ms` is zero, which turns the refresh
    /// cycle off.
    pub fn refresh_interval(&self) -> Option<Duration> {
        Some(Duration::from_millis(self.refresh_interval_ms)).filter(|d| !d.is_zero())
    }

    pub fn fingerprint_timeout(&self) -> Duration {
        Duration::from_millis(self.fingerprint_timeout_ms)
    }
}

fn default_significant_fields() -> BTreeMap<String, Vec<String>> {
    [
        (names::CONVERSION, &["orderId", "value"][..]),
        (names::PURCHASE, &["orderId", "transactionId"][..]),
        (names::FORM_SUBMIT, &["formId"][..]),
        (names::PAGE_VIEW, &["path"][..]),
        (names::NAVIGATION, &["path"][..]),
    ]
    .into_iter()
    .map(|(name, fields)| {
        (
            name.to_string(),
            fields.iter().map(|f| f.to_string()).collect(),
        )
    })
    .collect()
}
