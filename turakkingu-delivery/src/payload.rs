//! Wire payloads.
//!
//! Two collector dialects exist. The compact one is what the deployed
//! collector accepts at `/v1/tracks/events`; the rich one carries the full
//! event and session to `/event`.

use crate::error::DeliveryResult;
use serde::{Deserialize, Serialize};
use turakkingu_types::{Event, Identity, Properties};

/// Collector dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    #[default]
    Compact,
    Rich,
}

impl WireFormat {
    /// Path appended to the endpoint.
    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            Self::Compact => "/v1/tracks/events",
            Self::Rich => "/event",
        }
    }

    /// Serializes an event in this dialect.
    pub fn encode(&self, event: &Event) -> DeliveryResult<String> {
        let body = match self {
            Self::Compact => serde_json::to_string(&CompactPayload::from(event))?,
            Self::Rich => serde_json::to_string(&RichPayload::from(event))?,
        };
        Ok(body)
    }
}

/// Minimal body of `POST /v1/tracks/events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactPayload {
    pub track_id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fp: Option<String>,
    /// Milliseconds since the epoch.
    pub published_at: u64,
    pub event_name: String,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

impl From<&Event> for CompactPayload {
    fn from(event: &Event) -> Self {
        Self {
            track_id: event.identity().id().to_string(),
            url: event.source_url().to_string(),
            fp: event.identity().device_fingerprint().map(str::to_string),
            published_at: event.occurred_at().as_millis(),
            event_name: event.name().to_string(),
            properties: event.properties().clone(),
        }
    }
}

/// Full body of `POST /event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichPayload {
    pub name: String,
    /// Event properties plus the page `url` and `title`.
    pub properties: Properties,
    pub timestamp: u64,
    pub session: Identity,
}

impl From<&Event> for RichPayload {
    fn from(event: &Event) -> Self {
        let mut properties = event.properties().clone();
        properties
            .entry("url".to_string())
            .or_insert_with(|| event.source_url().into());
        if !event.source_title().is_empty() {
            properties
                .entry("title".to_string())
                .or_insert_with(|| event.source_title().into());
        }
        Self {
            name: event.name().to_string(),
            properties,
            timestamp: event.occurred_at().as_millis(),
            session: event.identity().clone(),
        }
    }
}
