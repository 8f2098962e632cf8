//! Event sender: transport choice, retry and the teardown path.

use crate::payload::WireFormat;
use crate::transport::{Channel, EventTransport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use turakkingu_types::{names, Event};

/// Delivery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Collector base URL, without a trailing path.
    pub endpoint: String,
    pub wire_format: WireFormat,
    /// Total sends per event, the first included.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Events that never need a response and may go out as beacons.
    pub beacon_events: BTreeSet<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            wire_format: WireFormat::Compact,
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            beacon_events: [
                names::PAGE_VIEW,
                names::PAGE_HIDDEN,
                names::PAGE_VISIBLE,
                names::SESSION_START,
                names::SESSION_END,
                names::NAVIGATION,
                names::CLICK,
                names::SCROLL_DEPTH,
                names::ENGAGEMENT_TIME,
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Terminal state of one event's delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32, channel: Channel },
    Exhausted { attempts: u32 },
    /// The event could not be serialized and was never sent.
    Unencodable,
}

/// Ships events to the collector. Never fails to the caller.
pub struct EventSender {
    transport: Arc<dyn EventTransport>,
    config: DeliveryConfig,
}

impl EventSender {
    pub fn new(transport: Arc<dyn EventTransport>, config: DeliveryConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    /// Full collector URL for the configured dialect.
    pub fn url(&self) -> String {
        format!(
            "{}{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.wire_format.path()
        )
    }

    /// Whether this event kind may use the beacon primitive.
    pub fn uses_beacon(&self, name: &str) -> bool {
        self.config.beacon_events.contains(name)
    }

    /// Delay before the retry that follows `attempt` failed sends.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let millis = self
            .config
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.config.max_delay_ms);
        Duration::from_millis(millis)
    }

    /// Delivers an event, retrying with exponential backoff.
    ///
    /// Each attempt tries the beacon first for eligible events, then a
    /// regular request. After `max_attempts` failures the event is dropped.
    pub async fn send(&self, event: &Event) -> DeliveryOutcome {
        let body = match self.config.wire_format.encode(event) {
            Ok(body) => body,
            Err(e) => {
                warn!(event = event.name(), error = %e, "dropping unencodable event");
                return DeliveryOutcome::Unencodable;
            }
        };
        let url = self.url();
        let beacon = self.uses_beacon(event.name());
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.retry_delay(attempt - 1);
                debug!(event = event.name(), attempt, ?delay, "scheduling retry");
                tokio::time::sleep(delay).await;
            }

            if beacon && self.transport.supports_beacon() && self.transport.send_beacon(&url, &body)
            {
                debug!(event = event.name(), attempt, "sent via beacon");
                return DeliveryOutcome::Delivered {
                    attempts: attempt,
                    channel: Channel::Beacon,
                };
            }

            match self.transport.post(&url, body.clone()).await {
                Ok(()) => {
                    debug!(event = event.name(), attempt, "sent via request");
                    return DeliveryOutcome::Delivered {
                        attempts: attempt,
                        channel: Channel::Request,
                    };
                }
                Err(e) => debug!(event = event.name(), attempt, error = %e, "send failed"),
            }
        }

        warn!(event = event.name(), attempts = max_attempts, "giving up on event");
        DeliveryOutcome::Exhausted {
            attempts: max_attempts,
        }
    }

    /// Sends the teardown event synchronously, bypassing retry.
    ///
    /// Uses the beacon when there is one, otherwise (or if the beacon is
    /// refused) a blocking request.
    pub fn send_session_end(&self, event: &Event) -> DeliveryOutcome {
        let body = match self.config.wire_format.encode(event) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "dropping unencodable session end");
                return DeliveryOutcome::Unencodable;
            }
        };
        let url = self.url();

        if self.transport.supports_beacon() && self.transport.send_beacon(&url, &body) {
            return DeliveryOutcome::Delivered {
                attempts: 1,
                channel: Channel::Beacon,
            };
        }

        match self.transport.post_blocking(&url, &body) {
            Ok(()) => DeliveryOutcome::Delivered {
                attempts: 1,
                channel: Channel::BlockingRequest,
            },
            Err(e) => {
                debug!(error = %e, "session end not delivered");
                DeliveryOutcome::Exhausted { attempts: 1 }
            }
        }
    }
}
