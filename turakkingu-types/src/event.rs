//! Trackable events.
//!
//! An event is immutable once built. It carries its own copy of the
//! identity that was active when it was emitted, so later changes to the
//! session never alter an event that is already queued or in flight.

use crate::{Identity, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Event properties. Keys are kept sorted so every derived view of the bag
/// is independent of insertion order.
pub type Properties = BTreeMap<String, serde_json::Value>;

/// Well-known event names emitted by the tracker itself.
pub mod names {
    pub const SESSION_START: &str = "session_start";
    pub const SESSION_END: &str = "session_end";
    pub const PAGE_VIEW: &str = "page_view";
    pub const PAGE_HIDDEN: &str = "page_hidden";
    pub const PAGE_VISIBLE: &str = "page_visible";
    pub const NAVIGATION: &str = "navigation";
    pub const CLICK: &str = "click";
    pub const SCROLL_DEPTH: &str = "scroll_depth";
    pub const ENGAGEMENT_TIME: &str = "engagement_time";
    pub const CONVERSION: &str = "conversion";
    pub const PURCHASE: &str = "purchase";
    pub const FORM_SUBMIT: &str = "form_submit";
}

/// A single trackable occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    name: String,
    properties: Properties,
    occurred_at: Timestamp,
    identity: Identity,
    source_url: String,
    #[serde(default)]
    source_title: String,
}

impl Event {
    /// Creates a new event.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        properties: Properties,
        occurred_at: Timestamp,
        identity: Identity,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            properties,
            occurred_at,
            identity,
            source_url: source_url.into(),
            source_title: String::new(),
        }
    }

    /// Sets the title of the page the event was issued on.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.source_title = title.into();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    #[must_use]
    pub fn occurred_at(&self) -> Timestamp {
        self.occurred_at
    }

    /// The identity snapshot taken at emission time.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Page title at issue time, empty when the host has none.
    #[must_use]
    pub fn source_title(&self) -> &str {
        &self.source_title
    }
}
