//! The durable visitor identity.
//!
//! The same JSON shape is written to the cookie and to the key-value
//! store. Decoding always goes through [`IdentityRecord`] so that a record
//! without a usable id is rejected as a whole instead of half-trusted.

use crate::{Error, SessionId, Timestamp};
use serde::{Deserialize, Serialize};

/// Campaign recorded for identities created without an inbound link.
pub const ORGANIC_CAMPAIGN: &str = "organic";

/// Raw persisted shape. All fields are optional so that partially written
/// or foreign records deserialize and can be validated explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seen: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refreshed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fp: Option<String>,
}

/// The pseudo-identifier for one browser, as active for this page load.
///
/// `id` and `created_at` never change after construction. `is_newly_created`
/// is computed per load and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IdentityRecord", into = "IdentityRecord")]
pub struct Identity {
    id: SessionId,
    campaign: Option<String>,
    created_at: Timestamp,
    last_seen_at: Timestamp,
    refreshed_at: Option<Timestamp>,
    device_fingerprint: Option<String>,
    newly_created: bool,
}

impl Identity {
    /// Creates a brand-new identity established at `created_at`.
    #[must_use]
    pub fn new(id: SessionId, campaign: Option<String>, created_at: Timestamp) -> Self {
        Self {
            id,
            campaign,
            created_at,
            last_seen_at: created_at,
            refreshed_at: None,
            device_fingerprint: None,
            newly_created: true,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn campaign(&self) -> Option<&str> {
        self.campaign.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    #[must_use]
    pub fn last_seen_at(&self) -> Timestamp {
        self.last_seen_at
    }

    #[must_use]
    pub fn refreshed_at(&self) -> Option<Timestamp> {
        self.refreshed_at
    }

    #[must_use]
    pub fn device_fingerprint(&self) -> Option<&str> {
        self.device_fingerprint.as_deref()
    }

    /// True only on the page load that established this identity.
    #[must_use]
    pub fn is_newly_created(&self) -> bool {
        self.newly_created
    }

    /// Returns a copy stamped as seen at `now`.
    #[must_use]
    pub fn seen(mut self, now: Timestamp) -> Self {
        self.last_seen_at = now;
        self
    }

    /// Returns a copy stamped as refreshed at `now`.
    #[must_use]
    pub fn refreshed(mut self, now: Timestamp) -> Self {
        self.refreshed_at = Some(now);
        self
    }

    /// Returns a copy carrying the given device fingerprint.
    /// An empty fingerprint leaves the identity unchanged.
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        let fingerprint = fingerprint.into();
        if !fingerprint.is_empty() {
            self.device_fingerprint = Some(fingerprint);
        }
        self
    }

    /// Returns a copy marked as resumed from persistence.
    #[must_use]
    pub fn resumed(mut self) -> Self {
        self.newly_created = false;
        self
    }
}

impl TryFrom<IdentityRecord> for Identity {
    type Error = Error;

    fn try_from(record: IdentityRecord) -> Result<Self, Self::Error> {
        let raw = record
            .sid
            .ok_or_else(|| Error::InvalidIdentity("missing sid".into()))?;
        let id = SessionId::parse(&raw)?;
        let created_at = Timestamp::from_millis(record.created.unwrap_or(0));
        Ok(Self {
            id,
            campaign: record.cid.filter(|c| !c.is_empty()),
            created_at,
            last_seen_at: record.seen.map(Timestamp::from_millis).unwrap_or(created_at),
            refreshed_at: record.refreshed.map(Timestamp::from_millis),
            device_fingerprint: record.fp.filter(|f| !f.is_empty()),
            newly_created: false,
        })
    }
}

impl From<Identity> for IdentityRecord {
    fn from(identity: Identity) -> Self {
        Self {
            sid: Some(identity.id.into()),
            cid: identity.campaign,
            created: Some(identity.created_at.as_millis()),
            seen: Some(identity.last_seen_at.as_millis()),
            refreshed: identity.refreshed_at.map(|t| t.as_millis()),
            fp: identity.device_fingerprint,
        }
    }
}
