//! Attribution parameters carried in URLs.

use serde::{Deserialize, Serialize};
use turakkingu_types::{Identity, Timestamp};
use url::Url;

/// Query parameter names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamNames {
    pub session_id: String,
    pub timestamp: String,
    pub campaign_id: String,
}

impl Default for ParamNames {
    fn default() -> Self {
        Self {
            session_id: "ztid".to_string(),
            timestamp: "ztts".to_string(),
            campaign_id: "ztcid".to_string(),
        }
    }
}

/// The parameter values propagated to outbound links and forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingParams {
    pub session_id: String,
    pub timestamp: Option<String>,
    pub campaign_id: Option<String>,
}

impl TrackingParams {
    /// Reads inbound parameters from a page URL.
    ///
    /// Values are kept verbatim. Returns `None` unless a session id with
    /// some non-blank content is present.
    pub fn from_url(url: &Url, names: &ParamNames) -> Option<Self> {
        let mut session_id = None;
        let mut timestamp = None;
        let mut campaign_id = None;
        for (key, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }
            if key == names.session_id.as_str() {
                session_id.get_or_insert_with(|| value.to_string());
            } else if key == names.timestamp.as_str() {
                timestamp.get_or_insert_with(|| value.to_string());
            } else if key == names.campaign_id.as_str() {
                campaign_id.get_or_insert_with(|| value.to_string());
            }
        }
        Some(Self {
            session_id: session_id.filter(|id: &String| !id.trim().is_empty())?,
            timestamp,
            campaign_id,
        })
    }

    /// Derives parameters from an existing session.
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            session_id: identity.id().to_string(),
            timestamp: Some(identity.created_at().as_millis().to_string()),
            campaign_id: identity.campaign().map(str::to_string),
        }
    }

    /// The inbound issue time, if it parses.
    pub fn issued_at(&self) -> Option<Timestamp> {
        self.timestamp
            .as_deref()?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Timestamp::from_secs_or_millis)
    }

    /// Name/value pairs to write, in a stable order. Empty values are left
    /// out.
    pub fn pairs<'a>(&'a self, names: &'a ParamNames) -> Vec<(&'a str, &'a str)> {
        let mut pairs = vec![(names.session_id.as_str(), self.session_id.as_str())];
        if let Some(ts) = self.timestamp.as_deref() {
            pairs.push((names.timestamp.as_str(), ts));
        }
        if let Some(cid) = self.campaign_id.as_deref() {
            pairs.push((names.campaign_id.as_str(), cid));
        }
        pairs.retain(|(_, v)| !v.is_empty());
        pairs
    }
}
