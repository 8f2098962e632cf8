//! Scripted page sessions for the turakkingu tracker.
//!
//! A script is a JSON list of page steps. [`replay`] boots a tracker on
//! in-memory browser state for the page, feeds it the steps and reports
//! what happened: the session, the rewritten navigation targets and the
//! delivery outcomes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};
use turakkingu_delivery::EventTransport;
use turakkingu_identity::{DeviceTraits, FingerprintSource, TraitsFingerprint};
use turakkingu_storage::memory::{MemoryCookieJar, MemoryStore};
use turakkingu_tracker::mock::{FakeForm, FakeLink, MemoryPage, CHROME_UA};
use turakkingu_tracker::{Host, PageSignal, Tracker, TrackerConfig};
use turakkingu_types::{Properties, SystemClock};
use url::Url;

/// One scripted page step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Step {
    Visibility {
        hidden: bool,
    },
    /// History navigation to `path` on the same origin.
    Navigate {
        path: String,
    },
    Click {
        href: String,
    },
    Submit {
        #[serde(default)]
        method: String,
        #[serde(default)]
        action: String,
        #[serde(default)]
        fields: BTreeMap<String, String>,
    },
    Track {
        name: String,
        #[serde(default)]
        properties: Properties,
    },
    Unload,
}

/// Parses a replay script.
pub fn parse_script(json: &str) -> Result<Vec<Step>> {
    serde_json::from_str(json).context("invalid replay script")
}

/// The simulated browser.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub page_url: String,
    pub user_agent: String,
    pub referrer: String,
    pub config: TrackerConfig,
}

impl ReplayOptions {
    pub fn new(page_url: impl Into<String>) -> Self {
        Self {
            page_url: page_url.into(),
            user_agent: CHROME_UA.to_string(),
            referrer: String::new(),
            config: TrackerConfig::default(),
        }
    }
}

/// A link or form target as it was before and after the tracker saw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rewrite {
    pub before: String,
    pub after: String,
    /// Hidden fields added to a GET form.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub added_fields: Vec<(String, String)>,
}

/// What a replay did. The counts include the `session_end` sent on unload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayReport {
    pub session_id: Option<String>,
    pub rewrites: Vec<Rewrite>,
    pub delivered: usize,
    pub abandoned: usize,
}

/// Replays `steps` on a fresh page and waits for every delivery.
pub async fn replay(
    options: ReplayOptions,
    steps: Vec<Step>,
    transport: Arc<dyn EventTransport>,
) -> Result<ReplayReport> {
    let url = Url::parse(&options.page_url)
        .with_context(|| format!("invalid page url {}", options.page_url))?;
    let hostname = url
        .host_str()
        .context("page url has no host")?
        .to_string();

    let page = MemoryPage::new(url.as_str())
        .with_user_agent(options.user_agent.clone())
        .with_referrer(options.referrer.clone());
    let fingerprint = TraitsFingerprint::new(DeviceTraits {
        user_agent: options.user_agent.clone(),
        language: "en-US".to_string(),
        ..DeviceTraits::default()
    });
    let host = Host {
        page: Arc::new(page.clone()),
        cookies: Arc::new(MemoryCookieJar::new(hostname)),
        durable: Arc::new(MemoryStore::new()),
        session: Arc::new(MemoryStore::new()),
        transport,
        fingerprint: Some(Arc::new(fingerprint) as Arc<dyn FingerprintSource>),
        clock: Arc::new(SystemClock),
    };

    let tracker = Tracker::start(options.config, host).await;
    let mut report = ReplayReport {
        session_id: tracker.session().await.map(|s| s.id().to_string()),
        ..ReplayReport::default()
    };
    info!(session = ?report.session_id, steps = steps.len(), "replaying");

    for step in steps {
        debug!(?step, "step");
        match step {
            Step::Visibility { hidden } => {
                tracker.handle(PageSignal::VisibilityChanged { hidden }).await;
            }
            Step::Navigate { path } => {
                page.push_path(&path);
                tracker.handle(PageSignal::Navigated { path }).await;
            }
            Step::Click { href } => {
                let link = FakeLink::new(href.clone());
                tracker.handle(PageSignal::LinkClicked(link.boxed())).await;
                report.rewrites.push(Rewrite {
                    before: href,
                    after: link.href_now(),
                    added_fields: Vec::new(),
                });
            }
            Step::Submit {
                method,
                action,
                fields,
            } => {
                let form = fields
                    .iter()
                    .fold(FakeForm::new(method, action.clone()), |form, (k, v)| {
                        form.with_field(k, v)
                    });
                tracker.handle(PageSignal::FormSubmitted(form.boxed())).await;
                let added_fields = form
                    .fields()
                    .into_iter()
                    .filter(|(name, _)| !fields.contains_key(name))
                    .collect();
                report.rewrites.push(Rewrite {
                    before: action,
                    after: form.action_now(),
                    added_fields,
                });
            }
            Step::Track { name, properties } => tracker.track(&name, properties).await,
            Step::Unload => tracker.handle(PageSignal::Unload).await,
        }
    }

    let tally = tracker.settle().await;
    report.delivered = tally.delivered;
    report.abandoned = tally.abandoned();
    Ok(report)
}
