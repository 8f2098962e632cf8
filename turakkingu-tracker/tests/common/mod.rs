//! Shared test helpers for tracker tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use turakkingu_delivery::mock::MockTransport;
use turakkingu_identity::decode_cookie;
use turakkingu_identity::mock::MockFingerprint;
use turakkingu_storage::memory::{MemoryCookieJar, MemoryStore};
use turakkingu_storage::CookieJar;
use turakkingu_tracker::mock::MemoryPage;
use turakkingu_tracker::{Host, Tracker, TrackerConfig};
use turakkingu_types::mock::ManualClock;
use turakkingu_types::Identity;

pub const HOST: &str = "shop.example.com";
pub const PAGE: &str = "https://shop.example.com/";

/// One browser tab: persisted state plus the page currently loaded in it.
pub struct Harness {
    pub page: MemoryPage,
    pub jar: MemoryCookieJar,
    pub durable: MemoryStore,
    pub session: MemoryStore,
    pub transport: MockTransport,
    pub clock: ManualClock,
    pub fingerprint: Option<MockFingerprint>,
}

impl Harness {
    pub fn new() -> Self {
        Self::at(PAGE)
    }

    pub fn at(url: &str) -> Self {
        Self {
            page: MemoryPage::new(url),
            jar: MemoryCookieJar::new(HOST),
            durable: MemoryStore::new(),
            session: MemoryStore::new(),
            transport: MockTransport::new(),
            clock: ManualClock::default(),
            fingerprint: None,
        }
    }

    pub fn with_page(mut self, page: MemoryPage) -> Self {
        self.page = page;
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: MockFingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// The next page load in the same tab, at `url`, with a fresh
    /// transport so only the new load's deliveries are recorded.
    pub fn navigate(&self, url: &str) -> Self {
        Self {
            page: MemoryPage::new(url),
            jar: self.jar.clone(),
            durable: self.durable.clone(),
            session: self.session.clone(),
            transport: MockTransport::new(),
            clock: self.clock.clone(),
            fingerprint: self.fingerprint.clone(),
        }
    }

    pub fn reload(&self) -> Self {
        self.navigate(PAGE)
    }

    pub fn host(&self) -> Host {
        Host {
            page: Arc::new(self.page.clone()),
            cookies: Arc::new(self.jar.clone()),
            durable: Arc::new(self.durable.clone()),
            session: Arc::new(self.session.clone()),
            transport: Arc::new(self.transport.clone()),
            fingerprint: self
                .fingerprint
                .clone()
                .map(|f| Arc::new(f) as Arc<dyn turakkingu_identity::FingerprintSource>),
            clock: Arc::new(self.clock.clone()),
        }
    }

    pub async fn start(&self) -> Tracker {
        self.start_with(TrackerConfig::default()).await
    }

    pub async fn start_with(&self, config: TrackerConfig) -> Tracker {
        Tracker::start(config, self.host()).await
    }

    /// Names of every delivered event body, in attempt order.
    pub fn sent(&self) -> Vec<String> {
        self.transport
            .bodies()
            .iter()
            .filter_map(|b| b["event_name"].as_str().map(str::to_string))
            .collect()
    }

    /// The identity in the cookie, if it decodes.
    pub fn cookie_identity(&self) -> Option<Identity> {
        decode_cookie(&self.jar.get("_zt_id")?).ok()
    }
}

/// Lets spawned background tasks run.
pub async fn let_tasks_run() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
