//! Tracker orchestrator.
//!
//! The [`Tracker`] is the context object the page constructs once and
//! hands to any code that needs to track. It resolves the identity,
//! starts the background work (fingerprint, refresh cycle), reacts to page
//! signals and routes every event through dedup to the sender.
//!
//! None of its operations return errors; failures are absorbed and logged.

use crate::config::TrackerConfig;
use crate::dedup::{DedupConfig, DedupStore};
use crate::host::{is_itp_browser, Host, Page, PageSignal, ReadyState, SignalSource};
use crate::params::TrackingParams;
use crate::propagation::{DomainPolicy, Propagator};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};
use turakkingu_delivery::{DeliveryOutcome, EventSender};
use turakkingu_identity::{FingerprintProvider, IdentityManager};
use turakkingu_storage::{CookieScope, StorageAdapter};
use turakkingu_types::{
    names, Clock, Event, Identity, Properties, SessionId, Timestamp, ORGANIC_CAMPAIGN,
};
use url::Url;

/// Orchestrator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Uninitialized,
    ResolvingIdentity,
    Ready,
}

/// An event issued before the tracker was ready.
#[derive(Debug)]
struct Pending {
    name: String,
    properties: Properties,
    occurred_at: Timestamp,
    source_url: String,
    source_title: String,
}

/// Mutable per-page state, guarded by one lock.
struct Core {
    state: TrackerState,
    /// `init` was called while the document was still loading.
    deferred: bool,
    opted_out: bool,
    session: Option<Identity>,
    queue: VecDeque<Pending>,
    dedup: DedupStore,
    propagator: Option<Propagator>,
    refresh: Option<JoinHandle<()>>,
}

/// Delivery outcomes counted since the last [`Tracker::settle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryTally {
    pub delivered: usize,
    pub exhausted: usize,
    pub unencodable: usize,
}

impl DeliveryTally {
    pub fn record(&mut self, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered { .. } => self.delivered += 1,
            DeliveryOutcome::Exhausted { .. } => self.exhausted += 1,
            DeliveryOutcome::Unencodable => self.unencodable += 1,
        }
    }

    /// Events given up on.
    pub fn abandoned(&self) -> usize {
        self.exhausted + self.unencodable
    }

    pub fn total(&self) -> usize {
        self.delivered + self.abandoned()
    }
}

/// Spawned deliveries. Finished tasks are reaped into `tally` whenever a
/// new one starts.
#[derive(Default)]
struct Deliveries {
    tasks: JoinSet<DeliveryOutcome>,
    tally: DeliveryTally,
}

impl Deliveries {
    fn collect(&mut self, result: Result<DeliveryOutcome, tokio::task::JoinError>) {
        match result {
            Ok(outcome) => self.tally.record(&outcome),
            Err(e) => warn!(error = %e, "delivery task failed"),
        }
    }
}

struct Inner {
    config: TrackerConfig,
    page: Arc<dyn Page>,
    clock: Arc<dyn Clock>,
    identity: IdentityManager,
    fingerprint: Option<FingerprintProvider>,
    sender: Arc<EventSender>,
    core: Mutex<Core>,
    deliveries: Mutex<Deliveries>,
}

/// Handle to the page's tracker. Clones share the same tracker.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<Inner>,
}

impl Tracker {
    /// Wires a tracker to the host. Nothing runs until [`init`](Self::init).
    ///
    /// Detecting the cookie scope writes probe cookies.
    pub fn new(config: TrackerConfig, host: Host) -> Self {
        let page_url = Url::parse(&host.page.url()).ok();
        let hostname = page_url
            .as_ref()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        let secure = page_url.as_ref().is_some_and(|u| u.scheme() == "https");
        let scope = CookieScope::detect(
            host.cookies.as_ref(),
            &hostname,
            secure,
            config.cookie_domain.as_deref(),
        );
        debug!(host = %hostname, domain = ?scope.domain, "cookie scope");

        let storage = Arc::new(StorageAdapter::new(
            host.cookies,
            host.durable,
            host.session,
            scope,
        ));
        let identity = IdentityManager::new(
            storage.clone(),
            host.clock.clone(),
            config.identity_config(),
        );
        let dedup = DedupStore::load(
            storage,
            host.clock.clone(),
            DedupConfig {
                enabled: config.enable_deduplication,
                window: config.dedup_window(),
                storage_key: config.dedup_storage_key.clone(),
                significant_fields: config.significant_fields.clone(),
            },
        );
        let fingerprint = host
            .fingerprint
            .filter(|_| config.enable_fingerprint)
            .map(|source| FingerprintProvider::new(source, config.fingerprint_timeout()));
        let sender = Arc::new(EventSender::new(host.transport, config.delivery_config()));

        Self {
            inner: Arc::new(Inner {
                config,
                page: host.page,
                clock: host.clock,
                identity,
                fingerprint,
                sender,
                core: Mutex::new(Core {
                    state: TrackerState::Uninitialized,
                    deferred: false,
                    opted_out: false,
                    session: None,
                    queue: VecDeque::new(),
                    dedup,
                    propagator: None,
                    refresh: None,
                }),
                deliveries: Mutex::new(Deliveries::default()),
            }),
        }
    }

    /// Builds a tracker and initializes it.
    pub async fn start(config: TrackerConfig, host: Host) -> Self {
        let tracker = Self::new(config, host);
        tracker.init().await;
        tracker
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    pub async fn state(&self) -> TrackerState {
        self.inner.core.lock().await.state
    }

    /// Snapshot of the current session, if one is established.
    pub async fn session(&self) -> Option<Identity> {
        self.inner.core.lock().await.session.clone()
    }

    /// Resolves the identity and becomes ready. Idempotent.
    ///
    /// While the document is still loading this only records the request;
    /// the tracker then starts on [`PageSignal::DocumentInteractive`].
    pub async fn init(&self) {
        let mut core = self.inner.core.lock().await;
        if core.state != TrackerState::Uninitialized || core.opted_out {
            return;
        }
        if self.inner.page.ready_state() == ReadyState::Loading {
            debug!("document loading, deferring init");
            core.deferred = true;
            return;
        }
        self.boot(&mut core).await;
    }

    async fn boot(&self, core: &mut Core) {
        core.state = TrackerState::ResolvingIdentity;
        core.deferred = false;

        let config = &self.inner.config;
        let page_url = Url::parse(&self.inner.page.url()).ok();
        let inbound = page_url
            .as_ref()
            .and_then(|u| TrackingParams::from_url(u, &config.params));

        let identity = self.resolve_identity(inbound.as_ref());
        let newly_created = identity.is_newly_created();
        core.session = Some(identity.clone());
        let itp = config.enable_itp_handling && is_itp_browser(&self.inner.page.user_agent());

        if let Some(url) = page_url {
            let params = inbound.unwrap_or_else(|| TrackingParams::from_identity(&identity));
            if config.enable_cross_domain_propagation || itp {
                core.propagator = Some(Propagator::new(
                    url,
                    config.params.clone(),
                    params,
                    DomainPolicy::new(&config.propagate_to_domains),
                    config.enable_cross_domain_propagation,
                    itp,
                ));
            }
        }

        self.spawn_fingerprint();
        if itp {
            core.refresh = self.spawn_refresh();
        }

        core.state = TrackerState::Ready;
        info!(id = %identity.id(), newly_created, "tracker ready");

        if newly_created {
            let mut props = Properties::new();
            props.insert("referrer".into(), json!(self.inner.page.referrer()));
            props.insert("url".into(), json!(self.inner.page.url()));
            let event = Event::new(
                names::SESSION_START,
                props,
                self.inner.clock.now(),
                identity.clone(),
                self.inner.page.url(),
            )
            .with_title(self.inner.page.title());
            // Once per new identity by construction, so never deduplicated.
            self.deliver(event).await;
        }

        while let Some(pending) = core.queue.pop_front() {
            let event = Event::new(
                pending.name,
                pending.properties,
                pending.occurred_at,
                identity.clone(),
                pending.source_url,
            )
            .with_title(pending.source_title);
            self.dispatch(core, event).await;
        }
    }

    /// Inbound parameters win; otherwise the persisted identity resumes;
    /// otherwise a fresh organic identity is created.
    fn resolve_identity(&self, inbound: Option<&TrackingParams>) -> Identity {
        let manager = &self.inner.identity;
        let now = self.inner.clock.now();
        let existing = manager.resolve();

        let inbound_id =
            inbound.and_then(|p| SessionId::parse(&p.session_id).ok().map(|id| (p, id)));
        if let Some((params, id)) = inbound_id {
            if let Some(current) = existing.as_ref().filter(|i| i.id() == &id) {
                debug!(id = %id, "inbound id matches current identity");
                return manager.touch(current.clone().resumed());
            }
            return manager.establish(
                id,
                params.campaign_id.clone(),
                params.issued_at().unwrap_or(now),
            );
        }

        match existing {
            Some(identity) => {
                info!(id = %identity.id(), "resumed identity");
                manager.touch(identity.resumed())
            }
            None => manager.establish(
                SessionId::generate(),
                Some(ORGANIC_CAMPAIGN.to_string()),
                now,
            ),
        }
    }

    /// Attaches the fingerprint whenever it resolves.
    fn spawn_fingerprint(&self) {
        if self.inner.fingerprint.is_none() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let Some(inner) = weak.upgrade() else { return };
            let Some(provider) = inner.fingerprint.as_ref() else {
                return;
            };
            let fp = provider.generate().await;
            if fp.is_empty() {
                return;
            }
            let mut core = inner.core.lock().await;
            if let Some(session) = core.session.take() {
                let session = session.with_fingerprint(fp);
                inner.identity.persist(&session);
                debug!(id = %session.id(), "attached device fingerprint");
                core.session = Some(session);
            }
        });
    }

    /// Re-persists the identity on a fixed interval.
    fn spawn_refresh(&self) -> Option<JoinHandle<()>> {
        let Some(period) = self.inner.config.refresh_interval() else {
            warn!("refresh interval is zero, identity refresh disabled");
            return None;
        };
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                let mut core = inner.core.lock().await;
                if core.opted_out {
                    break;
                }
                if let Some(refreshed) = inner.identity.refresh() {
                    // The persisted copy may predate the fingerprint.
                    let refreshed = match core
                        .session
                        .as_ref()
                        .and_then(|s| s.device_fingerprint())
                    {
                        Some(fp) if refreshed.device_fingerprint().is_none() => {
                            let with_fp = refreshed.with_fingerprint(fp);
                            inner.identity.persist(&with_fp);
                            with_fp
                        }
                        _ => refreshed,
                    };
                    core.session = Some(refreshed);
                }
            }
        }))
    }

    /// Tracks an event. Never waits on the network.
    ///
    /// Before the tracker is ready the event is queued and sent, in order,
    /// once it is.
    pub async fn track(&self, name: &str, properties: Properties) {
        let mut core = self.inner.core.lock().await;
        if core.opted_out {
            debug!(event = name, "opted out, ignoring event");
            return;
        }
        let now = self.inner.clock.now();
        let source_url = self.inner.page.url();
        let source_title = self.inner.page.title();
        match (core.state, core.session.clone()) {
            (TrackerState::Ready, Some(identity)) => {
                let event = Event::new(name, properties, now, identity, source_url)
                    .with_title(source_title);
                self.dispatch(&mut core, event).await;
            }
            _ => core.queue.push_back(Pending {
                name: name.to_string(),
                properties,
                occurred_at: now,
                source_url,
                source_title,
            }),
        }
    }

    /// Sends an event unless it is a recent duplicate.
    async fn dispatch(&self, core: &mut Core, event: Event) {
        if !core.dedup.should_send(&event) {
            return;
        }
        core.dedup.mark_sent(&event);
        self.deliver(event).await;
    }

    async fn deliver(&self, event: Event) {
        let sender = self.inner.sender.clone();
        let mut deliveries = self.inner.deliveries.lock().await;
        while let Some(result) = deliveries.tasks.try_join_next() {
            deliveries.collect(result);
        }
        deliveries
            .tasks
            .spawn(async move { sender.send(&event).await });
    }

    /// Deliveries spawned and not yet reaped.
    pub async fn in_flight(&self) -> usize {
        self.inner.deliveries.lock().await.tasks.len()
    }

    /// Waits for every delivery started so far and returns the outcomes
    /// counted since the previous call.
    pub async fn settle(&self) -> DeliveryTally {
        let mut pending = {
            let mut deliveries = self.inner.deliveries.lock().await;
            Deliveries {
                tasks: std::mem::take(&mut deliveries.tasks),
                tally: std::mem::take(&mut deliveries.tally),
            }
        };
        while let Some(result) = pending.tasks.join_next().await {
            pending.collect(result);
        }
        pending.tally
    }

    /// Opts the visitor out.
    ///
    /// Deletes both persisted identity copies and stops everything for the
    /// rest of this page load.
    pub async fn clear(&self) {
        let mut core = self.inner.core.lock().await;
        self.inner.identity.clear();
        core.opted_out = true;
        core.session = None;
        core.propagator = None;
        core.queue.clear();
        if let Some(refresh) = core.refresh.take() {
            refresh.abort();
        }
        info!("visitor opted out");
    }

    /// Reacts to one page signal.
    pub async fn handle(&self, signal: PageSignal) {
        let auto = self.inner.config.enable_auto_tracking;
        match signal {
            PageSignal::DocumentInteractive => {
                let mut core = self.inner.core.lock().await;
                if core.deferred && core.state == TrackerState::Uninitialized && !core.opted_out {
                    self.boot(&mut core).await;
                }
            }
            PageSignal::VisibilityChanged { hidden } if auto => {
                let name = if hidden {
                    names::PAGE_HIDDEN
                } else {
                    names::PAGE_VISIBLE
                };
                self.track(name, Properties::new()).await;
            }
            PageSignal::Navigated { path } if auto => {
                let mut props = Properties::new();
                props.insert("path".into(), json!(path));
                self.track(names::NAVIGATION, props).await;
            }
            PageSignal::LinkClicked(mut link) => {
                let core = self.inner.core.lock().await;
                if let Some(propagator) = core.propagator.as_ref() {
                    propagator.decorate_link(link.as_mut());
                }
            }
            PageSignal::FormSubmitted(mut form) => {
                let core = self.inner.core.lock().await;
                if let Some(propagator) = core.propagator.as_ref() {
                    propagator.decorate_form(form.as_mut());
                }
            }
            PageSignal::Unload if auto => {
                self.end_session().await;
            }
            other => debug!(signal = ?other, "auto tracking disabled, ignoring signal"),
        }
    }

    /// Feeds every signal from `source` into [`handle`](Self::handle) until
    /// the source ends.
    pub async fn run<S: SignalSource>(&self, mut source: S) {
        while let Some(signal) = source.next_signal().await {
            self.handle(signal).await;
        }
    }

    /// Sends `session_end` on the synchronous teardown path.
    async fn end_session(&self) -> Option<DeliveryOutcome> {
        let core = self.inner.core.lock().await;
        if core.opted_out || core.state != TrackerState::Ready {
            return None;
        }
        let identity = core.session.clone()?;
        drop(core);

        let now = self.inner.clock.now();
        let duration = now.saturating_since(identity.created_at()).as_millis() as u64;
        let url = self.inner.page.url();
        let mut props = Properties::new();
        props.insert("duration".into(), json!(duration));
        props.insert("url".into(), json!(url));

        let event = Event::new(names::SESSION_END, props, now, identity, url)
            .with_title(self.inner.page.title());
        let outcome = self.inner.sender.send_session_end(&event);
        debug!(?outcome, "session end");
        self.inner.deliveries.lock().await.tally.record(&outcome);
        Some(outcome)
    }
}
