//! Scripted host doubles.

use crate::host::{FormElement, LinkElement, Page, PageSignal, ReadyState, SignalSource};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug)]
struct PageState {
    url: String,
    referrer: String,
    title: String,
    user_agent: String,
    ready_state: ReadyState,
}

/// An in-memory document. Clones share state.
#[derive(Debug, Clone)]
pub struct MemoryPage {
    state: Arc<Mutex<PageState>>,
}

/// A desktop Chrome user agent.
pub const CHROME_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// A desktop Safari user agent.
pub const SAFARI_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/17.5 Safari/605.1.15";

impl MemoryPage {
    /// A fully loaded page at `url` in a Chrome browser.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(PageState {
                url: url.into(),
                referrer: String::new(),
                title: String::new(),
                user_agent: CHROME_UA.to_string(),
                ready_state: ReadyState::Complete,
            })),
        }
    }

    pub fn with_user_agent(self, ua: impl Into<String>) -> Self {
        lock(&self.state).user_agent = ua.into();
        self
    }

    pub fn with_referrer(self, referrer: impl Into<String>) -> Self {
        lock(&self.state).referrer = referrer.into();
        self
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        lock(&self.state).title = title.into();
        self
    }

    pub fn set_ready_state(&self, ready_state: ReadyState) {
        lock(&self.state).ready_state = ready_state;
    }

    /// Moves to `path` on the same origin, as `history.pushState` does.
    pub fn push_path(&self, path: &str) {
        let mut state = lock(&self.state);
        if let Ok(next) = Url::parse(&state.url).and_then(|u| u.join(path)) {
            state.url = next.into();
        }
    }
}

impl Page for MemoryPage {
    fn url(&self) -> String {
        lock(&self.state).url.clone()
    }

    fn referrer(&self) -> String {
        lock(&self.state).referrer.clone()
    }

    fn title(&self) -> String {
        lock(&self.state).title.clone()
    }

    fn user_agent(&self) -> String {
        lock(&self.state).user_agent.clone()
    }

    fn ready_state(&self) -> ReadyState {
        lock(&self.state).ready_state
    }
}

/// An anchor. Clones share the href, so a clone kept by the test sees the
/// rewrite made through the boxed copy.
#[derive(Debug, Clone)]
pub struct FakeLink {
    href: Arc<Mutex<String>>,
}

impl FakeLink {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: Arc::new(Mutex::new(href.into())),
        }
    }

    /// The current href, as seen through any clone.
    pub fn href_now(&self) -> String {
        lock(&self.href).clone()
    }

    pub fn boxed(&self) -> Box<dyn LinkElement> {
        Box::new(self.clone())
    }
}

impl LinkElement for FakeLink {
    fn href(&self) -> String {
        lock(&self.href).clone()
    }

    fn set_href(&mut self, href: &str) {
        *lock(&self.href) = href.to_string();
    }
}

#[derive(Debug)]
struct FormState {
    method: String,
    action: String,
    fields: Vec<(String, String)>,
}

/// A form with named fields. Clones share state.
#[derive(Debug, Clone)]
pub struct FakeForm {
    state: Arc<Mutex<FormState>>,
}

impl FakeForm {
    pub fn new(method: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FormState {
                method: method.into(),
                action: action.into(),
                fields: Vec::new(),
            })),
        }
    }

    pub fn with_field(self, name: &str, value: &str) -> Self {
        lock(&self.state)
            .fields
            .push((name.to_string(), value.to_string()));
        self
    }

    pub fn fields(&self) -> Vec<(String, String)> {
        lock(&self.state).fields.clone()
    }

    /// Value of the first field called `name`.
    pub fn field(&self, name: &str) -> Option<String> {
        lock(&self.state)
            .fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    pub fn action_now(&self) -> String {
        lock(&self.state).action.clone()
    }

    pub fn boxed(&self) -> Box<dyn FormElement> {
        Box::new(self.clone())
    }
}

impl FormElement for FakeForm {
    fn method(&self) -> String {
        lock(&self.state).method.clone()
    }

    fn action(&self) -> String {
        lock(&self.state).action.clone()
    }

    fn set_action(&mut self, action: &str) {
        lock(&self.state).action = action.to_string();
    }

    fn has_field(&self, name: &str) -> bool {
        lock(&self.state).fields.iter().any(|(n, _)| n == name)
    }

    fn add_hidden_field(&mut self, name: &str, value: &str) {
        lock(&self.state)
            .fields
            .push((name.to_string(), value.to_string()));
    }
}

/// Replays a fixed list of signals, then ends.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    signals: VecDeque<PageSignal>,
}

impl ScriptedSource {
    pub fn new(signals: impl IntoIterator<Item = PageSignal>) -> Self {
        Self {
            signals: signals.into_iter().collect(),
        }
    }
}

#[async_trait]
impl SignalSource for ScriptedSource {
    async fn next_signal(&mut self) -> Option<PageSignal> {
        self.signals.pop_front()
    }
}
