//! Host ports: everything the tracker needs from the embedding page.
//!
//! A browser adapter binds these to the DOM and the page's event
//! listeners; [`mock`](crate::mock) provides scripted versions.

use async_trait::async_trait;
use std::sync::Arc;
use turakkingu_delivery::EventTransport;
use turakkingu_identity::FingerprintSource;
use turakkingu_storage::{CookieJar, KeyValueStore};
use turakkingu_types::Clock;

/// `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// Read-only view of the current document.
pub trait Page: Send + Sync {
    /// Current location, updated by history navigation.
    fn url(&self) -> String;
    fn referrer(&self) -> String;
    fn title(&self) -> String;
    fn user_agent(&self) -> String;
    fn ready_state(&self) -> ReadyState;
}

/// An anchor whose target can be rewritten before navigation.
pub trait LinkElement: Send {
    fn href(&self) -> String;
    fn set_href(&mut self, href: &str);
}

/// A form being submitted.
pub trait FormElement: Send {
    /// The method attribute as written; empty means GET.
    fn method(&self) -> String;
    /// The action attribute as written; empty means the page URL.
    fn action(&self) -> String;
    fn set_action(&mut self, action: &str);
    fn has_field(&self, name: &str) -> bool;
    fn add_hidden_field(&mut self, name: &str, value: &str);
}

/// Something that happened on the page.
pub enum PageSignal {
    /// The document left the `loading` state.
    DocumentInteractive,
    VisibilityChanged { hidden: bool },
    /// History push or popstate.
    Navigated { path: String },
    /// An anchor click caught at the document level.
    LinkClicked(Box<dyn LinkElement>),
    /// A form submission caught at the document level.
    FormSubmitted(Box<dyn FormElement>),
    /// The page is being torn down.
    Unload,
}

impl std::fmt::Debug for PageSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DocumentInteractive => f.write_str("DocumentInteractive"),
            Self::VisibilityChanged { hidden } => f
                .debug_struct("VisibilityChanged")
                .field("hidden", hidden)
                .finish(),
            Self::Navigated { path } => f.debug_struct("Navigated").field("path", path).finish(),
            Self::LinkClicked(link) => f.debug_tuple("LinkClicked").field(&link.href()).finish(),
            Self::FormSubmitted(form) => {
                f.debug_tuple("FormSubmitted").field(&form.action()).finish()
            }
            Self::Unload => f.write_str("Unload"),
        }
    }
}

/// A stream of page signals.
#[async_trait]
pub trait SignalSource: Send {
    /// The next signal, or `None` once the page is gone.
    async fn next_signal(&mut self) -> Option<PageSignal>;
}

/// The capabilities a tracker is built from.
#[derive(Clone)]
pub struct Host {
    pub page: Arc<dyn Page>,
    pub cookies: Arc<dyn CookieJar>,
    /// Durable key-value store (`localStorage`).
    pub durable: Arc<dyn KeyValueStore>,
    /// Session-scoped key-value store (`sessionStorage`).
    pub session: Arc<dyn KeyValueStore>,
    pub transport: Arc<dyn EventTransport>,
    /// External fingerprinting capability, if the host has one.
    pub fingerprint: Option<Arc<dyn FingerprintSource>>,
    pub clock: Arc<dyn Clock>,
}

/// Whether a user agent is subject to intelligent tracking prevention
/// (Safari and other WebKit browsers that do not claim to be Chrome).
pub fn is_itp_browser(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    ua.contains("safari") && !ua.contains("chrome")
}
