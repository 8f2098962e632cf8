//! Client-side visitor identity and event attribution.
//!
//! A [`Tracker`] is built once per page from a [`Host`] and a
//! [`TrackerConfig`]. It establishes a durable pseudo-identity, carries it
//! to other domains through outbound links and forms, suppresses repeated
//! events and delivers the rest to the collector.
//!
//! # Architecture
//!
//! - [`host`] defines what the tracker needs from the page
//! - [`DedupStore`] decides whether an event is a repeat
//! - [`Propagator`] rewrites navigation targets
//! - [`Tracker`] ties identity, dedup, propagation and delivery together
//!
//! # Example
//!
//! ```ignore
//! let tracker = Tracker::start(TrackerConfig::default(), host).await;
//! tracker.track("conversion", props).await;
//! tokio::spawn({
//!     let tracker = tracker.clone();
//!     async move { tracker.run(signals).await }
//! });
//! ```

mod config;
mod dedup;
pub mod host;
mod params;
mod propagation;
mod tracker;

pub mod mock;

pub use config::{DeliverySettings, TrackerConfig};
pub use dedup::{dedup_key, DedupConfig, DedupStore, DedupTable};
pub use host::{
    is_itp_browser, FormElement, Host, LinkElement, Page, PageSignal, ReadyState, SignalSource,
};
pub use params::{ParamNames, TrackingParams};
pub use propagation::{DomainPolicy, Propagator};
pub use tracker::{DeliveryTally, Tracker, TrackerState};
