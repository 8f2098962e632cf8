//! Event delivery for the turakkingu tracker.
//!
//! Events are serialized in one of two collector dialects (see
//! [`WireFormat`]) and shipped through an [`EventTransport`]. The
//! [`EventSender`] picks a channel per event and retries failed sends with
//! exponential backoff; nothing here ever surfaces an error to the page.
//!
//! # Retry Schedule
//!
//! With the default settings an event is attempted three times. The
//! delay before retry `n` is `min(base_delay * 2^n, max_delay)`, so the
//! second attempt follows the first after 2s and the third after 4s more.

mod error;
mod http;
mod payload;
mod sender;
mod transport;

pub use error::{DeliveryError, DeliveryResult};
pub use http::HttpTransport;
pub use payload::{CompactPayload, RichPayload, WireFormat};
pub use sender::{DeliveryConfig, DeliveryOutcome, EventSender};
pub use transport::{mock, Channel, EventTransport};
