//! Transport layer abstraction.
//!
//! A browser offers two ways to ship an event: a fire-and-forget beacon
//! that the user agent keeps alive across page teardown, and an ordinary
//! request (sent with credentials and a keep-alive hint). A host exposes
//! whichever it has through [`EventTransport`].

use crate::error::DeliveryResult;
use async_trait::async_trait;

/// How an event left the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Beacon,
    Request,
    BlockingRequest,
}

/// Outbound delivery primitives.
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Whether a beacon primitive exists at all.
    fn supports_beacon(&self) -> bool {
        false
    }

    /// Queues `body` for fire-and-forget delivery. Returns whether the
    /// user agent accepted it; there is never a response.
    fn send_beacon(&self, _url: &str, _body: &str) -> bool {
        false
    }

    /// POSTs `body` as JSON and succeeds only on a 2xx response.
    async fn post(&self, url: &str, body: String) -> DeliveryResult<()>;

    /// POSTs `body` and blocks until it completes. Only used while the
    /// page is unloading.
    fn post_blocking(&self, url: &str, body: &str) -> DeliveryResult<()>;
}

/// A recording transport for testing.
pub mod mock {
    use super::*;
    use crate::error::DeliveryError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex, MutexGuard};

    /// One delivery attempt seen by a [`MockTransport`].
    #[derive(Debug, Clone)]
    pub struct Attempt {
        pub channel: Channel,
        pub url: String,
        pub body: String,
        pub at: tokio::time::Instant,
    }

    /// Scripted result for the next `post`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PostResult {
        Ok,
        Status(u16),
        NetworkError,
    }

    #[derive(Debug)]
    struct State {
        beacon: Option<bool>,
        posts: VecDeque<PostResult>,
        default_post: PostResult,
        attempts: Vec<Attempt>,
    }

    /// A transport that records every attempt and answers from a script.
    ///
    /// Clones share state.
    #[derive(Debug, Clone)]
    pub struct MockTransport {
        state: Arc<Mutex<State>>,
    }

    impl MockTransport {
        /// No beacon; every post succeeds.
        pub fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(State {
                    beacon: None,
                    posts: VecDeque::new(),
                    default_post: PostResult::Ok,
                    attempts: Vec::new(),
                })),
            }
        }

        /// Offers a beacon that accepts (`true`) or refuses (`false`).
        pub fn with_beacon(self, accepts: bool) -> Self {
            self.lock().beacon = Some(accepts);
            self
        }

        /// Result for posts once the scripted queue is exhausted.
        pub fn with_default_post(self, result: PostResult) -> Self {
            self.lock().default_post = result;
            self
        }

        /// Queues results for the next posts, in order.
        pub fn script_posts(&self, results: impl IntoIterator<Item = PostResult>) {
            self.lock().posts.extend(results);
        }

        pub fn set_beacon(&self, accepts: Option<bool>) {
            self.lock().beacon = accepts;
        }

        pub fn attempts(&self) -> Vec<Attempt> {
            self.lock().attempts.clone()
        }

        /// Bodies of all attempts, parsed as JSON.
        pub fn bodies(&self) -> Vec<serde_json::Value> {
            self.attempts()
                .iter()
                .filter_map(|a| serde_json::from_str(&a.body).ok())
                .collect()
        }

        fn lock(&self) -> MutexGuard<'_, State> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }

        fn record(&self, channel: Channel, url: &str, body: &str) {
            self.lock().attempts.push(Attempt {
                channel,
                url: url.to_string(),
                body: body.to_string(),
                at: tokio::time::Instant::now(),
            });
        }

        fn next_post(&self) -> PostResult {
            let mut state = self.lock();
            let default = state.default_post;
            state.posts.pop_front().unwrap_or(default)
        }
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl EventTransport for MockTransport {
        fn supports_beacon(&self) -> bool {
            self.lock().beacon.is_some()
        }

        fn send_beacon(&self, url: &str, body: &str) -> bool {
            let accepts = self.lock().beacon.unwrap_or(false);
            self.record(Channel::Beacon, url, body);
            accepts
        }

        async fn post(&self, url: &str, body: String) -> DeliveryResult<()> {
            self.record(Channel::Request, url, &body);
            match self.next_post() {
                PostResult::Ok => Ok(()),
                PostResult::Status(code) => Err(DeliveryError::Status(code)),
                PostResult::NetworkError => {
                    Err(DeliveryError::Network("connection refused".into()))
                }
            }
        }

        fn post_blocking(&self, url: &str, body: &str) -> DeliveryResult<()> {
            self.record(Channel::BlockingRequest, url, body);
            match self.next_post() {
                PostResult::Ok => Ok(()),
                PostResult::Status(code) => Err(DeliveryError::Status(code)),
                PostResult::NetworkError => {
                    Err(DeliveryError::Network("connection refused".into()))
                }
            }
        }
    }
}
