//! HTTP transport built on `reqwest`.
//!
//! Native hosts have no beacon primitive, so every event goes out as a
//! regular POST. The blocking variant runs on its own thread so it can be
//! called from inside the async runtime during teardown.

use crate::error::{DeliveryError, DeliveryResult};
use crate::transport::EventTransport;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Sends events with a shared `reqwest` client.
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> DeliveryResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl EventTransport for HttpTransport {
    async fn post(&self, url: &str, body: String) -> DeliveryResult<()> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        let status = response.status();
        debug!(%status, url, "collector responded");
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status(status.as_u16()))
        }
    }

    fn post_blocking(&self, url: &str, body: &str) -> DeliveryResult<()> {
        let url = url.to_string();
        let body = body.to_string();
        let timeout = self.timeout;
        let handle = std::thread::spawn(move || -> DeliveryResult<()> {
            let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
            let response = client
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .map_err(|e| DeliveryError::Network(e.to_string()))?;
            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(DeliveryError::Status(status.as_u16()))
            }
        });
        handle
            .join()
            .map_err(|_| DeliveryError::Network("blocking sender panicked".into()))?
    }
}
