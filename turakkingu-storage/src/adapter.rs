//! Uniform read/write over the cookie jar and the two key-value stores.

use crate::{detect_cookie_domain, CookieJar, KeyValueStore, SameSite, SetCookie};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Attributes applied to every cookie this adapter writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieScope {
    /// Broadened `domain=` attribute, `None` for a host-only cookie.
    pub domain: Option<String>,
    /// Whether the page is served over an encrypted transport.
    pub secure: bool,
}

impl CookieScope {
    /// Detects the scope for a page on `hostname`.
    ///
    /// An explicit `domain_override` skips probing. A detection result
    /// that could not be broadened yields a host-only cookie.
    pub fn detect(
        jar: &dyn CookieJar,
        hostname: &str,
        secure: bool,
        domain_override: Option<&str>,
    ) -> Self {
        let domain = match domain_override.filter(|d| !d.is_empty()) {
            Some(domain) => Some(domain.to_string()),
            None => Some(detect_cookie_domain(jar, hostname)).filter(|d| d.starts_with('.')),
        };
        Self { domain, secure }
    }
}

/// Persistence with graceful degradation.
///
/// Reads prefer the durable store and fall back to the session store.
/// Writes go to the durable store and, if it refuses, to the session store.
/// Nothing here returns an error: failures read as absent or are logged.
pub struct StorageAdapter {
    cookies: Arc<dyn CookieJar>,
    durable: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    scope: CookieScope,
}

impl StorageAdapter {
    pub fn new(
        cookies: Arc<dyn CookieJar>,
        durable: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        scope: CookieScope,
    ) -> Self {
        Self {
            cookies,
            durable,
            session,
            scope,
        }
    }

    /// The cookie scope in effect.
    pub fn scope(&self) -> &CookieScope {
        &self.scope
    }

    /// Reads and decodes a JSON value.
    ///
    /// A value that is missing or fails to parse in the durable store is
    /// looked up in the session store before giving up.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.read_valid(key, Ok::<T, std::convert::Infallible>)
    }

    /// Like [`read`](Self::read), but a value `validate` rejects also falls
    /// through to the next store.
    pub fn read_valid<T, U, E>(
        &self,
        key: &str,
        validate: impl Fn(T) -> Result<U, E>,
    ) -> Option<U>
    where
        T: DeserializeOwned,
        E: std::fmt::Display,
    {
        for store in [&self.durable, &self.session] {
            match store.get_item(key) {
                Ok(Some(raw)) => match serde_json::from_str(&raw) {
                    Ok(value) => match validate(value) {
                        Ok(valid) => return Some(valid),
                        Err(e) => debug!(key, error = %e, "discarding invalid stored value"),
                    },
                    Err(e) => debug!(key, error = %e, "discarding unparseable stored value"),
                },
                Ok(None) => {}
                Err(e) => debug!(key, error = %e, "storage read failed"),
            }
        }
        None
    }

    /// Encodes and writes a JSON value. Returns whether any backend
    /// accepted it.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let data = match serde_json::to_string(value) {
            Ok(data) => data,
            Err(e) => {
                warn!(key, error = %e, "failed to encode value for storage");
                return false;
            }
        };

        match self.durable.set_item(key, &data) {
            Ok(()) => true,
            Err(e) => {
                debug!(key, error = %e, "durable storage refused write, using session storage");
                match self.session.set_item(key, &data) {
                    Ok(()) => true,
                    Err(e) => {
                        debug!(key, error = %e, "session storage refused write");
                        false
                    }
                }
            }
        }
    }

    /// Removes a key from both stores.
    pub fn remove(&self, key: &str) {
        for store in [&self.durable, &self.session] {
            if let Err(e) = store.remove_item(key) {
                debug!(key, error = %e, "storage remove failed");
            }
        }
    }

    /// Reads a raw cookie value.
    pub fn read_cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name)
    }

    /// Writes a cookie with the adapter's scope: `path=/`, the detected
    /// domain, `SameSite=Lax` and `Secure` on encrypted pages.
    pub fn write_cookie(&self, name: &str, value: &str, max_age_secs: i64) {
        self.cookies.set(&self.scoped(name, value).max_age(max_age_secs));
    }

    /// Expires a cookie in the adapter's scope.
    pub fn delete_cookie(&self, name: &str) {
        self.cookies.set(&self.scoped(name, "").max_age(0));
    }

    fn scoped(&self, name: &str, value: &str) -> SetCookie {
        SetCookie::new(name, value)
            .path("/")
            .domain(self.scope.domain.as_deref())
            .same_site(SameSite::Lax)
            .secure(self.scope.secure)
    }
}
