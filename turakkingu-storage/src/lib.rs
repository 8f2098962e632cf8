//! Persistence layer for the turakkingu tracker.
//!
//! Provides uniform get/set over the two places a browser lets a script
//! keep state: a cookie and a key-value store (a durable one and a
//! session-scoped one). Every failure degrades instead of surfacing.
//!
//! # Architecture
//!
//! - [`CookieJar`] and [`KeyValueStore`] are the ports a host implements
//! - [`StorageAdapter`] layers fallback and cookie attributes on top
//! - [`detect_cookie_domain`] finds the broadest writable cookie scope
//! - [`memory`] holds in-process backends that follow browser rules

mod adapter;
mod cookie;
mod domain;
mod error;
pub mod memory;

pub use adapter::{CookieScope, StorageAdapter};
pub use cookie::{cookie_value, SameSite, SetCookie};
pub use domain::{detect_cookie_domain, PROBE_COOKIE};
pub use error::{StorageError, StorageResult};

/// A cookie store scoped to the current page.
pub trait CookieJar: Send + Sync {
    /// Returns the value of the named cookie visible to this page.
    fn get(&self, name: &str) -> Option<String>;

    /// Writes a cookie. The browser may silently reject it (for example
    /// when the domain attribute is too broad), which is only observable
    /// by reading it back.
    fn set(&self, cookie: &SetCookie);
}

/// A string key-value store such as `localStorage` or `sessionStorage`.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Writes a value.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes a value. Removing a missing key succeeds.
    fn remove_item(&self, key: &str) -> StorageResult<()>;
}
