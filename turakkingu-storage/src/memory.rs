//! In-process backends.
//!
//! These follow the browser rules the tracker depends on (domain-scoped
//! cookie acceptance, quota and disabled-storage failures) closely enough
//! to drive the tracker outside a browser and in tests.

use crate::{CookieJar, KeyValueStore, SetCookie, StorageError, StorageResult};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Failure mode for a [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Reads and writes succeed.
    Available,
    /// Writes fail with [`StorageError::QuotaExceeded`], reads succeed.
    Full,
    /// Every operation fails with [`StorageError::Unavailable`].
    Disabled,
}

/// A key-value store backed by a `HashMap`.
///
/// Clones share the same contents.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    items: Arc<Mutex<HashMap<String, String>>>,
    mode: Arc<Mutex<StoreMode>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(HashMap::new())),
            mode: Arc::new(Mutex::new(StoreMode::Available)),
        }
    }

    /// Switches the failure mode.
    pub fn set_mode(&self, mode: StoreMode) {
        *lock(&self.mode) = mode;
    }

    /// Raw contents for inspection.
    pub fn raw(&self, key: &str) -> Option<String> {
        lock(&self.items).get(key).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn mode(&self) -> StoreMode {
        *lock(&self.mode)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        if self.mode() == StoreMode::Disabled {
            return Err(StorageError::Unavailable("storage disabled".into()));
        }
        Ok(lock(&self.items).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        match self.mode() {
            StoreMode::Disabled => Err(StorageError::Unavailable("storage disabled".into())),
            StoreMode::Full => Err(StorageError::QuotaExceeded(key.to_string())),
            StoreMode::Available => {
                lock(&self.items).insert(key.to_string(), value.to_string());
                Ok(())
            }
        }
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        if self.mode() == StoreMode::Disabled {
            return Err(StorageError::Unavailable("storage disabled".into()));
        }
        lock(&self.items).remove(key);
        Ok(())
    }
}

/// A cookie jar for a single page host.
///
/// Accepts a `domain=` attribute only when it is the host itself or a
/// parent of it that is not a listed public suffix, mirroring how
/// browsers reject over-broad cookies. Clones share the same cookies and
/// the same write log.
#[derive(Debug, Clone)]
pub struct MemoryCookieJar {
    host: String,
    public_suffixes: Arc<BTreeSet<String>>,
    cookies: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<Mutex<Vec<SetCookie>>>,
    blocked: Arc<AtomicBool>,
}

impl MemoryCookieJar {
    /// Creates a jar for `host` with a small built-in suffix list.
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_public_suffixes(
            host,
            ["com", "net", "org", "io", "dev", "uk", "co.uk", "jp", "co.jp", "com.au"],
        )
    }

    /// Creates a jar with an explicit public suffix list.
    pub fn with_public_suffixes<I, S>(host: impl Into<String>, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            host: host.into().to_ascii_lowercase(),
            public_suffixes: Arc::new(suffixes.into_iter().map(Into::into).collect()),
            cookies: Arc::new(Mutex::new(HashMap::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
            blocked: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes the jar drop every write, as when cookies are disabled.
    pub fn block(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Every write attempted, accepted or not, in order.
    pub fn writes(&self) -> Vec<SetCookie> {
        lock(&self.writes).clone()
    }

    /// Stores a value directly, bypassing attribute checks.
    pub fn insert_raw(&self, name: &str, value: &str) {
        lock(&self.cookies).insert(name.to_string(), value.to_string());
    }

    fn accepts_domain(&self, domain: Option<&str>) -> bool {
        let Some(domain) = domain else {
            return true;
        };
        let domain = domain.trim_start_matches('.').to_ascii_lowercase();
        if self.public_suffixes.contains(&domain) {
            return false;
        }
        self.host == domain || self.host.ends_with(&format!(".{domain}"))
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        lock(&self.cookies).get(name).cloned().filter(|v| !v.is_empty())
    }

    fn set(&self, cookie: &SetCookie) {
        lock(&self.writes).push(cookie.clone());
        if self.blocked.load(Ordering::SeqCst) || !self.accepts_domain(cookie.domain.as_deref()) {
            return;
        }
        let mut cookies = lock(&self.cookies);
        if cookie.is_removal() {
            cookies.remove(&cookie.name);
        } else {
            cookies.insert(cookie.name.clone(), cookie.value.clone());
        }
    }
}
