//! Shared test helpers for identity tests.

#![allow(dead_code)]

use std::sync::Arc;
use turakkingu_identity::{IdentityConfig, IdentityManager};
use turakkingu_storage::memory::{MemoryCookieJar, MemoryStore};
use turakkingu_storage::{CookieScope, StorageAdapter};
use turakkingu_types::mock::ManualClock;

pub const HOST: &str = "shop.example.com";

/// A manager wired to in-memory backends, plus handles to inspect them.
pub struct Harness {
    pub jar: MemoryCookieJar,
    pub durable: MemoryStore,
    pub session: MemoryStore,
    pub clock: ManualClock,
    pub manager: IdentityManager,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_backends(MemoryCookieJar::new(HOST), MemoryStore::new(), MemoryStore::new())
    }

    /// A second "page load" sharing this harness's persisted state.
    pub fn reload(&self) -> Self {
        Self::with_clock(
            self.jar.clone(),
            self.durable.clone(),
            self.session.clone(),
            self.clock.clone(),
        )
    }

    pub fn with_backends(jar: MemoryCookieJar, durable: MemoryStore, session: MemoryStore) -> Self {
        Self::with_clock(jar, durable, session, ManualClock::default())
    }

    fn with_clock(
        jar: MemoryCookieJar,
        durable: MemoryStore,
        session: MemoryStore,
        clock: ManualClock,
    ) -> Self {
        let scope = CookieScope::detect(&jar, HOST, true, None);
        let storage = Arc::new(StorageAdapter::new(
            Arc::new(jar.clone()),
            Arc::new(durable.clone()),
            Arc::new(session.clone()),
            scope,
        ));
        let manager = IdentityManager::new(storage, Arc::new(clock.clone()), IdentityConfig::default());
        Self {
            jar,
            durable,
            session,
            clock,
            manager,
        }
    }
}
