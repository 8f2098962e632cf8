use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use turakkingu_storage::memory::{MemoryCookieJar, MemoryStore, StoreMode};
use turakkingu_storage::{CookieJar, CookieScope, KeyValueStore, SameSite, StorageAdapter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Record {
    sid: String,
}

struct Fixture {
    jar: MemoryCookieJar,
    durable: MemoryStore,
    session: MemoryStore,
    adapter: StorageAdapter,
}

fn fixture(host: &str, secure: bool) -> Fixture {
    let jar = MemoryCookieJar::new(host);
    let durable = MemoryStore::new();
    let session = MemoryStore::new();
    let scope = CookieScope::detect(&jar, host, secure, None);
    let adapter = StorageAdapter::new(
        Arc::new(jar.clone()),
        Arc::new(durable.clone()),
        Arc::new(session.clone()),
        scope,
    );
    Fixture {
        jar,
        durable,
        session,
        adapter,
    }
}

fn record(sid: &str) -> Record {
    Record { sid: sid.into() }
}

// ── Scope ────────────────────────────────────────────────────────

#[test]
fn scope_uses_detected_domain() {
    let f = fixture("www.example.com", true);
    assert_eq!(f.adapter.scope().domain.as_deref(), Some(".example.com"));
    assert!(f.adapter.scope().secure);
}

#[test]
fn scope_is_host_only_for_localhost() {
    let f = fixture("localhost", false);
    assert!(f.adapter.scope().domain.is_none());
}

#[test]
fn scope_override_skips_probing() {
    let jar = MemoryCookieJar::new("www.example.com");
    let scope = CookieScope::detect(&jar, "www.example.com", false, Some(".www.example.com"));
    assert_eq!(scope.domain.as_deref(), Some(".www.example.com"));
    assert!(jar.writes().is_empty());
}

// ── JSON values ──────────────────────────────────────────────────

#[test]
fn write_then_read_from_durable_store() {
    let f = fixture("www.example.com", false);
    assert!(f.adapter.write("k", &record("a")));
    assert_eq!(f.adapter.read::<Record>("k"), Some(record("a")));
    assert!(f.durable.raw("k").is_some());
    assert!(f.session.raw("k").is_none());
}

#[test]
fn full_durable_store_falls_back_to_session() {
    let f = fixture("www.example.com", false);
    f.durable.set_mode(StoreMode::Full);
    assert!(f.adapter.write("k", &record("a")));
    assert!(f.session.raw("k").is_some());
    assert_eq!(f.adapter.read::<Record>("k"), Some(record("a")));
}

#[test]
fn disabled_durable_store_falls_back_to_session() {
    let f = fixture("www.example.com", false);
    f.durable.set_mode(StoreMode::Disabled);
    assert!(f.adapter.write("k", &record("b")));
    assert_eq!(f.adapter.read::<Record>("k"), Some(record("b")));
}

#[test]
fn both_stores_failing_reports_false() {
    let f = fixture("www.example.com", false);
    f.durable.set_mode(StoreMode::Disabled);
    f.session.set_mode(StoreMode::Disabled);
    assert!(!f.adapter.write("k", &record("c")));
    assert_eq!(f.adapter.read::<Record>("k"), None);
}

#[test]
fn unparseable_durable_value_falls_through_to_session() {
    let f = fixture("www.example.com", false);
    f.durable.set_item("k", "{not json").unwrap();
    f.session.set_item("k", r#"{"sid":"s"}"#).unwrap();
    assert_eq!(f.adapter.read::<Record>("k"), Some(record("s")));
}

#[test]
fn rejected_durable_value_falls_through_to_session() {
    let f = fixture("www.example.com", false);
    f.durable.set_item("k", r#"{"sid":""}"#).unwrap();
    f.session.set_item("k", r#"{"sid":"s"}"#).unwrap();
    let valid = f.adapter.read_valid("k", |r: Record| {
        if r.sid.is_empty() {
            Err("empty sid")
        } else {
            Ok(r)
        }
    });
    assert_eq!(valid, Some(record("s")));
}

#[test]
fn unparseable_everywhere_reads_as_absent() {
    let f = fixture("www.example.com", false);
    f.durable.set_item("k", "garbage").unwrap();
    assert_eq!(f.adapter.read::<Record>("k"), None);
}

#[test]
fn remove_clears_both_stores() {
    let f = fixture("www.example.com", false);
    f.durable.set_item("k", "1").unwrap();
    f.session.set_item("k", "1").unwrap();
    f.adapter.remove("k");
    assert!(f.durable.is_empty());
    assert!(f.session.is_empty());
}

// ── Cookies ──────────────────────────────────────────────────────

#[test]
fn cookie_write_applies_scope_attributes() {
    let f = fixture("www.example.com", true);
    f.adapter.write_cookie("_zt_id", "abc", 60);
    let last = f.jar.writes().pop().unwrap();
    assert_eq!(last.name, "_zt_id");
    assert_eq!(last.max_age, Some(60));
    assert_eq!(last.path.as_deref(), Some("/"));
    assert_eq!(last.domain.as_deref(), Some(".example.com"));
    assert_eq!(last.same_site, Some(SameSite::Lax));
    assert!(last.secure);
    assert_eq!(f.adapter.read_cookie("_zt_id").as_deref(), Some("abc"));
}

#[test]
fn delete_cookie_expires_it() {
    let f = fixture("www.example.com", false);
    f.adapter.write_cookie("_zt_id", "abc", 60);
    f.adapter.delete_cookie("_zt_id");
    assert!(f.jar.get("_zt_id").is_none());
    assert_eq!(f.jar.writes().pop().unwrap().max_age, Some(0));
}
