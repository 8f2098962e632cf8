use turakkingu_storage::{cookie_value, SameSite, SetCookie};

// ── SetCookie rendering ───────────────────────────────────────────

#[test]
fn bare_cookie_renders_name_value_only() {
    assert_eq!(SetCookie::new("a", "1").to_string(), "a=1");
}

#[test]
fn full_cookie_renders_all_attributes_in_order() {
    let cookie = SetCookie::new("_zt_id", "eyJzaWQiOiJ4In0")
        .max_age(2_592_000)
        .path("/")
        .domain(Some(".example.com"))
        .same_site(SameSite::Lax)
        .secure(true);
    assert_eq!(
        cookie.to_string(),
        "_zt_id=eyJzaWQiOiJ4In0; max-age=2592000; path=/; domain=.example.com; SameSite=Lax; Secure"
    );
}

#[test]
fn insecure_cookie_omits_secure_flag() {
    let cookie = SetCookie::new("a", "1").secure(false);
    assert!(!cookie.to_string().contains("Secure"));
}

#[test]
fn empty_domain_is_dropped() {
    let cookie = SetCookie::new("a", "1").domain(Some(""));
    assert!(cookie.domain.is_none());
}

#[test]
fn zero_max_age_is_removal() {
    assert!(SetCookie::new("a", "").max_age(0).is_removal());
    assert!(!SetCookie::new("a", "1").max_age(10).is_removal());
    assert!(!SetCookie::new("a", "1").is_removal());
}

// ── cookie_value ──────────────────────────────────────────────────

#[test]
fn cookie_value_finds_named_cookie() {
    let header = "theme=dark; _zt_id=abc123; other=x";
    assert_eq!(cookie_value(header, "_zt_id").as_deref(), Some("abc123"));
}

#[test]
fn cookie_value_matches_whole_names_only() {
    let header = "x_zt_id=nope; _zt_id=yes";
    assert_eq!(cookie_value(header, "_zt_id").as_deref(), Some("yes"));
}

#[test]
fn cookie_value_missing_or_empty_is_none() {
    assert!(cookie_value("a=1", "b").is_none());
    assert!(cookie_value("b=", "b").is_none());
    assert!(cookie_value("", "b").is_none());
}

#[test]
fn cookie_value_keeps_equals_inside_value() {
    assert_eq!(cookie_value("t=a=b", "t").as_deref(), Some("a=b"));
}
