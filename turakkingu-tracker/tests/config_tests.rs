use pretty_assertions::assert_eq;
use std::time::Duration;
use turakkingu_delivery::WireFormat;
use turakkingu_tracker::{is_itp_browser, TrackerConfig};
use turakkingu_tracker::mock::{CHROME_UA, SAFARI_UA};

#[test]
fn defaults() {
    let c = TrackerConfig::default();
    assert_eq!(c.endpoint, "http://localhost:8080");
    assert_eq!(c.wire_format, WireFormat::Compact);
    assert_eq!(c.cookie_name, "_zt_id");
    assert_eq!(c.cookie_max_age_secs, 2_592_000);
    assert_eq!(c.storage_key, "_zt_identity");
    assert_eq!(c.dedup_storage_key, "_zt_dedup");
    assert_eq!(c.params.session_id, "ztid");
    assert_eq!(c.params.timestamp, "ztts");
    assert_eq!(c.params.campaign_id, "ztcid");
    assert_eq!(c.dedup_window(), Duration::from_secs(3600));
    assert_eq!(c.refresh_interval(), Some(Duration::from_secs(23 * 3600)));
    assert_eq!(c.fingerprint_timeout(), Duration::from_secs(5));
    assert!(c.propagate_to_domains.is_empty());
    assert_eq!(c.delivery.max_attempts, 3);
    assert_eq!(
        c.significant_fields["conversion"],
        vec!["orderId".to_string(), "value".to_string()]
    );
}

#[test]
fn zero_refresh_interval_turns_refresh_off() {
    let c: TrackerConfig = serde_json::from_str(r#"{"refresh_interval_ms": 0}"#).unwrap();
    assert_eq!(c.refresh_interval(), None);
}

#[test]
fn partial_json_keeps_other_defaults() {
    let c: TrackerConfig = serde_json::from_str(
        r#"{
            "endpoint": "https://collector.example",
            "wire_format": "rich",
            "propagate_to_domains": ["checkout.com"],
            "params": {"session_id": "sid"},
            "delivery": {"max_attempts": 5}
        }"#,
    )
    .unwrap();
    assert_eq!(c.wire_format, WireFormat::Rich);
    assert_eq!(c.params.session_id, "sid");
    assert_eq!(c.params.timestamp, "ztts");
    assert_eq!(c.delivery.max_attempts, 5);
    assert_eq!(c.delivery.base_delay_ms, 1_000);
    assert!(c.enable_deduplication);

    let delivery = c.delivery_config();
    assert_eq!(delivery.endpoint, "https://collector.example");
    assert_eq!(delivery.max_attempts, 5);
    assert_eq!(c.identity_config().cookie_name, "_zt_id");
}

#[test]
fn safari_detection() {
    assert!(is_itp_browser(SAFARI_UA));
    assert!(!is_itp_browser(CHROME_UA));
    assert!(is_itp_browser("mozilla/5.0 SAFARI/605"));
    assert!(!is_itp_browser("curl/8.0"));
}
