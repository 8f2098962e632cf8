use std::sync::Arc;
use std::time::Duration;
use turakkingu_delivery::mock::{MockTransport, PostResult};
use turakkingu_delivery::{Channel, DeliveryConfig, DeliveryOutcome, EventSender};
use turakkingu_types::{names, Event, Identity, Properties, SessionId, Timestamp};

fn event(name: &str) -> Event {
    let identity = Identity::new(
        SessionId::parse("v-1").unwrap(),
        None,
        Timestamp::from_millis(1),
    );
    Event::new(
        name,
        Properties::new(),
        Timestamp::from_millis(2),
        identity,
        "https://shop.example.com/",
    )
}

fn sender(transport: &MockTransport) -> EventSender {
    EventSender::new(Arc::new(transport.clone()), DeliveryConfig::default())
}

#[test]
fn default_config() {
    let config = DeliveryConfig::default();
    assert_eq!(config.max_attempts, 3);
    assert_eq!(config.base_delay_ms, 1_000);
    assert_eq!(config.max_delay_ms, 30_000);
    assert_eq!(config.beacon_events.len(), 9);
    assert!(config.beacon_events.contains(names::PAGE_VIEW));
    assert!(!config.beacon_events.contains(names::CONVERSION));
}

#[test]
fn config_fills_missing_fields() {
    let config: DeliveryConfig =
        serde_json::from_str(r#"{"endpoint":"https://c.example","max_attempts":5}"#).unwrap();
    assert_eq!(config.endpoint, "https://c.example");
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.base_delay_ms, 1_000);
}

#[test]
fn retry_delay_doubles_and_caps() {
    let s = sender(&MockTransport::new());
    assert_eq!(s.retry_delay(1), Duration::from_secs(2));
    assert_eq!(s.retry_delay(2), Duration::from_secs(4));
    assert_eq!(s.retry_delay(5), Duration::from_secs(30));
    assert_eq!(s.retry_delay(200), Duration::from_secs(30));
}

#[test]
fn url_joins_endpoint_and_path() {
    let config = DeliveryConfig {
        endpoint: "https://collector.example/".into(),
        ..DeliveryConfig::default()
    };
    let s = EventSender::new(Arc::new(MockTransport::new()), config);
    assert_eq!(s.url(), "https://collector.example/v1/tracks/events");
}

#[tokio::test(start_paused = true)]
async fn first_success_stops() {
    let t = MockTransport::new();
    let outcome = sender(&t).send(&event(names::CONVERSION)).await;
    assert_eq!(
        outcome,
        DeliveryOutcome::Delivered {
            attempts: 1,
            channel: Channel::Request
        }
    );
    assert_eq!(t.attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn persistent_failure_makes_exactly_three_attempts() {
    let t = MockTransport::new().with_default_post(PostResult::Status(500));
    let outcome = sender(&t).send(&event(names::CONVERSION)).await;
    assert_eq!(outcome, DeliveryOutcome::Exhausted { attempts: 3 });

    let attempts = t.attempts();
    assert_eq!(attempts.len(), 3);
    let first_gap = attempts[1].at - attempts[0].at;
    let second_gap = attempts[2].at - attempts[1].at;
    assert_eq!(first_gap, Duration::from_secs(2));
    assert_eq!(second_gap, Duration::from_secs(4));
    assert!(second_gap > first_gap);
}

#[tokio::test(start_paused = true)]
async fn no_further_attempts_after_exhaustion() {
    let t = MockTransport::new().with_default_post(PostResult::NetworkError);
    sender(&t).send(&event(names::CONVERSION)).await;
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(t.attempts().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn recovers_on_second_attempt() {
    let t = MockTransport::new();
    t.script_posts([PostResult::Status(503)]);
    let outcome = sender(&t).send(&event(names::PURCHASE)).await;
    assert_eq!(
        outcome,
        DeliveryOutcome::Delivered {
            attempts: 2,
            channel: Channel::Request
        }
    );
}

#[tokio::test(start_paused = true)]
async fn beacon_eligible_event_uses_beacon() {
    let t = MockTransport::new().with_beacon(true);
    let outcome = sender(&t).send(&event(names::PAGE_VIEW)).await;
    assert_eq!(
        outcome,
        DeliveryOutcome::Delivered {
            attempts: 1,
            channel: Channel::Beacon
        }
    );
    let attempts = t.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].channel, Channel::Beacon);
}

#[tokio::test(start_paused = true)]
async fn refused_beacon_falls_back_to_request() {
    let t = MockTransport::new().with_beacon(false);
    let outcome = sender(&t).send(&event(names::CLICK)).await;
    assert_eq!(
        outcome,
        DeliveryOutcome::Delivered {
            attempts: 1,
            channel: Channel::Request
        }
    );
    let channels: Vec<_> = t.attempts().iter().map(|a| a.channel).collect();
    assert_eq!(channels, vec![Channel::Beacon, Channel::Request]);
}

#[tokio::test(start_paused = true)]
async fn every_retry_tries_beacon_first() {
    let t = MockTransport::new()
        .with_beacon(false)
        .with_default_post(PostResult::Status(500));
    sender(&t).send(&event(names::PAGE_VIEW)).await;
    let channels: Vec<_> = t.attempts().iter().map(|a| a.channel).collect();
    assert_eq!(
        channels,
        vec![
            Channel::Beacon,
            Channel::Request,
            Channel::Beacon,
            Channel::Request,
            Channel::Beacon,
            Channel::Request,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn non_beacon_event_skips_beacon() {
    let t = MockTransport::new().with_beacon(true);
    sender(&t).send(&event(names::CONVERSION)).await;
    let attempts = t.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].channel, Channel::Request);
}

#[test]
fn session_end_prefers_beacon() {
    let t = MockTransport::new().with_beacon(true);
    let outcome = sender(&t).send_session_end(&event(names::SESSION_END));
    assert_eq!(
        outcome,
        DeliveryOutcome::Delivered {
            attempts: 1,
            channel: Channel::Beacon
        }
    );
}

#[test]
fn session_end_without_beacon_blocks() {
    let t = MockTransport::new();
    let outcome = sender(&t).send_session_end(&event(names::SESSION_END));
    assert_eq!(
        outcome,
        DeliveryOutcome::Delivered {
            attempts: 1,
            channel: Channel::BlockingRequest
        }
    );
    assert_eq!(t.attempts()[0].channel, Channel::BlockingRequest);
}

#[test]
fn session_end_is_single_shot() {
    let t = MockTransport::new().with_default_post(PostResult::NetworkError);
    let outcome = sender(&t).send_session_end(&event(names::SESSION_END));
    assert_eq!(outcome, DeliveryOutcome::Exhausted { attempts: 1 });
    assert_eq!(t.attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn body_uses_configured_dialect() {
    let t = MockTransport::new();
    sender(&t).send(&event(names::CONVERSION)).await;
    let bodies = t.bodies();
    assert_eq!(bodies[0]["track_id"], "v-1");
    assert_eq!(bodies[0]["event_name"], "conversion");
    assert!(t.attempts()[0].url.ends_with("/v1/tracks/events"));
}
