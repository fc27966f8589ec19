//! Reconnect backoff bounds and the terminal disconnect after retries run out.

use std::time::Duration;

use vocab_auth::Role;
use vocab_core::config::sync::SyncConfig;
use vocab_core::events::{ConnectionEvent, ConnectionState, EventPayload};
use vocab_sync::ReconnectPolicy;

use crate::helpers::{self, TestClient};

#[test]
fn test_delays_grow_within_jitter_and_cap() {
    let policy = ReconnectPolicy::from_config(&SyncConfig {
        base_delay_ms: 1000,
        max_reconnect_interval_ms: 30_000,
        jitter_ratio: 0.25,
        ..SyncConfig::default()
    });

    let bases: Vec<Duration> = (0..3).map(|a| policy.base_delay(a)).collect();
    assert!(bases.windows(2).all(|w| w[0] < w[1]));

    for attempt in 0..3 {
        let base = policy.base_delay(attempt).as_secs_f64();
        for _ in 0..50 {
            let delay = policy.delay(attempt).as_secs_f64();
            assert!(delay >= base * 0.75 - 1e-9, "attempt {attempt}: {delay} < {base}");
            assert!(delay <= base * 1.25 + 1e-9, "attempt {attempt}: {delay} > {base}");
        }
    }

    for attempt in [5, 10, 31, 64, u32::MAX] {
        assert!(policy.delay(attempt) <= Duration::from_millis(30_000));
    }
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_max_attempts() {
    let config = SyncConfig {
        max_reconnect_attempts: 3,
        ..helpers::fast_sync_config()
    };
    let t = TestClient::new("42", Role::Student, config);
    let mut events = t.client.subscribe();
    t.client.init().await.unwrap();

    let payload = helpers::wait_for_event(&mut events, |p| {
        matches!(p, EventPayload::Connection(ConnectionEvent::Degraded { .. }))
    })
    .await;
    let EventPayload::Connection(ConnectionEvent::Degraded { attempts, .. }) = payload else {
        unreachable!();
    };
    assert_eq!(attempts, 3);
    helpers::wait_for_state(&t.client, ConnectionState::Disconnected).await;
    assert!(t.client.is_degraded());

    // The initial attempt plus three retries, then nothing more.
    assert_eq!(t.transport.connect_count(), 4);
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(t.transport.connect_count(), 4);
    assert_eq!(t.client.state(), ConnectionState::Disconnected);

    t.client.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_recovers_when_a_retry_succeeds() {
    let t = TestClient::new("42", Role::Student, helpers::fast_sync_config());
    let mut events = t.client.subscribe();
    t.client.init().await.unwrap();

    helpers::wait_for_event(&mut events, |p| {
        matches!(
            p,
            EventPayload::Connection(ConnectionEvent::StateChanged {
                to: ConnectionState::Reconnecting,
                ..
            })
        )
    })
    .await;
    let _server = t.transport.accept();

    helpers::wait_for_state(&t.client, ConnectionState::Connected).await;
    assert!(!t.client.is_degraded());
    assert_eq!(t.transport.connect_count(), 2);

    t.client.destroy().await;
}
