//! Push-driven cache invalidation through the sync client.

use vocab_auth::Role;
use vocab_core::events::{ConnectionState, EventPayload, MenuEvent, PermissionEvent};
use vocab_sync::connection::Frame;

use crate::helpers::{self, TestClient};

#[tokio::test(start_paused = true)]
async fn test_permission_changed_forces_recompute() {
    let t = TestClient::new("42", Role::Student, helpers::fast_sync_config());
    let server = t.transport.accept();
    let mut events = t.client.subscribe();
    t.client.init().await.unwrap();
    helpers::wait_for_state(&t.client, ConnectionState::Connected).await;
    helpers::wait_for_event(&mut events, |p| {
        matches!(p, EventPayload::Menu(MenuEvent::Refreshed { .. }))
    })
    .await;

    let subject = helpers::subject("42");
    assert!(t.resolver.can_access_page(&subject, Role::Student, "/word-learning"));
    let hits = t.resolver.metrics().unwrap().hits;
    assert!(t.resolver.can_access_page(&subject, Role::Student, "/word-learning"));
    assert_eq!(t.resolver.metrics().unwrap().hits, hits + 1);

    server
        .send(Frame::Text(
            r#"{"type": "permission_changed", "data": {"user_id": "42"}}"#.to_string(),
        ))
        .unwrap();
    let payload = helpers::wait_for_event(&mut events, |p| {
        matches!(p, EventPayload::Permission(PermissionEvent::Invalidated { .. }))
    })
    .await;
    let EventPayload::Permission(PermissionEvent::Invalidated { subject: who, removed }) = payload
    else {
        unreachable!();
    };
    assert_eq!(who.as_str(), "42");
    assert!(removed >= 1);

    let misses = t.resolver.metrics().unwrap().misses;
    assert!(t.resolver.can_access_page(&subject, Role::Student, "/word-learning"));
    assert!(t.resolver.metrics().unwrap().misses > misses);

    t.client.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_other_subject_keeps_its_answers() {
    let t = TestClient::new("42", Role::Student, helpers::fast_sync_config());
    let server = t.transport.accept();
    let mut events = t.client.subscribe();
    t.client.init().await.unwrap();
    helpers::wait_for_state(&t.client, ConnectionState::Connected).await;

    let other = helpers::subject("7");
    t.resolver.can_access_page(&other, Role::Teacher, "/teacher/classes");

    server
        .send(Frame::Text(
            r#"{"type": "permission_changed", "data": {"user_id": 42}}"#.to_string(),
        ))
        .unwrap();
    helpers::wait_for_event(&mut events, |p| {
        matches!(p, EventPayload::Permission(PermissionEvent::Invalidated { .. }))
    })
    .await;

    let hits = t.resolver.metrics().unwrap().hits;
    assert!(t.resolver.can_access_page(&other, Role::Teacher, "/teacher/classes"));
    assert_eq!(t.resolver.metrics().unwrap().hits, hits + 1);

    t.client.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_visible_menu_follows_role() {
    let t = TestClient::new("42", Role::Student, helpers::fast_sync_config());
    let _server = t.transport.accept();
    let mut events = t.client.subscribe();
    t.client.init().await.unwrap();
    helpers::wait_for_event(&mut events, |p| {
        matches!(p, EventPayload::Menu(MenuEvent::Refreshed { .. }))
    })
    .await;

    let visible = t.client.visible_menu("sidebar").await;
    assert_eq!(visible.len(), 1);
    let children: Vec<&str> = visible[0]
        .children
        .iter()
        .map(|n| n.entry.id.as_str())
        .collect();
    assert_eq!(children, vec!["2"]);
    assert!(t.menus.fetch_count() >= 1);

    t.client.destroy().await;
}
