//! Navigation guard backed by the real HTTP client against a mock backend.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vocab_auth::{GuardDecision, HttpBackend, NavigationRequest, RedirectReason, RouteGuard, UserInfo};
use vocab_cache::StorageKeys;
use vocab_cache::local::MemoryLocalStore;
use vocab_core::config::api::ApiConfig;
use vocab_core::config::guard::GuardConfig;
use vocab_core::traits::LocalStore;

use crate::helpers;

const TOKEN: &str = "9944b09199c62bcf9418ad846dd0e4bbdfc6ee4b";

async fn guard_against(server: &MockServer) -> (RouteGuard, Arc<dyn LocalStore>, StorageKeys) {
    let backend = HttpBackend::new(&ApiConfig {
        base_url: server.uri(),
        ..ApiConfig::default()
    })
    .unwrap();
    let store: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::new());
    let keys = StorageKeys::new("vocab");
    store.set(&keys.auth_token(), TOKEN).await.unwrap();

    let guard = RouteGuard::new(
        helpers::resolver(),
        Arc::new(backend),
        Arc::clone(&store),
        keys.clone(),
        GuardConfig::default(),
    );
    (guard, store, keys)
}

async fn mount_user(server: &MockServer, role: &str) {
    Mock::given(method("GET"))
        .and(path("/api/auth/user-info/"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": 42, "username": "sam", "role": role}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_student_reaches_word_learning_and_caches_user() {
    let server = MockServer::start().await;
    mount_user(&server, "student").await;
    let (guard, store, keys) = guard_against(&server).await;

    let decision = guard.check(&NavigationRequest::to("/word-learning")).await;
    assert!(decision.is_allowed());

    let cached: UserInfo = store.get_json(&keys.current_user()).await.unwrap().unwrap();
    assert_eq!(cached.id.as_str(), "42");
    assert_eq!(cached.role, "student");
}

#[tokio::test]
async fn test_student_is_sent_away_from_dev_index() {
    let server = MockServer::start().await;
    mount_user(&server, "student").await;
    let (guard, _, _) = guard_against(&server).await;

    let decision = guard.check(&NavigationRequest::to("/admin/dev-index")).await;
    assert_eq!(decision.reason(), Some(RedirectReason::InsufficientPermission));
}

#[tokio::test]
async fn test_rejected_token_redirects_to_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/user-info/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let (guard, _, _) = guard_against(&server).await;

    let decision = guard.check(&NavigationRequest::to("/flashcards")).await;
    assert_eq!(
        decision,
        GuardDecision::Redirect {
            to: "/login?redirect=%2Fflashcards&reason=not_authenticated".to_string(),
            reason: RedirectReason::NotAuthenticated,
        }
    );
}

#[tokio::test]
async fn test_unknown_role_goes_to_error_page() {
    let server = MockServer::start().await;
    mount_user(&server, "janitor").await;
    let (guard, _, _) = guard_against(&server).await;

    let decision = guard.check(&NavigationRequest::to("/flashcards")).await;
    assert_eq!(decision.reason(), Some(RedirectReason::UnknownRole));
}
