//! REST client for the backend's `{success, data, message}` endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use vocab_core::config::api::ApiConfig;
use vocab_core::error::{AppError, ErrorKind};
use vocab_core::result::AppResult;
use vocab_core::types::ApiResponse;

use super::{AuthBackend, UserInfo};

/// HTTP access to the backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    /// Shared connection pool.
    client: reqwest::Client,
    /// API base URL without trailing slash.
    base_url: String,
    /// Current-user endpoint path.
    user_info_path: String,
    /// Menu endpoint template containing `{position}`.
    menu_path: String,
}

impl HttpBackend {
    /// Creates a client from the `api` configuration section.
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_info_path: config.user_info_path.clone(),
            menu_path: config.menu_path.clone(),
        })
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Path of the menu endpoint for a position.
    pub fn menu_path(&self, position: &str) -> String {
        self.menu_path.replace("{position}", position)
    }

    /// GET an enveloped resource and unwrap its `data`.
    pub async fn get_envelope<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> AppResult<T> {
        let url = self.url(path);
        let mut request = self.client.get(&url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            let kind = if e.is_timeout() {
                ErrorKind::Timeout
            } else {
                ErrorKind::Network
            };
            AppError::with_source(kind, format!("GET {url} failed"), e)
        })?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "Backend response");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppError::authentication(format!(
                "Backend rejected credentials ({status})"
            )));
        }
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Backend request failed");
            return Err(AppError::external_service(format!(
                "GET {url} returned {status}"
            )));
        }

        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ExternalService,
                format!("Malformed response from {url}"),
                e,
            )
        })?;
        envelope.into_result()
    }
}

#[async_trait]
impl AuthBackend for HttpBackend {
    async fn current_user(&self, token: Option<&str>) -> AppResult<UserInfo> {
        let Some(token) = token else {
            return Err(AppError::authentication("No auth token available"));
        };
        self.get_envelope(&self.user_info_path, Some(token)).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn backend(server: &MockServer) -> HttpBackend {
        HttpBackend::new(&ApiConfig {
            base_url: server.uri(),
            ..ApiConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_current_user_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/user-info/"))
            .and(header("authorization", "Bearer tok-123456"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"id": 42, "username": "alice", "role": "teacher", "email": "a@x"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let user = backend(&server)
            .current_user(Some("tok-123456"))
            .await
            .unwrap();
        assert_eq!(user.id.as_str(), "42");
        assert_eq!(user.role().unwrap(), crate::catalog::Role::Teacher);
    }

    #[tokio::test]
    async fn test_unsuccessful_envelope_is_external_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "message": "session gone"
            })))
            .mount(&server)
            .await;

        let err = backend(&server)
            .current_user(Some("tok-123456"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_authentication() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = backend(&server)
            .current_user(Some("tok-123456"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn test_no_token_skips_request() {
        let server = MockServer::start().await;
        let err = backend(&server).current_user(None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn test_menu_path_substitution() {
        let backend = HttpBackend::new(&ApiConfig::default()).unwrap();
        assert_eq!(backend.menu_path("sidebar"), "/api/menus/position/sidebar/");
        assert_eq!(
            backend.url("/api/x"),
            "http://localhost:8000/api/x"
        );
    }
}
