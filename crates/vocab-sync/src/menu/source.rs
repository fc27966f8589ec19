//! Where full menus come from.

use async_trait::async_trait;
use serde::Deserialize;

use vocab_auth::HttpBackend;
use vocab_core::result::AppResult;

use super::entry::MenuEntry;

/// A full menu for one position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuListing {
    /// Backend menu version, when reported.
    pub version: Option<u64>,
    /// All entries of the position.
    pub entries: Vec<MenuEntry>,
}

/// Supplies full menus for refetches.
#[async_trait]
pub trait MenuSource: Send + Sync + std::fmt::Debug + 'static {
    /// Fetch every entry of `position` visible to the token's owner.
    async fn fetch_menu(&self, position: &str, token: Option<&str>) -> AppResult<MenuListing>;
}

/// The menu endpoint returns either a bare list or a versioned object.
#[derive(Deserialize)]
#[serde(untagged)]
enum MenuPayload {
    List(Vec<MenuEntry>),
    Versioned {
        #[serde(default)]
        version: Option<u64>,
        #[serde(alias = "items", alias = "menus")]
        entries: Vec<MenuEntry>,
    },
}

impl From<MenuPayload> for MenuListing {
    fn from(payload: MenuPayload) -> Self {
        match payload {
            MenuPayload::List(entries) => Self {
                version: None,
                entries,
            },
            MenuPayload::Versioned { version, entries } => Self { version, entries },
        }
    }
}

#[async_trait]
impl MenuSource for HttpBackend {
    async fn fetch_menu(&self, position: &str, token: Option<&str>) -> AppResult<MenuListing> {
        let path = self.menu_path(position);
        let payload: MenuPayload = self.get_envelope(&path, token).await?;
        Ok(payload.into())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vocab_core::config::api::ApiConfig;
    use vocab_core::error::ErrorKind;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn backend(server: &MockServer) -> HttpBackend {
        let config = ApiConfig {
            base_url: server.uri(),
            ..ApiConfig::default()
        };
        HttpBackend::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_bare_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/menus/position/sidebar/"))
            .and(header("authorization", "Bearer tok-12345"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": [{"id": 1, "title": "Home", "path": "/"}]
            })))
            .mount(&server)
            .await;

        let listing = backend(&server)
            .await
            .fetch_menu("sidebar", Some("tok-12345"))
            .await
            .unwrap();
        assert_eq!(listing.version, None);
        assert_eq!(listing.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_versioned_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/menus/position/top/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"version": 8, "items": [{"id": "a", "title": "A"}]}
            })))
            .mount(&server)
            .await;

        let listing = backend(&server).await.fetch_menu("top", None).await.unwrap();
        assert_eq!(listing.version, Some(8));
        assert_eq!(listing.entries[0].title, "A");
    }

    #[tokio::test]
    async fn test_envelope_failure_is_external_service() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "message": "menu service down"
            })))
            .mount(&server)
            .await;

        let err = backend(&server)
            .await
            .fetch_menu("sidebar", Some("tok-12345"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);
    }
}
