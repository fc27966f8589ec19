//! Backend REST API configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Backend endpoint settings consumed by the HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApiConfig {
    /// Base URL of the REST API, without trailing slash.
    #[serde(default = "default_base_url")]
    #[validate(length(min = 1))]
    pub base_url: String,
    /// Base URL of the WebSocket endpoint (`ws://` or `wss://`).
    #[serde(default = "default_ws_base_url")]
    #[validate(length(min = 1))]
    pub ws_base_url: String,
    /// Path of the current-user endpoint.
    #[serde(default = "default_user_info_path")]
    pub user_info_path: String,
    /// Path of the menu-by-position endpoint; `{position}` is substituted.
    #[serde(default = "default_menu_path")]
    pub menu_path: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    #[validate(range(min = 100, max = 120000))]
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_base_url: default_ws_base_url(),
            user_info_path: default_user_info_path(),
            menu_path: default_menu_path(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_ws_base_url() -> String {
    "ws://localhost:8000".to_string()
}

fn default_user_info_path() -> String {
    "/api/auth/user-info/".to_string()
}

fn default_menu_path() -> String {
    "/api/menus/position/{position}/".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}
