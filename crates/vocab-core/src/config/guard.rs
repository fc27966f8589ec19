//! Route guard configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Navigation guard settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GuardConfig {
    /// Path of the login page.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Path of the error page that receives a reason code.
    #[serde(default = "default_error_path")]
    pub error_path: String,
    /// How long to wait for auth state after leaving the login page.
    #[serde(default = "default_login_grace")]
    #[validate(range(max = 300))]
    pub login_grace_ms: u64,
    /// Poll interval while waiting inside the grace window.
    #[serde(default = "default_grace_poll")]
    #[validate(range(min = 1))]
    pub grace_poll_ms: u64,
    /// Upper bound on the authoritative backend check.
    #[serde(default = "default_authority_timeout")]
    #[validate(range(min = 1))]
    pub authority_timeout_ms: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            error_path: default_error_path(),
            login_grace_ms: default_login_grace(),
            grace_poll_ms: default_grace_poll(),
            authority_timeout_ms: default_authority_timeout(),
        }
    }
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_error_path() -> String {
    "/error".to_string()
}

fn default_login_grace() -> u64 {
    300
}

fn default_grace_poll() -> u64 {
    50
}

fn default_authority_timeout() -> u64 {
    3000
}
