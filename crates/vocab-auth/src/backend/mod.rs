//! Authoritative identity lookups against the backend.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use vocab_core::result::AppResult;
use vocab_core::types::{SubjectId, lenient_subject};

use crate::catalog::Role;

pub use http::HttpBackend;

/// The signed-in user as reported by the backend.
///
/// Only the role matters for authorization; extra fields in the payload
/// are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Backend user id.
    #[serde(deserialize_with = "lenient_subject::deserialize")]
    pub id: SubjectId,
    /// Login name.
    #[serde(default)]
    pub username: String,
    /// Role name as the backend spells it.
    pub role: String,
}

impl UserInfo {
    /// The role, validated against the closed role set.
    pub fn role(&self) -> AppResult<Role> {
        self.role.parse()
    }
}

/// Source of truth for "who is signed in".
#[async_trait]
pub trait AuthBackend: Send + Sync + std::fmt::Debug + 'static {
    /// Fetch the current user for `token`.
    ///
    /// Fails with `Authentication` when the backend rejects the credentials.
    async fn current_user(&self, token: Option<&str>) -> AppResult<UserInfo>;
}
