//! Navigation guard: decides allow or redirect before a route is entered.
//!
//! Decision order:
//! 1. Routes without an auth requirement are allowed.
//! 2. A usable local token plus a cached user is trusted.
//! 3. Coming from the login page, local state is re-polled for a short grace window.
//! 4. The backend is asked, bounded by a timeout.
//! 5. The user's role must satisfy the page's permissions.
//!
//! Any fault on the way produces a redirect; the guard never fails open.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use vocab_cache::StorageKeys;
use vocab_core::config::guard::GuardConfig;
use vocab_core::error::ErrorKind;
use vocab_core::traits::{Clock, LocalStore, SystemClock};

use crate::backend::{AuthBackend, UserInfo};
use crate::pages::{UnknownPagePolicy, normalize_path};
use crate::resolver::PermissionResolver;

use super::token::{TokenStatus, inspect_token};

/// Upper bound on the post-login grace window.
const MAX_LOGIN_GRACE: Duration = Duration::from_millis(300);

/// A pending navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    /// Target route, possibly with query string.
    pub to: String,
    /// Route being left, if any.
    pub from: Option<String>,
}

impl NavigationRequest {
    /// Navigation to `to` with no origin.
    pub fn to(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            from: None,
        }
    }

    /// Set the route being left.
    pub fn coming_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }
}

/// Why a navigation was redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    /// No usable credentials.
    NotAuthenticated,
    /// The stored token has expired.
    SessionExpired,
    /// The backend could not confirm the session.
    AuthCheckFailed,
    /// The user's role is not in the catalog.
    UnknownRole,
    /// Signed in, but missing page permissions.
    InsufficientPermission,
    /// The route is not in the page map and unknown pages are denied.
    PageNotFound,
}

impl RedirectReason {
    /// Reason code carried in the redirect URL.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::SessionExpired => "session_expired",
            Self::AuthCheckFailed => "auth_check_failed",
            Self::UnknownRole => "unknown_role",
            Self::InsufficientPermission => "insufficient_permission",
            Self::PageNotFound => "page_not_found",
        }
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Proceed to the requested route.
    Allow,
    /// Go to `to` instead.
    Redirect {
        /// Redirect target including query string.
        to: String,
        /// Why.
        reason: RedirectReason,
    },
}

impl GuardDecision {
    /// Whether the navigation may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// The redirect reason, if any.
    pub fn reason(&self) -> Option<RedirectReason> {
        match self {
            Self::Allow => None,
            Self::Redirect { reason, .. } => Some(*reason),
        }
    }
}

/// Route guard over the cached resolver, local state and the backend.
pub struct RouteGuard {
    resolver: Arc<PermissionResolver>,
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn LocalStore>,
    keys: StorageKeys,
    clock: Arc<dyn Clock>,
    config: GuardConfig,
}

impl std::fmt::Debug for RouteGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteGuard")
            .field("config", &self.config)
            .finish()
    }
}

impl RouteGuard {
    /// Creates a guard reading token expiry against the system clock.
    pub fn new(
        resolver: Arc<PermissionResolver>,
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn LocalStore>,
        keys: StorageKeys,
        config: GuardConfig,
    ) -> Self {
        Self {
            resolver,
            backend,
            store,
            keys,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the clock used for token expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Decide whether `request` may proceed.
    pub async fn check(&self, request: &NavigationRequest) -> GuardDecision {
        let path = normalize_path(&request.to);
        let pages = self.resolver.enforcer().pages();

        match pages.lookup(path) {
            None if pages.unknown_policy() == UnknownPagePolicy::Deny => {
                return self.to_error(RedirectReason::PageNotFound);
            }
            None => return GuardDecision::Allow,
            Some(rule) if !rule.requires_auth => return GuardDecision::Allow,
            Some(_) => {}
        }

        let user = match self.authenticate(request).await {
            Ok(user) => user,
            Err(reason) => {
                info!(path, reason = reason.code(), "Navigation requires sign-in");
                return self.to_login(path, reason);
            }
        };

        let role = match user.role() {
            Ok(role) => role,
            Err(e) => {
                warn!(user_id = %user.id, role = %user.role, error = %e, "User has unknown role");
                return self.to_error(RedirectReason::UnknownRole);
            }
        };

        if self.resolver.can_access_page(&user.id, role, path) {
            debug!(path, user_id = %user.id, role = %role, "Navigation allowed");
            GuardDecision::Allow
        } else {
            info!(path, user_id = %user.id, role = %role, "Navigation denied: insufficient permission");
            self.to_error(RedirectReason::InsufficientPermission)
        }
    }

    async fn authenticate(&self, request: &NavigationRequest) -> Result<UserInfo, RedirectReason> {
        if let Some(user) = self.local_identity().await {
            return Ok(user);
        }

        if self.is_from_login(request) {
            let grace = Duration::from_millis(self.config.login_grace_ms).min(MAX_LOGIN_GRACE);
            let poll = Duration::from_millis(self.config.grace_poll_ms.max(1));
            let deadline = Instant::now() + grace;
            loop {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                tokio::time::sleep(poll.min(deadline - now)).await;
                if let Some(user) = self.local_identity().await {
                    debug!("Auth state arrived during login grace window");
                    return Ok(user);
                }
            }
        }

        let token = self.read_token().await;
        if inspect_token(token.as_deref(), self.clock.now()) == TokenStatus::Expired {
            return Err(RedirectReason::SessionExpired);
        }

        // On timeout the backend future is dropped and any late answer is discarded.
        let timeout = Duration::from_millis(self.config.authority_timeout_ms);
        match tokio::time::timeout(timeout, self.backend.current_user(token.as_deref())).await {
            Ok(Ok(user)) => {
                if let Err(e) = self.store.set_json(&self.keys.current_user(), &user).await {
                    warn!(error = %e, "Failed to cache current user");
                }
                Ok(user)
            }
            Ok(Err(e)) if e.kind == ErrorKind::Authentication => {
                debug!(error = %e, "Backend rejected session");
                Err(RedirectReason::NotAuthenticated)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Authoritative auth check failed");
                Err(RedirectReason::AuthCheckFailed)
            }
            Err(_) => {
                warn!(timeout_ms = self.config.authority_timeout_ms, "Authoritative auth check timed out");
                Err(RedirectReason::AuthCheckFailed)
            }
        }
    }

    /// The cached user, if a usable token is also stored.
    async fn local_identity(&self) -> Option<UserInfo> {
        let token = self.read_token().await?;
        if !inspect_token(Some(&token), self.clock.now()).is_usable() {
            return None;
        }
        match self.store.get_json::<UserInfo>(&self.keys.current_user()).await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Failed to read cached user");
                None
            }
        }
    }

    async fn read_token(&self) -> Option<String> {
        match self.store.get(&self.keys.auth_token()).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read auth token");
                None
            }
        }
    }

    fn is_from_login(&self, request: &NavigationRequest) -> bool {
        request
            .from
            .as_deref()
            .is_some_and(|from| normalize_path(from) == normalize_path(&self.config.login_path))
    }

    fn to_login(&self, path: &str, reason: RedirectReason) -> GuardDecision {
        GuardDecision::Redirect {
            to: format!(
                "{}?redirect={}&reason={}",
                self.config.login_path,
                urlencoding::encode(path),
                reason.code()
            ),
            reason,
        }
    }

    fn to_error(&self, reason: RedirectReason) -> GuardDecision {
        GuardDecision::Redirect {
            to: format!("{}?reason={}", self.config.error_path, reason.code()),
            reason,
        }
    }
}
