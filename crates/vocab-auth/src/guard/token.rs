//! Local auth-token inspection.
//!
//! The client cannot verify signatures; it only decides whether a stored
//! token is worth presenting. JWT-shaped tokens are decoded without
//! signature checks far enough to read `exp`, everything else is checked
//! for shape only.

use chrono::{DateTime, Utc};
use jsonwebtoken::dangerous::insecure_decode;
use serde::Deserialize;
use tracing::debug;

/// Clock skew tolerated when comparing `exp` with the local clock.
///
/// Expiry is judged against the caller's clock rather than inside the
/// decoder, so tests and the guard can drive time.
const EXPIRY_LEEWAY_SECONDS: i64 = 5;

/// Shortest opaque token accepted.
const MIN_OPAQUE_LEN: usize = 8;

/// Outcome of inspecting a stored token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    /// Nothing stored.
    Missing,
    /// Stored but unusable.
    Malformed,
    /// A JWT whose `exp` has passed.
    Expired,
    /// Worth presenting to the backend.
    WellFormed,
}

impl TokenStatus {
    /// Whether the token can be used.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::WellFormed)
    }
}

#[derive(Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<i64>,
}

/// Classify a stored token at time `now`.
pub fn inspect_token(raw: Option<&str>, now: DateTime<Utc>) -> TokenStatus {
    let Some(token) = raw else {
        return TokenStatus::Missing;
    };
    let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
    if token.is_empty() {
        return TokenStatus::Missing;
    }
    if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return TokenStatus::Malformed;
    }

    let segments = token.split('.').count();
    if segments == 3 {
        return inspect_jwt(token, now);
    }

    let opaque_ok = token.len() >= MIN_OPAQUE_LEN
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.~+/=".contains(c));
    if opaque_ok {
        TokenStatus::WellFormed
    } else {
        TokenStatus::Malformed
    }
}

fn inspect_jwt(token: &str, now: DateTime<Utc>) -> TokenStatus {
    if token.split('.').any(str::is_empty) {
        return TokenStatus::Malformed;
    }

    let claims = match insecure_decode::<Claims>(token) {
        Ok(data) => data.claims,
        Err(e) => {
            debug!(error = %e, "Stored JWT could not be decoded");
            return TokenStatus::Malformed;
        }
    };

    match claims.exp {
        Some(exp) if exp + EXPIRY_LEEWAY_SECONDS <= now.timestamp() => TokenStatus::Expired,
        _ => TokenStatus::WellFormed,
    }
}
