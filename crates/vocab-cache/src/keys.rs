//! Cache and local-storage key builders.
//!
//! Centralising key construction prevents typos and makes it easy to find
//! every key the client uses. Permission cache keys have the shape
//! `perm:{subject}:{role}:{kind}[:{args}]` so that `perm:{subject}:*`
//! selects every cached result for one subject, whatever role it held.

use std::fmt;

use vocab_core::error::AppError;
use vocab_core::types::SubjectId;

/// Namespace of permission cache keys.
const PERM_NAMESPACE: &str = "perm";

/// Longest accepted key.
const MAX_KEY_LEN: usize = 512;

/// A validated cache key.
///
/// Keys never contain whitespace, control characters, or `*` (reserved
/// for patterns), so an invalid key is rejected once at construction and
/// cache operations themselves cannot fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Validate a raw key.
    pub fn parse(raw: impl Into<String>) -> Result<Self, AppError> {
        let raw = raw.into();
        if raw.is_empty() || raw.len() > MAX_KEY_LEN {
            return Err(AppError::validation(format!(
                "Cache key must be 1-{MAX_KEY_LEN} bytes"
            )));
        }
        if raw.chars().any(|c| c == '*' || c.is_whitespace() || c.is_control()) {
            return Err(AppError::validation(format!("Invalid cache key '{raw}'")));
        }
        Ok(Self(raw))
    }

    /// Borrow the key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A glob pattern over cache keys; `*` matches any run of characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern(String);

impl KeyPattern {
    /// Build a pattern. Empty patterns are rejected.
    pub fn new(raw: impl Into<String>) -> Result<Self, AppError> {
        let raw = raw.into();
        if raw.is_empty() || raw.chars().any(char::is_whitespace) {
            return Err(AppError::validation(format!("Invalid key pattern '{raw}'")));
        }
        Ok(Self(raw))
    }

    /// Whether `key` matches this pattern.
    pub fn matches(&self, key: &str) -> bool {
        glob_match(&self.0, key)
    }

    /// Borrow the pattern text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Segment-wise glob matching with `*` as the only metacharacter.
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let (first, rest) = (parts[0], &parts[1..]);
    let Some(mut remaining) = text.strip_prefix(first) else {
        return false;
    };

    let last = rest[rest.len() - 1];
    for middle in &rest[..rest.len() - 1] {
        match remaining.find(*middle) {
            Some(idx) => remaining = &remaining[idx + middle.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last)
}

// ── Permission cache keys ──────────────────────────────────

/// Cache key for a role's resolved permission set, as seen by a subject.
pub fn role_permissions(subject: &SubjectId, role: &str) -> CacheKey {
    CacheKey(format!("{PERM_NAMESPACE}:{subject}:{role}:resolved"))
}

/// Cache key for a page access decision.
///
/// Paths containing whitespace or `*` are not cacheable and yield a
/// validation error.
pub fn page_access(subject: &SubjectId, role: &str, path: &str) -> Result<CacheKey, AppError> {
    CacheKey::parse(format!("{PERM_NAMESPACE}:{subject}:{role}:page:{path}"))
}

/// Cache key for a single permission check.
pub fn permission_check(subject: &SubjectId, role: &str, permission: &str) -> CacheKey {
    CacheKey(format!("{PERM_NAMESPACE}:{subject}:{role}:has:{permission}"))
}

/// Pattern selecting every cached result for a subject.
pub fn subject_pattern(subject: &SubjectId) -> KeyPattern {
    KeyPattern(format!("{PERM_NAMESPACE}:{subject}:*"))
}

/// Pattern selecting every cached permission result.
pub fn all_permissions_pattern() -> KeyPattern {
    KeyPattern(format!("{PERM_NAMESPACE}:*"))
}

// ── Local storage keys ─────────────────────────────────────

/// Builders for keys in the local persisted store, namespaced by prefix.
#[derive(Debug, Clone)]
pub struct StorageKeys {
    prefix: String,
}

impl StorageKeys {
    /// Create builders for a prefix such as `vocab`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Stored auth token.
    pub fn auth_token(&self) -> String {
        format!("{}:auth_token", self.prefix)
    }

    /// Cached current-user object.
    pub fn current_user(&self) -> String {
        format!("{}:user", self.prefix)
    }

    /// Last-known-good menu for a subject, role and position.
    pub fn menu_snapshot(&self, subject: &SubjectId, role: &str, position: &str) -> String {
        format!("{}:{subject}:menu:{role}:{position}", self.prefix)
    }

    /// Permission cache snapshot for a subject.
    pub fn cache_snapshot(&self, subject: &SubjectId) -> String {
        format!("{}:{subject}:cache_snapshot", self.prefix)
    }

    /// Prefix selecting all keys belonging to a subject.
    pub fn subject_prefix(&self, subject: &SubjectId) -> String {
        format!("{}:{subject}:", self.prefix)
    }
}
