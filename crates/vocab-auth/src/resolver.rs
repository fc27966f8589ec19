//! Evaluator results memoised in the permission cache.
//!
//! Lookup order for every query:
//! 1. Cache hit of the matching answer kind.
//! 2. Evaluate from the catalog, then cache the answer.
//!
//! A disabled cache, a miss, or an entry of the wrong kind all fall through
//! to evaluation, so answers are identical with or without the cache.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use vocab_cache::keys::{self, StorageKeys};
use vocab_cache::{CacheKey, CachePriority, CacheSnapshot, MemoryStore, MetricsSnapshot};
use vocab_core::config::cache::CacheConfig;
use vocab_core::result::AppResult;
use vocab_core::traits::{Clock, LocalStore, SystemClock};
use vocab_core::types::SubjectId;

use crate::catalog::{Permission, PermissionSet, Role};
use crate::pages::normalize_path;
use crate::rbac::{RbacEnforcer, has_permission};

/// A memoised evaluator answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CachedAnswer {
    /// A yes/no decision.
    Decision(bool),
    /// A resolved permission set.
    Permissions(PermissionSet),
}

/// Cached front of the [`RbacEnforcer`], keyed by subject and role.
pub struct PermissionResolver {
    /// The evaluator.
    enforcer: Arc<RbacEnforcer>,
    /// `None` when caching is disabled.
    cache: Option<MemoryStore<CachedAnswer>>,
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionResolver")
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl PermissionResolver {
    /// Creates a resolver using the system clock.
    pub fn new(enforcer: Arc<RbacEnforcer>, config: &CacheConfig) -> Self {
        Self::with_clock(enforcer, config, Arc::new(SystemClock))
    }

    /// Creates a resolver whose cache reads time from `clock`.
    pub fn with_clock(
        enforcer: Arc<RbacEnforcer>,
        config: &CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = config
            .enabled
            .then(|| MemoryStore::with_clock(config, clock));
        Self { enforcer, cache }
    }

    /// The underlying evaluator.
    pub fn enforcer(&self) -> &RbacEnforcer {
        &self.enforcer
    }

    /// Whether results are being cached.
    pub fn is_caching(&self) -> bool {
        self.cache.is_some()
    }

    /// The role's permission closure as seen by `subject`.
    pub fn permissions_for(&self, subject: &SubjectId, role: Role) -> PermissionSet {
        let key = keys::role_permissions(subject, role.as_str());
        if let Some(CachedAnswer::Permissions(set)) = self.lookup(&key) {
            return set;
        }

        let set = self.enforcer.resolve_permissions(role);
        // Closures are consulted by every other query; keep them over decisions.
        self.store(key, CachedAnswer::Permissions(set.clone()), CachePriority::High);
        set
    }

    /// Whether `subject`, holding `role`, has `permission`.
    pub fn has_permission(&self, subject: &SubjectId, role: Role, permission: Permission) -> bool {
        let key = keys::permission_check(subject, role.as_str(), permission.as_str());
        if let Some(CachedAnswer::Decision(allowed)) = self.lookup(&key) {
            return allowed;
        }

        let allowed = has_permission(&self.permissions_for(subject, role), permission);
        self.store(key, CachedAnswer::Decision(allowed), CachePriority::Normal);
        allowed
    }

    /// Whether `subject`, holding `role`, may open `path`.
    pub fn can_access_page(&self, subject: &SubjectId, role: Role, path: &str) -> bool {
        let path = normalize_path(path);
        let key = match keys::page_access(subject, role.as_str(), path) {
            Ok(key) => Some(key),
            Err(e) => {
                debug!(path, error = %e, "Page path not cacheable");
                None
            }
        };

        if let Some(CachedAnswer::Decision(allowed)) = key.as_ref().and_then(|k| self.lookup(k)) {
            return allowed;
        }

        let granted = self.permissions_for(subject, role);
        let allowed = self.enforcer.can_access_page(&granted, path);
        if let Some(key) = key {
            self.store(key, CachedAnswer::Decision(allowed), CachePriority::Normal);
        }
        allowed
    }

    /// Drops every cached answer for `subject`. Returns the number removed.
    pub fn invalidate_subject(&self, subject: &SubjectId) -> usize {
        let removed = self
            .cache
            .as_ref()
            .map(|c| c.invalidate_pattern(&keys::subject_pattern(subject)))
            .unwrap_or(0);
        info!(subject = %subject, removed, "Invalidated cached permissions");
        removed
    }

    /// Drops every cached answer.
    pub fn clear(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Cache counters, when caching is enabled.
    pub fn metrics(&self) -> Option<MetricsSnapshot> {
        self.cache.as_ref().map(MemoryStore::metrics)
    }

    /// Persists the subject's cached answers to the local store.
    pub async fn save_snapshot(
        &self,
        store: &Arc<dyn LocalStore>,
        storage_keys: &StorageKeys,
        subject: &SubjectId,
    ) -> AppResult<usize> {
        let Some(cache) = &self.cache else {
            return Ok(0);
        };

        let pattern = keys::subject_pattern(subject);
        let mut snapshot = cache.snapshot();
        snapshot.entries.retain(|e| pattern.matches(&e.key));
        let saved = snapshot.entries.len();

        store
            .set_json(&storage_keys.cache_snapshot(subject), &snapshot)
            .await?;
        debug!(subject = %subject, saved, "Saved permission cache snapshot");
        Ok(saved)
    }

    /// Warms the cache from a snapshot saved by [`save_snapshot`](Self::save_snapshot).
    ///
    /// A missing or unreadable snapshot restores nothing.
    pub async fn restore_snapshot(
        &self,
        store: &Arc<dyn LocalStore>,
        storage_keys: &StorageKeys,
        subject: &SubjectId,
    ) -> AppResult<usize> {
        let Some(cache) = &self.cache else {
            return Ok(0);
        };

        let snapshot: Option<CacheSnapshot<CachedAnswer>> =
            store.get_json(&storage_keys.cache_snapshot(subject)).await?;
        let restored = snapshot.map(|s| cache.restore(s)).unwrap_or(0);
        debug!(subject = %subject, restored, "Restored permission cache snapshot");
        Ok(restored)
    }

    fn lookup(&self, key: &CacheKey) -> Option<CachedAnswer> {
        self.cache.as_ref().and_then(|c| c.get(key))
    }

    fn store(&self, key: CacheKey, answer: CachedAnswer, priority: CachePriority) {
        if let Some(cache) = &self.cache {
            cache.set_with(key, answer, None, Some(priority));
        }
    }
}
