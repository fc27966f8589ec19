//! Permission cache events.

use serde::{Deserialize, Serialize};

use crate::types::SubjectId;

/// Events related to cached authorization results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PermissionEvent {
    /// The backend reported a permission change for a subject.
    Changed {
        /// Affected subject.
        subject: SubjectId,
    },
    /// Cached results for a subject were dropped.
    Invalidated {
        /// Affected subject.
        subject: SubjectId,
        /// Number of cache entries removed.
        removed: usize,
    },
}
