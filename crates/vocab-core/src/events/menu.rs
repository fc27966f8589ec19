//! Menu state events.

use serde::{Deserialize, Serialize};

/// Events related to the in-memory menu tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MenuEvent {
    /// A full refetch replaced the menu for a position.
    Refreshed {
        /// Menu position (e.g. `sidebar`).
        position: String,
        /// Number of entries now held.
        entries: usize,
        /// Menu version reported by the backend.
        version: u64,
    },
    /// An incremental update was applied.
    Patched {
        /// Menu position.
        position: String,
        /// Version after the patch.
        version: u64,
        /// Number of operations applied.
        operations: usize,
    },
    /// A refetch failed; the previous menu stays in place.
    RefetchFailed {
        /// Menu position.
        position: String,
        /// Failure description.
        reason: String,
    },
    /// The last-known-good snapshot was loaded from local storage.
    RestoredFromSnapshot {
        /// Menu position.
        position: String,
        /// Number of entries restored.
        entries: usize,
    },
}
