//! In-memory menu tree for one position.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use vocab_auth::PermissionSet;

use super::entry::{MenuEntry, MenuId};
use crate::message::{MenuOperation, MenuUpdate};

/// Why an incremental update could not be applied.
///
/// Any of these means the local tree can no longer be trusted and the
/// position must be refetched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MenuInconsistency {
    /// The update skips one or more versions.
    #[error("version gap: expected {expected}, got {got}")]
    VersionGap {
        /// Next version the tree expected.
        expected: u64,
        /// Version carried by the update.
        got: u64,
    },
    /// An entry names a parent the tree does not hold.
    #[error("entry {id} references missing parent {parent}")]
    MissingParent {
        /// Offending entry.
        id: MenuId,
        /// Unknown parent.
        parent: MenuId,
    },
    /// A create or update operation came without its entry.
    #[error("{op} operation without an entry")]
    MissingPayload {
        /// Operation name.
        op: &'static str,
    },
}

/// Result of [`MenuTree::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// All operations were applied.
    Applied {
        /// Number of operations.
        operations: usize,
    },
    /// The update is not newer than the tree and was ignored.
    Stale,
}

/// A visible entry with its visible children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuNode {
    /// The entry.
    pub entry: MenuEntry,
    /// Visible children in display order.
    pub children: Vec<MenuNode>,
}

/// Entries of one menu position, keyed by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuTree {
    /// Menu position, e.g. `sidebar`.
    position: String,
    /// Version last seen from the backend; `None` after a plain fetch.
    version: Option<u64>,
    /// Entries by id.
    entries: BTreeMap<MenuId, MenuEntry>,
}

impl MenuTree {
    /// An empty tree.
    pub fn new(position: impl Into<String>) -> Self {
        Self {
            position: position.into(),
            version: None,
            entries: BTreeMap::new(),
        }
    }

    /// A tree holding a full fetch result. Later duplicates replace earlier ones.
    pub fn from_entries(
        position: impl Into<String>,
        entries: impl IntoIterator<Item = MenuEntry>,
        version: Option<u64>,
    ) -> Self {
        Self {
            position: position.into(),
            version,
            entries: entries.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    /// Menu position.
    pub fn position(&self) -> &str {
        &self.position
    }

    /// Version last applied, if known.
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry by id.
    pub fn get(&self, id: &MenuId) -> Option<&MenuEntry> {
        self.entries.get(id)
    }

    /// All entries in id order.
    pub fn entries(&self) -> impl Iterator<Item = &MenuEntry> {
        self.entries.values()
    }

    /// Applies an incremental update atomically.
    ///
    /// On error the tree is left untouched. Deletes of unknown ids are no-ops
    /// and updates of unknown ids insert, so replays are harmless.
    pub fn apply(&mut self, update: &MenuUpdate) -> Result<ApplyOutcome, MenuInconsistency> {
        if let (Some(current), Some(incoming)) = (self.version, update.version) {
            if incoming <= current {
                return Ok(ApplyOutcome::Stale);
            }
            if incoming != current + 1 {
                return Err(MenuInconsistency::VersionGap {
                    expected: current + 1,
                    got: incoming,
                });
            }
        }

        let mut entries = self.entries.clone();
        for op in &update.operations {
            match op {
                MenuOperation::Create { entry } | MenuOperation::Update { entry } => {
                    let entry = entry
                        .as_ref()
                        .ok_or(MenuInconsistency::MissingPayload { op: op.name() })?;
                    if let Some(parent) = &entry.parent_id {
                        if !entries.contains_key(parent) {
                            return Err(MenuInconsistency::MissingParent {
                                id: entry.id.clone(),
                                parent: parent.clone(),
                            });
                        }
                    }
                    entries.insert(entry.id.clone(), entry.clone());
                }
                MenuOperation::Delete { id } => remove_subtree(&mut entries, id),
            }
        }

        self.entries = entries;
        if update.version.is_some() {
            self.version = update.version;
        }
        Ok(ApplyOutcome::Applied {
            operations: update.operations.len(),
        })
    }

    /// The part of the tree `granted` may see.
    ///
    /// Hidden entries hide their whole subtree; entries whose parent is
    /// missing are dropped. Siblings are ordered by `order`, then id.
    pub fn visible(&self, granted: &PermissionSet) -> Vec<MenuNode> {
        let mut children: BTreeMap<Option<&MenuId>, Vec<&MenuEntry>> = BTreeMap::new();
        for entry in self.entries.values() {
            children.entry(entry.parent_id.as_ref()).or_default().push(entry);
        }
        for siblings in children.values_mut() {
            siblings.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        }

        // Each entry is emitted at most once, whatever the parent links say.
        let mut visited = BTreeSet::new();
        build_level(None, &children, granted, &mut visited)
    }
}

fn build_level(
    parent: Option<&MenuId>,
    children: &BTreeMap<Option<&MenuId>, Vec<&MenuEntry>>,
    granted: &PermissionSet,
    visited: &mut BTreeSet<MenuId>,
) -> Vec<MenuNode> {
    let Some(siblings) = children.get(&parent) else {
        return Vec::new();
    };

    let mut level = Vec::new();
    for entry in siblings {
        if !entry.is_visible_to(granted) || !visited.insert(entry.id.clone()) {
            continue;
        }
        level.push(MenuNode {
            entry: (*entry).clone(),
            children: build_level(Some(&entry.id), children, granted, visited),
        });
    }
    level
}

fn remove_subtree(entries: &mut BTreeMap<MenuId, MenuEntry>, id: &MenuId) {
    let mut pending = vec![id.clone()];
    while let Some(current) = pending.pop() {
        if entries.remove(&current).is_none() {
            continue;
        }
        pending.extend(
            entries
                .values()
                .filter(|e| e.parent_id.as_ref() == Some(&current))
                .map(|e| e.id.clone()),
        );
    }
}
