//! Catalog validation failures.

use thiserror::Error;

use vocab_core::error::{AppError, ErrorKind};

use super::Role;

/// A defect in the role or page catalog.
///
/// Every variant is fatal at startup: incorrect authorization data is never
/// silently degraded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The inheritance graph contains a cycle.
    #[error("CyclicRoleGraph: {cycle}")]
    CyclicRoleGraph {
        /// The cycle, rendered as `a -> b -> a`.
        cycle: String,
    },

    /// A role lists itself as a parent.
    #[error("Role '{role}' inherits from itself")]
    SelfInheritance {
        /// The offending role.
        role: Role,
    },

    /// A role inherits from a role the catalog does not define.
    #[error("Role '{role}' inherits from undefined role '{parent}'")]
    UndefinedParent {
        /// The inheriting role.
        role: Role,
        /// The missing parent.
        parent: Role,
    },

    /// A role inherits from a role with a strictly higher level.
    #[error("Role '{role}' (level {level}) inherits from higher role '{parent}' (level {parent_level})")]
    LevelInversion {
        /// The inheriting role.
        role: Role,
        /// Its level.
        level: u32,
        /// The parent role.
        parent: Role,
        /// The parent's level.
        parent_level: u32,
    },

    /// The admin role does not hold the unique maximum level.
    #[error("Admin level {admin_level} must exceed '{rival}' (level {rival_level})")]
    AdminNotMaximal {
        /// Admin's level.
        admin_level: u32,
        /// A role at or above it.
        rival: Role,
        /// That role's level.
        rival_level: u32,
    },

    /// Two page rules share a path.
    #[error("Page '{path}' is declared more than once")]
    DuplicatePage {
        /// The repeated path.
        path: String,
    },

    /// A page path is not absolute.
    #[error("Page path '{path}' must start with '/'")]
    InvalidPagePath {
        /// The rejected path.
        path: String,
    },
}

impl CatalogError {
    /// Render a role cycle for diagnostics.
    pub fn cyclic(path: &[Role]) -> Self {
        let cycle = path
            .iter()
            .map(Role::as_str)
            .collect::<Vec<_>>()
            .join(" -> ");
        Self::CyclicRoleGraph { cycle }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        AppError::with_source(
            ErrorKind::Configuration,
            format!("Invalid permission catalog: {err}"),
            err,
        )
    }
}
