//! Role-based access control: role policies and the evaluator.

pub mod enforcer;
pub mod policies;

pub use enforcer::{RbacEnforcer, has_all, has_any, has_permission};
pub use policies::{RbacPolicies, RoleDefinition};
