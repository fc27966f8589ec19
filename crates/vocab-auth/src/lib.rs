//! # vocab-auth
//!
//! Role-based access control for the vocabulary-learning client.
//!
//! ## Modules
//!
//! - `catalog`: closed permission and role enumerations, catalog files
//! - `rbac`: role policies with inheritance, and the pure evaluator
//! - `pages`: route path to required-permission table
//! - `resolver`: evaluator results memoised in the permission cache
//! - `guard`: navigation guard and token inspection
//! - `backend`: authoritative user lookup over HTTP

pub mod backend;
pub mod catalog;
pub mod guard;
pub mod pages;
pub mod rbac;
pub mod resolver;

pub use backend::{AuthBackend, HttpBackend, UserInfo};
pub use catalog::{Permission, PermissionCategory, PermissionSet, Role};
pub use guard::{GuardDecision, NavigationRequest, RedirectReason, RouteGuard};
pub use pages::{PageRegistry, PageRule, UnknownPagePolicy};
pub use rbac::{RbacEnforcer, RbacPolicies, RoleDefinition};
pub use resolver::PermissionResolver;
