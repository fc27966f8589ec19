//! Permission catalog: the closed vocabularies of permissions and roles,
//! and loading of catalog files.

pub mod error;
pub mod file;
pub mod permission;
pub mod role;

pub use error::CatalogError;
pub use file::Catalog;
pub use permission::{Permission, PermissionCategory, PermissionSet};
pub use role::Role;
