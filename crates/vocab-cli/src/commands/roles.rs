//! Role catalog listing.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use vocab_auth::{RbacEnforcer, Role};
use vocab_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for `roles`
#[derive(Debug, Args)]
pub struct RolesArgs {
    /// List every resolved permission instead of a count
    #[arg(short, long)]
    pub verbose: bool,
}

/// Role display row
#[derive(Debug, Serialize, Tabled)]
pub struct RoleRow {
    /// Role key
    pub role: String,
    /// Hierarchy level
    pub level: u32,
    /// Display name
    pub name: String,
    /// Directly inherited roles
    pub inherits: String,
    /// Resolved permissions
    pub permissions: String,
}

/// Execute `roles`
pub fn execute(args: &RolesArgs, config_path: &str, format: OutputFormat) -> Result<(), AppError> {
    let enforcer = super::load_enforcer(config_path)?;
    output::print_list(&role_rows(&enforcer, args.verbose), format);
    Ok(())
}

/// One row per role, ordered by level.
pub fn role_rows(enforcer: &RbacEnforcer, verbose: bool) -> Vec<RoleRow> {
    let policies = enforcer.policies();
    policies
        .roles()
        .map(|role| {
            let definition = policies.definition(role);
            let resolved = enforcer.resolve_permissions(role);
            let permissions = if resolved.is_wildcard() {
                "*".to_string()
            } else if verbose {
                resolved
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            } else {
                resolved.len().to_string()
            };

            RoleRow {
                role: role.to_string(),
                level: policies.level(role),
                name: definition
                    .and_then(|d| d.display_name.clone())
                    .unwrap_or_default(),
                inherits: definition
                    .map(|d| join_roles(d.inherits.iter().copied()))
                    .unwrap_or_default(),
                permissions,
            }
        })
        .collect()
}

/// Comma-separated role keys.
pub fn join_roles(roles: impl IntoIterator<Item = Role>) -> String {
    roles
        .into_iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
