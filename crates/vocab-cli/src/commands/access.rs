//! Page, permission, and management checks for a role.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use vocab_auth::pages::normalize_path;
use vocab_auth::{Permission, RbacEnforcer, Role};
use vocab_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for `check`
#[derive(Debug, Args)]
#[command(group(clap::ArgGroup::new("target").required(true).args(["path", "permission"])))]
pub struct CheckArgs {
    /// Role to evaluate
    #[arg(short, long)]
    pub role: Role,
    /// Route path to check
    #[arg(short, long)]
    pub path: Option<String>,
    /// Permission key to check
    #[arg(long)]
    pub permission: Option<Permission>,
}

/// Arguments for `manageable`
#[derive(Debug, Args)]
pub struct ManageableArgs {
    /// Managing role
    #[arg(short, long)]
    pub role: Role,
}

/// Outcome of a `check`
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CheckReport {
    /// Evaluated role
    pub role: Role,
    /// Checked path or permission
    pub target: String,
    /// Whether access is granted
    pub allowed: bool,
    /// Whether the page is in the page map
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listed: Option<bool>,
    /// Required permissions the role lacks
    pub missing: Vec<Permission>,
}

/// Managed role display row
#[derive(Debug, Serialize, Tabled)]
pub struct ManagedRow {
    /// Role key
    pub role: String,
    /// Hierarchy level
    pub level: u32,
}

/// Execute `check`
pub fn check(args: &CheckArgs, config_path: &str, format: OutputFormat) -> Result<(), AppError> {
    let enforcer = super::load_enforcer(config_path)?;
    let report = match (&args.path, args.permission) {
        (Some(path), _) => check_page(&enforcer, args.role, path),
        (None, Some(permission)) => check_permission(&enforcer, args.role, permission),
        (None, None) => return Err(AppError::validation("Either --path or --permission is required")),
    };

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            let verb = if report.allowed { "may" } else { "may not" };
            output::print_verdict(
                report.allowed,
                &format!("{} {verb} access {}", report.role, report.target),
            );
            if report.listed == Some(false) {
                output::print_kv("listed", "no (unknown-page policy applied)");
            }
            if !report.missing.is_empty() {
                let missing: Vec<&str> = report.missing.iter().map(|p| p.as_str()).collect();
                output::print_kv("missing", &missing.join(", "));
            }
        }
    }
    Ok(())
}

/// Evaluate page access for a role.
pub fn check_page(enforcer: &RbacEnforcer, role: Role, path: &str) -> CheckReport {
    let granted = enforcer.resolve_permissions(role);
    let rule = enforcer.pages().lookup(path);
    let missing = rule
        .map(|r| {
            r.required_permissions
                .iter()
                .copied()
                .filter(|p| !granted.contains(*p))
                .collect()
        })
        .unwrap_or_default();

    CheckReport {
        role,
        target: normalize_path(path).to_string(),
        allowed: enforcer.can_access_page(&granted, path),
        listed: Some(rule.is_some()),
        missing,
    }
}

/// Evaluate a single permission for a role.
pub fn check_permission(enforcer: &RbacEnforcer, role: Role, permission: Permission) -> CheckReport {
    let granted = enforcer.resolve_permissions(role);
    let allowed = granted.contains(permission);
    CheckReport {
        role,
        target: permission.to_string(),
        allowed,
        listed: None,
        missing: if allowed { Vec::new() } else { vec![permission] },
    }
}

/// Execute `manageable`
pub fn manageable(
    args: &ManageableArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let enforcer = super::load_enforcer(config_path)?;
    output::print_list(&managed_rows(&enforcer, args.role), format);
    Ok(())
}

/// Roles strictly below `role`, ordered by level.
pub fn managed_rows(enforcer: &RbacEnforcer, role: Role) -> Vec<ManagedRow> {
    enforcer
        .manageable_roles(role)
        .into_iter()
        .map(|r| ManagedRow {
            role: r.to_string(),
            level: enforcer.policies().level(r),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_page_reports() {
        let enforcer = RbacEnforcer::builtin().unwrap();

        let allowed = check_page(&enforcer, Role::Student, "/word-learning/");
        assert!(allowed.allowed);
        assert_eq!(allowed.target, "/word-learning");

        let denied = check_page(&enforcer, Role::Student, "/admin/dev-index");
        assert!(!denied.allowed);
        assert_eq!(denied.missing, vec![Permission::DevTools]);

        let unlisted = check_page(&enforcer, Role::Student, "/somewhere-new");
        assert_eq!(unlisted.listed, Some(false));
        assert!(unlisted.allowed);
    }

    #[test]
    fn test_permission_report() {
        let enforcer = RbacEnforcer::builtin().unwrap();
        assert!(check_permission(&enforcer, Role::Admin, Permission::DevTools).allowed);
        let report = check_permission(&enforcer, Role::Parent, Permission::ManageUsers);
        assert_eq!(report.missing, vec![Permission::ManageUsers]);
    }

    #[test]
    fn test_managed_rows() {
        let enforcer = RbacEnforcer::builtin().unwrap();
        assert_eq!(managed_rows(&enforcer, Role::Admin).len(), Role::ALL.len() - 1);
        assert!(managed_rows(&enforcer, Role::Student).is_empty());
        let under_teacher: Vec<String> = managed_rows(&enforcer, Role::Teacher)
            .into_iter()
            .map(|r| r.role)
            .collect();
        assert_eq!(under_teacher, vec!["student", "parent"]);
    }
}
