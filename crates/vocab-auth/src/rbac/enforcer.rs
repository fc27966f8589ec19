//! RBAC evaluation: pure authorization queries over a permission set.

use std::sync::Arc;

use vocab_core::config::catalog::CatalogConfig;
use vocab_core::error::AppError;
use vocab_core::result::AppResult;

use crate::catalog::{Catalog, Permission, PermissionSet, Role};
use crate::pages::{PageRegistry, PageRule, UnknownPagePolicy};

use super::policies::RbacPolicies;

/// Whether `required` is granted.
pub fn has_permission(granted: &PermissionSet, required: Permission) -> bool {
    granted.contains(required)
}

/// Whether any of `required` is granted. An empty requirement passes.
pub fn has_any(granted: &PermissionSet, required: impl IntoIterator<Item = Permission>) -> bool {
    let mut required = required.into_iter().peekable();
    required.peek().is_none() || required.any(|p| granted.contains(p))
}

/// Whether every one of `required` is granted. An empty requirement passes.
pub fn has_all(granted: &PermissionSet, required: impl IntoIterator<Item = Permission>) -> bool {
    required.into_iter().all(|p| granted.contains(p))
}

/// Answers authorization questions from the role catalog and page map.
///
/// Every method is a function of its arguments and the static catalogs;
/// a denial is `false`, never an error.
#[derive(Debug, Clone)]
pub struct RbacEnforcer {
    /// The role catalog.
    policies: Arc<RbacPolicies>,
    /// The page map.
    pages: Arc<PageRegistry>,
}

impl RbacEnforcer {
    /// Creates an enforcer over explicit catalogs.
    pub fn new(policies: RbacPolicies, pages: PageRegistry) -> Self {
        Self {
            policies: Arc::new(policies),
            pages: Arc::new(pages),
        }
    }

    /// Creates an enforcer over the built-in catalogs.
    pub fn builtin() -> AppResult<Self> {
        let (policies, pages) = Catalog::builtin().build(UnknownPagePolicy::default())?;
        Ok(Self::new(policies, pages))
    }

    /// Creates an enforcer from the `catalog` configuration section.
    pub fn from_config(config: &CatalogConfig) -> AppResult<Self> {
        let unknown: UnknownPagePolicy = config.unknown_page.parse()?;
        let (policies, pages) = Catalog::from_config(config)?.build(unknown)?;
        Ok(Self::new(policies, pages))
    }

    /// The role catalog.
    pub fn policies(&self) -> &RbacPolicies {
        &self.policies
    }

    /// The page map.
    pub fn pages(&self) -> &PageRegistry {
        &self.pages
    }

    /// Transitive permission closure of a role.
    pub fn resolve_permissions(&self, role: Role) -> PermissionSet {
        self.policies.resolve_permissions(role)
    }

    /// Whether `granted` satisfies the page's requirements.
    ///
    /// Unlisted routes follow the registry's unknown-page policy.
    pub fn can_access_page(&self, granted: &PermissionSet, path: &str) -> bool {
        match self.pages.lookup(path) {
            Some(rule) => has_all(granted, rule.required_permissions.iter().copied()),
            None => self.pages.unknown_policy() == UnknownPagePolicy::Allow,
        }
    }

    /// Pages whose requirements `granted` satisfies, in path order.
    pub fn visible_pages(&self, granted: &PermissionSet) -> Vec<&PageRule> {
        self.pages
            .rules()
            .filter(|rule| has_all(granted, rule.required_permissions.iter().copied()))
            .collect()
    }

    /// Whether role `a` has strictly more authority than role `b`.
    pub fn is_role_higher(&self, a: Role, b: Role) -> bool {
        self.policies.level(a) > self.policies.level(b)
    }

    /// Roles with a strictly lower level than `role`, ordered by level.
    pub fn manageable_roles(&self, role: Role) -> Vec<Role> {
        let level = self.policies.level(role);
        self.policies
            .roles()
            .filter(|other| self.policies.level(*other) < level)
            .collect()
    }

    /// Checks a permission, producing an authorization error on denial.
    pub fn require_permission(
        &self,
        granted: &PermissionSet,
        permission: Permission,
    ) -> Result<(), AppError> {
        if has_permission(granted, permission) {
            Ok(())
        } else {
            Err(AppError::authorization(format!(
                "insufficient permission: '{permission}' required"
            )))
        }
    }

    /// Checks page access, producing an authorization error on denial.
    pub fn require_page(&self, granted: &PermissionSet, path: &str) -> Result<(), AppError> {
        if self.can_access_page(granted, path) {
            Ok(())
        } else {
            Err(AppError::authorization(format!(
                "insufficient permission for page '{path}'"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use vocab_core::error::ErrorKind;

    use super::*;

    fn enforcer() -> RbacEnforcer {
        RbacEnforcer::builtin().unwrap()
    }

    fn set(perms: &[Permission]) -> PermissionSet {
        perms.iter().copied().collect()
    }

    #[test]
    fn test_vacuous_truth_on_empty_requirements() {
        let empty = PermissionSet::new();
        let none: [Permission; 0] = [];
        assert!(has_any(&empty, none));
        assert!(has_all(&empty, none));
    }

    #[test]
    fn test_has_all_implies_has_any() {
        let granted = set(&[Permission::Flashcards, Permission::ViewRanking]);
        let lists: [&[Permission]; 4] = [
            &[Permission::Flashcards],
            &[Permission::Flashcards, Permission::ViewRanking],
            &[Permission::Flashcards, Permission::DevTools],
            &[Permission::DevTools],
        ];
        for list in lists {
            let all = has_all(&granted, list.iter().copied());
            let any = has_any(&granted, list.iter().copied());
            assert!(!all || any);
        }
        assert!(has_any(&granted, [Permission::DevTools, Permission::ViewRanking]));
        assert!(!has_all(&granted, [Permission::DevTools, Permission::ViewRanking]));
    }

    #[test]
    fn test_student_page_access() {
        let e = enforcer();
        let granted = set(&[Permission::WordLearning]);
        assert!(e.can_access_page(&granted, "/word-learning"));
        assert!(!e.can_access_page(&granted, "/admin/dev-index"));
        assert!(e.can_access_page(&granted, "/profile"));
    }

    #[test]
    fn test_unknown_page_follows_policy() {
        let e = enforcer();
        assert!(e.can_access_page(&PermissionSet::new(), "/not-listed"));

        let (policies, pages) = Catalog::builtin().build(UnknownPagePolicy::Deny).unwrap();
        let strict = RbacEnforcer::new(policies, pages);
        assert!(!strict.can_access_page(&PermissionSet::wildcard(), "/not-listed"));
    }

    #[test]
    fn test_multi_permission_page_needs_all() {
        let e = enforcer();
        assert!(!e.can_access_page(&set(&[Permission::ResearchData]), "/research/export"));
        assert!(e.can_access_page(
            &set(&[Permission::ResearchData, Permission::ExportData]),
            "/research/export"
        ));
    }

    #[test]
    fn test_role_ordering_is_strict() {
        let e = enforcer();
        for a in Role::ALL {
            assert!(!e.is_role_higher(a, a));
            for b in Role::ALL {
                if e.policies().level(a) != e.policies().level(b) {
                    assert_ne!(e.is_role_higher(a, b), e.is_role_higher(b, a));
                }
            }
        }
    }

    #[test]
    fn test_admin_manages_everyone_else() {
        let e = enforcer();
        let mut manageable = e.manageable_roles(Role::Admin);
        manageable.sort();
        let mut expected: Vec<Role> = Role::ALL.into_iter().filter(|r| !r.is_admin()).collect();
        expected.sort();
        assert_eq!(manageable, expected);
        assert!(e.manageable_roles(Role::Student).is_empty());
    }

    #[test]
    fn test_visible_pages_for_student() {
        let e = enforcer();
        let student = e.resolve_permissions(Role::Student);
        let paths: Vec<&str> = e
            .visible_pages(&student)
            .into_iter()
            .map(|r| r.path.as_str())
            .collect();
        assert!(paths.contains(&"/flashcards"));
        assert!(paths.contains(&"/"));
        assert!(!paths.contains(&"/admin/users"));
    }

    #[test]
    fn test_require_permission_message() {
        let e = enforcer();
        let err = e
            .require_permission(&PermissionSet::new(), Permission::ManageUsers)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
        assert!(err.message.starts_with("insufficient permission"));
        assert!(e.require_page(&PermissionSet::wildcard(), "/admin/users").is_ok());
    }

    #[test]
    fn test_from_config_rejects_bad_policy() {
        let config = CatalogConfig {
            path: None,
            unknown_page: "sometimes".to_string(),
        };
        assert!(RbacEnforcer::from_config(&config).is_err());
    }
}
