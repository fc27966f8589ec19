//! Role definitions, inheritance validation and permission resolution.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{CatalogError, Permission, PermissionSet, Role};

/// One role's catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Hierarchy level; higher means more authority.
    pub level: u32,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Directly assigned permissions.
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
    /// Roles whose permissions this role subsumes.
    #[serde(default)]
    pub inherits: BTreeSet<Role>,
}

impl RoleDefinition {
    fn new(
        level: u32,
        display_name: &str,
        permissions: impl IntoIterator<Item = Permission>,
        inherits: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            level,
            display_name: Some(display_name.to_string()),
            permissions: permissions.into_iter().collect(),
            inherits: inherits.into_iter().collect(),
        }
    }
}

/// Validated role catalog with every role's permission closure memoised.
#[derive(Debug, Clone)]
pub struct RbacPolicies {
    /// Role → definition.
    definitions: BTreeMap<Role, RoleDefinition>,
    /// Role → transitive permission closure.
    resolved: HashMap<Role, PermissionSet>,
}

impl RbacPolicies {
    /// Validates the definitions and resolves every role's permissions.
    pub fn from_definitions(
        definitions: BTreeMap<Role, RoleDefinition>,
    ) -> Result<Self, CatalogError> {
        validate(&definitions)?;

        let mut resolved = HashMap::with_capacity(definitions.len());
        for role in definitions.keys() {
            resolved.insert(*role, resolve_closure(&definitions, *role)?);
        }

        debug!(roles = definitions.len(), "Resolved role permissions");
        Ok(Self {
            definitions,
            resolved,
        })
    }

    /// The built-in catalog.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_definitions(default_role_definitions())
    }

    /// The role's level. Roles the catalog does not define are level 0.
    pub fn level(&self, role: Role) -> u32 {
        self.definitions.get(&role).map(|d| d.level).unwrap_or(0)
    }

    /// The role's catalog entry.
    pub fn definition(&self, role: Role) -> Option<&RoleDefinition> {
        self.definitions.get(&role)
    }

    /// Defined roles, ordered by level then name.
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        let mut roles: Vec<Role> = self.definitions.keys().copied().collect();
        roles.sort_by_key(|r| (self.level(*r), r.as_str()));
        roles.into_iter()
    }

    /// Own permissions plus those of every inherited role, transitively.
    ///
    /// Undefined roles resolve to the empty set.
    pub fn resolve_permissions(&self, role: Role) -> PermissionSet {
        self.resolved.get(&role).cloned().unwrap_or_default()
    }
}

/// Checks the structural rules of a role catalog.
///
/// - every inherited role is defined, and no role inherits itself
/// - the inheritance graph is acyclic
/// - no role inherits from a role with a strictly higher level
/// - admin, when defined, holds the unique maximum level
pub fn validate(definitions: &BTreeMap<Role, RoleDefinition>) -> Result<(), CatalogError> {
    for (role, def) in definitions {
        for parent in &def.inherits {
            if parent == role {
                return Err(CatalogError::SelfInheritance { role: *role });
            }
            if !definitions.contains_key(parent) {
                return Err(CatalogError::UndefinedParent {
                    role: *role,
                    parent: *parent,
                });
            }
        }
    }

    if let Some(cycle) = find_cycle(definitions, definitions.keys().copied()) {
        return Err(CatalogError::cyclic(&cycle));
    }

    for (role, def) in definitions {
        for parent in &def.inherits {
            let parent_level = definitions.get(parent).map(|d| d.level).unwrap_or(0);
            if parent_level > def.level {
                return Err(CatalogError::LevelInversion {
                    role: *role,
                    level: def.level,
                    parent: *parent,
                    parent_level,
                });
            }
        }
    }

    if let Some(admin) = definitions.get(&Role::Admin) {
        let rival = definitions
            .iter()
            .filter(|(role, _)| !role.is_admin())
            .find(|(_, def)| def.level >= admin.level);
        if let Some((rival, def)) = rival {
            return Err(CatalogError::AdminNotMaximal {
                admin_level: admin.level,
                rival: *rival,
                rival_level: def.level,
            });
        }
    }

    Ok(())
}

/// Resolves one role's permission closure without relying on prior validation.
///
/// Walks the inheritance graph depth-first with an explicit stack and a
/// visited set; a cycle reachable from `role` is reported instead of looping.
/// The admin role's closure carries the wildcard.
pub fn resolve_closure(
    definitions: &BTreeMap<Role, RoleDefinition>,
    role: Role,
) -> Result<PermissionSet, CatalogError> {
    if let Some(cycle) = find_cycle(definitions, [role]) {
        return Err(CatalogError::cyclic(&cycle));
    }

    let mut closure = PermissionSet::new();
    let mut visited = HashSet::new();
    let mut stack = vec![role];
    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        if current.is_admin() {
            closure.set_wildcard();
        }
        if let Some(def) = definitions.get(&current) {
            closure.extend(def.permissions.iter().copied());
            stack.extend(def.inherits.iter().copied());
        }
    }
    Ok(closure)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnPath,
    Done,
}

/// Iterative three-colour DFS. Returns the first cycle found, closed with
/// its starting role (`[a, b, a]`).
fn find_cycle(
    definitions: &BTreeMap<Role, RoleDefinition>,
    starts: impl IntoIterator<Item = Role>,
) -> Option<Vec<Role>> {
    let parents = |role: Role| -> std::vec::IntoIter<Role> {
        definitions
            .get(&role)
            .map(|d| d.inherits.iter().copied().collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter()
    };

    let mut marks: HashMap<Role, Mark> = HashMap::new();
    for start in starts {
        if marks.contains_key(&start) {
            continue;
        }
        marks.insert(start, Mark::OnPath);
        let mut path = vec![start];
        let mut frames = vec![parents(start)];

        while let Some(frame) = frames.last_mut() {
            match frame.next() {
                Some(next) => match marks.get(&next) {
                    Some(Mark::OnPath) => {
                        let from = path.iter().position(|r| *r == next).unwrap_or(0);
                        let mut cycle = path[from..].to_vec();
                        cycle.push(next);
                        return Some(cycle);
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(next, Mark::OnPath);
                        path.push(next);
                        frames.push(parents(next));
                    }
                },
                None => {
                    frames.pop();
                    if let Some(done) = path.pop() {
                        marks.insert(done, Mark::Done);
                    }
                }
            }
        }
    }
    None
}

/// The built-in role catalog.
pub fn default_role_definitions() -> BTreeMap<Role, RoleDefinition> {
    use Permission::*;

    let mut roles = BTreeMap::new();

    roles.insert(
        Role::Student,
        RoleDefinition::new(
            10,
            "Student",
            [
                WordLearning,
                SpellingPractice,
                Flashcards,
                ReviewPlan,
                LearningRecords,
                StudyStats,
                ViewContent,
                ViewRanking,
                ShareProgress,
                JoinClass,
            ],
            [],
        ),
    );

    roles.insert(
        Role::Parent,
        RoleDefinition::new(
            15,
            "Parent",
            [
                LearningRecords,
                StudyStats,
                ViewContent,
                ViewRanking,
                MessageTeacher,
            ],
            [],
        ),
    );

    roles.insert(
        Role::Teacher,
        RoleDefinition::new(
            20,
            "Teacher",
            [
                CreateContent,
                EditContent,
                ImportWords,
                MessageTeacher,
                ManageStudents,
                ManageClasses,
                ViewClassReports,
                AssignTasks,
                AiTools,
            ],
            [Role::Student],
        ),
    );

    roles.insert(
        Role::AcademicSupervisor,
        RoleDefinition::new(
            30,
            "Academic supervisor",
            [ViewSchoolReports, PublishContent],
            [Role::Teacher],
        ),
    );

    roles.insert(
        Role::ResearchManager,
        RoleDefinition::new(
            35,
            "Research manager",
            [ResearchData, PublishContent],
            [Role::Teacher],
        ),
    );

    roles.insert(
        Role::AcademicDirector,
        RoleDefinition::new(
            40,
            "Academic director",
            [ManageTeachers, DeleteContent, ExportData],
            [Role::AcademicSupervisor],
        ),
    );

    roles.insert(
        Role::ResearchLeader,
        RoleDefinition::new(
            45,
            "Research leader",
            [ExportData, ViewSchoolReports],
            [Role::ResearchManager],
        ),
    );

    roles.insert(
        Role::Dean,
        RoleDefinition::new(
            50,
            "Dean",
            [ManageUsers, ViewLogs],
            [Role::AcademicDirector, Role::ResearchLeader],
        ),
    );

    roles.insert(
        Role::Admin,
        RoleDefinition::new(
            100,
            "Administrator",
            [ManageRoles, ManageMenus, SystemSettings, DevTools],
            [Role::Dean, Role::Parent],
        ),
    );

    roles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(level: u32, inherits: &[Role]) -> RoleDefinition {
        RoleDefinition {
            level,
            display_name: None,
            permissions: BTreeSet::new(),
            inherits: inherits.iter().copied().collect(),
        }
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let policies = RbacPolicies::builtin().unwrap();
        assert_eq!(policies.level(Role::Admin), 100);
        assert_eq!(policies.roles().next(), Some(Role::Student));
        assert_eq!(policies.roles().last(), Some(Role::Admin));
    }

    #[test]
    fn test_inheritance_is_monotonic() {
        let policies = RbacPolicies::builtin().unwrap();
        for role in Role::ALL {
            let own = policies.resolve_permissions(role);
            let def = policies.definition(role).unwrap();
            for parent in &def.inherits {
                assert!(
                    own.is_superset(&policies.resolve_permissions(*parent)),
                    "{role} must include everything {parent} has"
                );
            }
        }
    }

    #[test]
    fn test_transitive_resolution() {
        let policies = RbacPolicies::builtin().unwrap();
        let dean = policies.resolve_permissions(Role::Dean);
        assert!(dean.contains(Permission::WordLearning));
        assert!(dean.contains(Permission::ResearchData));
        assert!(dean.contains(Permission::ManageTeachers));
        assert!(!dean.contains(Permission::DevTools));
        assert!(!dean.is_wildcard());
    }

    #[test]
    fn test_admin_is_wildcard() {
        let policies = RbacPolicies::builtin().unwrap();
        assert!(policies.resolve_permissions(Role::Admin).is_wildcard());
    }

    #[test]
    fn test_undefined_role_resolves_empty() {
        let mut defs = BTreeMap::new();
        defs.insert(Role::Student, def(10, &[]));
        let policies = RbacPolicies::from_definitions(defs).unwrap();
        assert!(policies.resolve_permissions(Role::Teacher).is_empty());
        assert_eq!(policies.level(Role::Teacher), 0);
    }

    #[test]
    fn test_cycle_detected() {
        let mut defs = BTreeMap::new();
        defs.insert(Role::Student, def(10, &[Role::Parent]));
        defs.insert(Role::Parent, def(10, &[Role::Teacher]));
        defs.insert(Role::Teacher, def(10, &[Role::Student]));

        let err = RbacPolicies::from_definitions(defs.clone()).unwrap_err();
        assert!(matches!(err, CatalogError::CyclicRoleGraph { .. }));
        assert!(err.to_string().contains("student -> parent -> teacher -> student"));

        assert!(resolve_closure(&defs, Role::Teacher).is_err());
    }

    #[test]
    fn test_self_inheritance_rejected() {
        let mut defs = BTreeMap::new();
        defs.insert(Role::Student, def(10, &[Role::Student]));
        assert_eq!(
            validate(&defs),
            Err(CatalogError::SelfInheritance {
                role: Role::Student
            })
        );
    }

    #[test]
    fn test_undefined_parent_rejected() {
        let mut defs = BTreeMap::new();
        defs.insert(Role::Teacher, def(20, &[Role::Student]));
        assert!(matches!(
            validate(&defs),
            Err(CatalogError::UndefinedParent { .. })
        ));
    }

    #[test]
    fn test_level_inversion_rejected() {
        let mut defs = BTreeMap::new();
        defs.insert(Role::Student, def(10, &[Role::Teacher]));
        defs.insert(Role::Teacher, def(20, &[]));
        assert!(matches!(
            validate(&defs),
            Err(CatalogError::LevelInversion { .. })
        ));
    }

    #[test]
    fn test_admin_must_be_unique_maximum() {
        let mut defs = BTreeMap::new();
        defs.insert(Role::Admin, def(50, &[]));
        defs.insert(Role::Dean, def(50, &[]));
        assert!(matches!(
            validate(&defs),
            Err(CatalogError::AdminNotMaximal { .. })
        ));
    }

    #[test]
    fn test_diamond_inheritance_resolves_once() {
        let mut defs = BTreeMap::new();
        let mut student = def(10, &[]);
        student.permissions.insert(Permission::Flashcards);
        defs.insert(Role::Student, student);
        defs.insert(Role::Teacher, def(20, &[Role::Student]));
        defs.insert(Role::Parent, def(20, &[Role::Student]));
        defs.insert(Role::Dean, def(30, &[Role::Teacher, Role::Parent]));

        let closure = resolve_closure(&defs, Role::Dean).unwrap();
        assert_eq!(closure.len(), 1);
        assert!(closure.contains(Permission::Flashcards));
    }
}
