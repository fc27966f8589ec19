//! Page access and role management against the built-in catalog.

use vocab_auth::{Permission, PermissionSet, RbacEnforcer, Role};

use crate::helpers;

#[test]
fn test_student_word_learning_but_not_dev_index() {
    let enforcer = RbacEnforcer::builtin().unwrap();
    let granted = PermissionSet::from_iter([Permission::WordLearning]);

    assert!(enforcer.can_access_page(&granted, "/word-learning"));
    assert!(!enforcer.can_access_page(&granted, "/admin/dev-index"));
}

#[test]
fn test_student_role_closure_matches_direct_grant() {
    let resolver = helpers::resolver();
    let student = helpers::subject("1001");

    assert!(resolver.can_access_page(&student, Role::Student, "/word-learning"));
    assert!(resolver.can_access_page(&student, Role::Student, "/word-learning/"));
    assert!(!resolver.can_access_page(&student, Role::Student, "/admin/dev-index"));
    assert!(resolver.can_access_page(&helpers::subject("1"), Role::Admin, "/admin/dev-index"));
}

#[test]
fn test_admin_manages_every_other_role() {
    let enforcer = RbacEnforcer::builtin().unwrap();
    let manageable = enforcer.manageable_roles(Role::Admin);

    assert_eq!(manageable.len(), Role::ALL.len() - 1);
    assert!(!manageable.contains(&Role::Admin));
    for role in [
        Role::Student,
        Role::Parent,
        Role::Teacher,
        Role::AcademicDirector,
        Role::AcademicSupervisor,
        Role::ResearchLeader,
        Role::ResearchManager,
        Role::Dean,
    ] {
        assert!(manageable.contains(&role), "{role} should be manageable");
        assert!(enforcer.is_role_higher(Role::Admin, role));
    }
}

#[test]
fn test_manageable_roles_are_strictly_lower() {
    let enforcer = RbacEnforcer::builtin().unwrap();
    for role in Role::ALL {
        for lower in enforcer.manageable_roles(role) {
            assert!(enforcer.policies().level(lower) < enforcer.policies().level(role));
        }
    }
}
