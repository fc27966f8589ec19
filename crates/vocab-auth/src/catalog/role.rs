//! The closed role enumeration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use vocab_core::error::AppError;

/// A platform role. A user holds exactly one at a time.
///
/// Levels, permissions and inheritance are catalog data held by
/// [`RbacPolicies`](crate::rbac::RbacPolicies), not properties of the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    /// A learner.
    Student,
    /// A learner's guardian.
    Parent,
    /// Runs classes.
    Teacher,
    /// Oversees teachers.
    AcademicSupervisor,
    /// Leads academic affairs.
    AcademicDirector,
    /// Runs research projects.
    ResearchManager,
    /// Leads research.
    ResearchLeader,
    /// Heads the school.
    Dean,
    /// Platform administrator.
    Admin,
}

impl Role {
    /// Every role.
    pub const ALL: [Role; 9] = [
        Self::Student,
        Self::Parent,
        Self::Teacher,
        Self::AcademicSupervisor,
        Self::AcademicDirector,
        Self::ResearchManager,
        Self::ResearchLeader,
        Self::Dean,
        Self::Admin,
    ];

    /// The wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Parent => "parent",
            Self::Teacher => "teacher",
            Self::AcademicSupervisor => "academic_supervisor",
            Self::AcademicDirector => "academic_director",
            Self::ResearchManager => "research_manager",
            Self::ResearchLeader => "research_leader",
            Self::Dean => "dean",
            Self::Admin => "admin",
        }
    }

    /// Whether this is the administrator role.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("Unknown role '{s}'")))
    }
}

impl TryFrom<String> for Role {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_roles() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&Role::AcademicSupervisor).unwrap();
        assert_eq!(json, "\"academic_supervisor\"");
        let role: Role = serde_json::from_str("\"research_leader\"").unwrap();
        assert_eq!(role, Role::ResearchLeader);
    }
}
