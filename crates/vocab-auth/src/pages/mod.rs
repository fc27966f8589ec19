//! Route path → required-permission table.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use vocab_core::error::AppError;

use crate::catalog::{CatalogError, Permission, PermissionCategory};

/// Requirements of one navigable route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRule {
    /// Absolute route path.
    pub path: String,
    /// Display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Permissions that must all be held. Empty means public.
    #[serde(default)]
    pub required_permissions: BTreeSet<Permission>,
    /// Grouping for display.
    #[serde(default)]
    pub category: Option<PermissionCategory>,
    /// Whether a signed-in user is required.
    #[serde(default = "default_requires_auth")]
    pub requires_auth: bool,
}

fn default_requires_auth() -> bool {
    true
}

impl PageRule {
    /// A page anyone may open, signed in or not.
    pub fn open(path: &str, title: &str) -> Self {
        Self {
            path: path.to_string(),
            title: Some(title.to_string()),
            required_permissions: BTreeSet::new(),
            category: None,
            requires_auth: false,
        }
    }

    /// A page any signed-in user may open.
    pub fn signed_in(path: &str, title: &str) -> Self {
        Self {
            requires_auth: true,
            ..Self::open(path, title)
        }
    }

    /// A signed-in page that needs every listed permission.
    ///
    /// The category is taken from the first permission.
    pub fn protected(path: &str, title: &str, required: &[Permission]) -> Self {
        Self {
            required_permissions: required.iter().copied().collect(),
            category: required.first().map(Permission::category),
            ..Self::signed_in(path, title)
        }
    }

    /// Whether the page has no permission requirements.
    pub fn is_public(&self) -> bool {
        self.required_permissions.is_empty()
    }
}

/// Decision for routes missing from the page map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPagePolicy {
    /// Unlisted routes are treated as public.
    #[default]
    Allow,
    /// Unlisted routes are refused.
    Deny,
}

impl FromStr for UnknownPagePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            other => Err(AppError::configuration(format!(
                "Unknown page policy '{other}', expected 'allow' or 'deny'"
            ))),
        }
    }
}

impl fmt::Display for UnknownPagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny => write!(f, "deny"),
        }
    }
}

/// Lookup table of page rules keyed by normalized path.
#[derive(Debug, Clone)]
pub struct PageRegistry {
    rules: BTreeMap<String, PageRule>,
    unknown_policy: UnknownPagePolicy,
}

impl PageRegistry {
    /// Builds a registry, rejecting duplicate or relative paths.
    pub fn new(rules: Vec<PageRule>, unknown_policy: UnknownPagePolicy) -> Result<Self, CatalogError> {
        let mut map = BTreeMap::new();
        for mut rule in rules {
            if !rule.path.starts_with('/') {
                return Err(CatalogError::InvalidPagePath { path: rule.path });
            }
            let normalized = normalize_path(&rule.path).to_string();
            if map.contains_key(&normalized) {
                return Err(CatalogError::DuplicatePage { path: normalized });
            }
            rule.path.clone_from(&normalized);
            map.insert(normalized, rule);
        }
        Ok(Self {
            rules: map,
            unknown_policy,
        })
    }

    /// The built-in page map with the default unknown-page policy.
    pub fn builtin() -> Self {
        let rules = default_page_rules()
            .into_iter()
            .map(|rule| (rule.path.clone(), rule))
            .collect();
        Self {
            rules,
            unknown_policy: UnknownPagePolicy::default(),
        }
    }

    /// Replace the unknown-page policy.
    pub fn with_unknown_policy(mut self, policy: UnknownPagePolicy) -> Self {
        self.unknown_policy = policy;
        self
    }

    /// The rule for a route, ignoring query string, fragment and trailing slash.
    pub fn lookup(&self, path: &str) -> Option<&PageRule> {
        self.rules.get(normalize_path(path))
    }

    /// Decision for routes with no rule.
    pub fn unknown_policy(&self) -> UnknownPagePolicy {
        self.unknown_policy
    }

    /// All rules in path order.
    pub fn rules(&self) -> impl Iterator<Item = &PageRule> {
        self.rules.values()
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Strip query string and fragment, and any trailing slash except on `/`.
pub fn normalize_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// The built-in page map.
pub fn default_page_rules() -> Vec<PageRule> {
    use Permission::*;

    vec![
        PageRule::open("/", "Home"),
        PageRule::open("/login", "Sign in"),
        PageRule::open("/register", "Register"),
        PageRule::open("/error", "Error"),
        PageRule::signed_in("/profile", "Profile"),
        // Learning
        PageRule::protected("/word-learning", "Word learning", &[WordLearning]),
        PageRule::protected("/spelling", "Spelling practice", &[SpellingPractice]),
        PageRule::protected("/flashcards", "Flashcards", &[Flashcards]),
        PageRule::protected("/review-plan", "Review plan", &[ReviewPlan]),
        PageRule::protected("/learning-records", "Learning records", &[LearningRecords]),
        PageRule::protected("/study-stats", "Study statistics", &[StudyStats]),
        // Content
        PageRule::protected("/content/words", "Word lists", &[ViewContent]),
        PageRule::protected("/content/editor", "Content editor", &[EditContent]),
        PageRule::protected("/content/import", "Import words", &[ImportWords]),
        // Social
        PageRule::protected("/ranking", "Ranking", &[ViewRanking]),
        PageRule::protected("/classes/join", "Join a class", &[JoinClass]),
        // Management
        PageRule::protected("/teacher/students", "Students", &[ManageStudents]),
        PageRule::protected("/teacher/classes", "Classes", &[ManageClasses]),
        PageRule::protected("/teacher/reports", "Class reports", &[ViewClassReports]),
        PageRule::protected("/teacher/tasks", "Tasks", &[AssignTasks]),
        PageRule::protected("/academic/teachers", "Teachers", &[ManageTeachers]),
        PageRule::protected("/academic/reports", "School reports", &[ViewSchoolReports]),
        // System
        PageRule::protected("/admin/users", "Users", &[ManageUsers]),
        PageRule::protected("/admin/roles", "Roles", &[ManageRoles]),
        PageRule::protected("/admin/menus", "Menus", &[ManageMenus]),
        PageRule::protected("/admin/settings", "Settings", &[SystemSettings]),
        PageRule::protected("/admin/logs", "Logs", &[ViewLogs]),
        PageRule::protected("/admin/dev-index", "Developer index", &[DevTools]),
        // Advanced
        PageRule::protected("/research/data", "Research data", &[ResearchData]),
        PageRule::protected(
            "/research/export",
            "Research export",
            &[ResearchData, ExportData],
        ),
        PageRule::protected("/ai-tools", "AI tools", &[AiTools]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules_are_valid() {
        let registry = PageRegistry::new(default_page_rules(), UnknownPagePolicy::Allow).unwrap();
        assert_eq!(registry.len(), PageRegistry::builtin().len());
    }

    #[test]
    fn test_lookup_normalizes() {
        let registry = PageRegistry::builtin();
        assert!(registry.lookup("/word-learning/").is_some());
        assert!(registry.lookup("/word-learning?tab=new#top").is_some());
        assert_eq!(registry.lookup("").map(|r| r.path.as_str()), Some("/"));
        assert!(registry.lookup("/nowhere").is_none());
    }

    #[test]
    fn test_protected_page_shape() {
        let registry = PageRegistry::builtin();
        let rule = registry.lookup("/admin/dev-index").unwrap();
        assert!(rule.requires_auth);
        assert_eq!(rule.category, Some(PermissionCategory::Advanced));
        assert!(rule.required_permissions.contains(&Permission::DevTools));

        let login = registry.lookup("/login").unwrap();
        assert!(!login.requires_auth);
        assert!(login.is_public());
    }

    #[test]
    fn test_duplicates_and_relative_paths_rejected() {
        let dup = vec![
            PageRule::open("/a", "A"),
            PageRule::open("/a/", "A again"),
        ];
        assert!(matches!(
            PageRegistry::new(dup, UnknownPagePolicy::Allow),
            Err(CatalogError::DuplicatePage { .. })
        ));
        assert!(matches!(
            PageRegistry::new(vec![PageRule::open("a", "A")], UnknownPagePolicy::Allow),
            Err(CatalogError::InvalidPagePath { .. })
        ));
    }

    #[test]
    fn test_unknown_policy_parse() {
        assert_eq!("deny".parse::<UnknownPagePolicy>().unwrap(), UnknownPagePolicy::Deny);
        assert_eq!(" Allow ".parse::<UnknownPagePolicy>().unwrap(), UnknownPagePolicy::Allow);
        assert!("maybe".parse::<UnknownPagePolicy>().is_err());
    }

    #[test]
    fn test_rule_deserializes_with_defaults() {
        let rule: PageRule = serde_json::from_str(
            r#"{"path": "/x", "required_permissions": ["social.view_ranking"]}"#,
        )
        .unwrap();
        assert!(rule.requires_auth);
        assert_eq!(rule.category, None);
    }
}
