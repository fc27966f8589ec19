//! Permission keys and categories.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use vocab_core::error::AppError;

/// Grouping of permissions, used for display and page metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    /// Study features.
    Learning,
    /// Word lists and learning material.
    Content,
    /// Rankings, sharing and classes.
    Social,
    /// Class, student and teacher administration.
    Management,
    /// Platform administration.
    System,
    /// Research and developer tooling.
    Advanced,
}

impl PermissionCategory {
    /// Every category, in display order.
    pub const ALL: [PermissionCategory; 6] = [
        Self::Learning,
        Self::Content,
        Self::Social,
        Self::Management,
        Self::System,
        Self::Advanced,
    ];

    /// The key prefix shared by permissions of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Learning => "learning",
            Self::Content => "content",
            Self::Social => "social",
            Self::Management => "management",
            Self::System => "system",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for PermissionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declares the closed [`Permission`] enumeration with its wire keys.
macro_rules! permissions {
    ($( $(#[$meta:meta])* $variant:ident => ($category:ident, $key:literal) ),+ $(,)?) => {
        /// A capability, serialized as its `"<category>.<action>"` key.
        ///
        /// The set is closed so that a misspelt key fails at load time
        /// instead of silently producing an always-false check.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum Permission {
            $( $(#[$meta])* $variant ),+
        }

        impl Permission {
            /// Every permission in declaration order.
            pub const ALL: &'static [Permission] = &[ $(Permission::$variant),+ ];

            /// The wire key.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Permission::$variant => $key ),+
                }
            }

            /// The category this permission belongs to.
            pub fn category(&self) -> PermissionCategory {
                match self {
                    $( Permission::$variant => PermissionCategory::$category ),+
                }
            }
        }
    };
}

permissions! {
    // Learning
    /// Study new words.
    WordLearning => (Learning, "learning.word_learning"),
    /// Spelling drills.
    SpellingPractice => (Learning, "learning.spelling_practice"),
    /// Flashcard decks.
    Flashcards => (Learning, "learning.flashcards"),
    /// Spaced-repetition review plan.
    ReviewPlan => (Learning, "learning.review_plan"),
    /// Personal learning history.
    LearningRecords => (Learning, "learning.learning_records"),
    /// Study statistics dashboard.
    StudyStats => (Learning, "learning.study_stats"),

    // Content
    /// Browse word lists and material.
    ViewContent => (Content, "content.view_content"),
    /// Author new material.
    CreateContent => (Content, "content.create_content"),
    /// Edit existing material.
    EditContent => (Content, "content.edit_content"),
    /// Remove material.
    DeleteContent => (Content, "content.delete_content"),
    /// Publish material to other users.
    PublishContent => (Content, "content.publish_content"),
    /// Bulk word import.
    ImportWords => (Content, "content.import_words"),

    // Social
    /// Leaderboards.
    ViewRanking => (Social, "social.view_ranking"),
    /// Share progress with others.
    ShareProgress => (Social, "social.share_progress"),
    /// Join a class by code.
    JoinClass => (Social, "social.join_class"),
    /// Message a teacher.
    MessageTeacher => (Social, "social.message_teacher"),

    // Management
    /// Manage students in own classes.
    ManageStudents => (Management, "management.manage_students"),
    /// Create and edit classes.
    ManageClasses => (Management, "management.manage_classes"),
    /// Class-level reports.
    ViewClassReports => (Management, "management.view_class_reports"),
    /// Assign study tasks.
    AssignTasks => (Management, "management.assign_tasks"),
    /// Manage teacher accounts.
    ManageTeachers => (Management, "management.manage_teachers"),
    /// School-wide reports.
    ViewSchoolReports => (Management, "management.view_school_reports"),

    // System
    /// User administration.
    ManageUsers => (System, "system.manage_users"),
    /// Role administration.
    ManageRoles => (System, "system.manage_roles"),
    /// Menu configuration.
    ManageMenus => (System, "system.manage_menus"),
    /// Platform settings.
    SystemSettings => (System, "system.system_settings"),
    /// Operational logs.
    ViewLogs => (System, "system.view_logs"),

    // Advanced
    /// Research datasets.
    ResearchData => (Advanced, "advanced.research_data"),
    /// Data export.
    ExportData => (Advanced, "advanced.export_data"),
    /// AI-assisted tools.
    AiTools => (Advanced, "advanced.ai_tools"),
    /// Developer tooling.
    DevTools => (Advanced, "advanced.dev_tools"),
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AppError::configuration(format!("Unknown permission '{s}'")))
    }
}

impl TryFrom<String> for Permission {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for String {
    fn from(p: Permission) -> Self {
        p.as_str().to_string()
    }
}

/// A resolved set of granted permissions.
///
/// The `wildcard` flag marks the admin role's set, which satisfies every
/// check regardless of its explicit members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    granted: BTreeSet<Permission>,
    #[serde(default)]
    wildcard: bool,
}

impl PermissionSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set that satisfies every permission.
    pub fn wildcard() -> Self {
        Self {
            granted: Permission::ALL.iter().copied().collect(),
            wildcard: true,
        }
    }

    /// Whether `permission` is granted.
    pub fn contains(&self, permission: Permission) -> bool {
        self.wildcard || self.granted.contains(&permission)
    }

    /// Grant one permission.
    pub fn insert(&mut self, permission: Permission) -> bool {
        self.granted.insert(permission)
    }

    /// Merge another set into this one.
    pub fn merge(&mut self, other: &PermissionSet) {
        self.granted.extend(other.granted.iter().copied());
        self.wildcard |= other.wildcard;
    }

    /// Mark the set as a wildcard.
    pub fn set_wildcard(&mut self) {
        self.wildcard = true;
        self.granted.extend(Permission::ALL.iter().copied());
    }

    /// Whether this is a wildcard set.
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Whether every permission of `other` is also granted here.
    pub fn is_superset(&self, other: &PermissionSet) -> bool {
        self.wildcard || (!other.wildcard && self.granted.is_superset(&other.granted))
    }

    /// Iterate the explicitly granted permissions in key order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.granted.iter().copied()
    }

    /// Number of explicitly granted permissions.
    pub fn len(&self) -> usize {
        self.granted.len()
    }

    /// Whether nothing is granted.
    pub fn is_empty(&self) -> bool {
        !self.wildcard && self.granted.is_empty()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self {
            granted: iter.into_iter().collect(),
            wildcard: false,
        }
    }
}

impl Extend<Permission> for PermissionSet {
    fn extend<I: IntoIterator<Item = Permission>>(&mut self, iter: I) {
        self.granted.extend(iter);
    }
}
