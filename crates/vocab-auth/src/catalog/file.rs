//! Catalog sources: the built-in catalog or a TOML/JSON file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use vocab_core::config::catalog::CatalogConfig;
use vocab_core::result::AppResult;

use crate::pages::{PageRegistry, PageRule, UnknownPagePolicy, default_page_rules};
use crate::rbac::policies::{RbacPolicies, RoleDefinition, default_role_definitions};

use super::Role;

/// Raw catalog data, validated when turned into policies and a page map.
///
/// ```toml
/// [roles.student]
/// level = 10
/// permissions = ["learning.word_learning"]
///
/// [roles.teacher]
/// level = 20
/// inherits = ["student"]
///
/// [[pages]]
/// path = "/word-learning"
/// required_permissions = ["learning.word_learning"]
/// category = "learning"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Role definitions keyed by role.
    pub roles: BTreeMap<Role, RoleDefinition>,
    /// Page rules. The built-in page map is used when absent.
    #[serde(default)]
    pub pages: Option<Vec<PageRule>>,
}

impl Catalog {
    /// The catalog compiled into the client.
    pub fn builtin() -> Self {
        Self {
            roles: default_role_definitions(),
            pages: Some(default_page_rules()),
        }
    }

    /// Read a catalog file. The format follows the file extension.
    pub fn load(path: &str) -> AppResult<Self> {
        let raw = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;
        let catalog: Self = raw.try_deserialize()?;

        info!(
            path,
            roles = catalog.roles.len(),
            pages = catalog.pages.as_ref().map(Vec::len),
            "Loaded permission catalog"
        );
        Ok(catalog)
    }

    /// The configured catalog: the file at `catalog.path`, or the built-in one.
    pub fn from_config(config: &CatalogConfig) -> AppResult<Self> {
        match &config.path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    /// Validate and split into role policies and a page map.
    pub fn build(self, unknown: UnknownPagePolicy) -> AppResult<(RbacPolicies, PageRegistry)> {
        let policies = RbacPolicies::from_definitions(self.roles)?;
        let pages = match self.pages {
            Some(rules) => PageRegistry::new(rules, unknown)?,
            None => PageRegistry::builtin().with_unknown_policy(unknown),
        };
        Ok((policies, pages))
    }
}
