//! Permission registry and authorization checks.
//!
//! The registry is the read-only permission definition manager: it knows
//! every permission (including child permissions) by name. Authorization of
//! the caller is delegated to an [`AuthorizationService`].

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{MenuError, MenuResult};
use crate::models::{DisplayName, PermissionDefinition, PermissionGroup};

/// Policy names guarding menu operations.
pub mod menu_policies {
    /// Group the menu permissions are defined in.
    pub const GROUP: &str = "MenuManagement";

    /// List and read menus.
    pub const DEFAULT: &str = "MenuManagement.Menus";

    pub const CREATE: &str = "MenuManagement.Menus.Create";

    pub const UPDATE: &str = "MenuManagement.Menus.Update";

    pub const DELETE: &str = "MenuManagement.Menus.Delete";
}

/// Permission group declaring the menu policies themselves.
pub fn menu_management_group() -> PermissionGroup {
    let menus = PermissionDefinition::new(
        menu_policies::DEFAULT,
        DisplayName::localizable(menu_policies::GROUP, "Permission:Menus"),
    )
    .with_child(PermissionDefinition::new(
        menu_policies::CREATE,
        DisplayName::localizable(menu_policies::GROUP, "Permission:Create"),
    ))
    .with_child(PermissionDefinition::new(
        menu_policies::UPDATE,
        DisplayName::localizable(menu_policies::GROUP, "Permission:Edit"),
    ))
    .with_child(PermissionDefinition::new(
        menu_policies::DELETE,
        DisplayName::localizable(menu_policies::GROUP, "Permission:Delete"),
    ));

    PermissionGroup {
        name: menu_policies::GROUP.to_string(),
        display_name: Some(DisplayName::localizable(
            menu_policies::GROUP,
            "Permission:MenuManagement",
        )),
        permissions: vec![menus],
    }
}

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    groups: Vec<PermissionGroup>,
}

/// Read-only registry of permission definitions.
#[derive(Debug, Clone, Default)]
pub struct PermissionRegistry {
    groups: Vec<PermissionGroup>,
    /// Every permission and child permission, by name.
    by_name: HashMap<String, PermissionDefinition>,
}

impl PermissionRegistry {
    /// Build a registry, rejecting duplicate permission names.
    pub fn from_groups(groups: Vec<PermissionGroup>) -> MenuResult<Self> {
        let mut by_name = HashMap::new();

        for group in &groups {
            let mut pending: Vec<&PermissionDefinition> = group.permissions.iter().collect();
            while let Some(def) = pending.pop() {
                if by_name.insert(def.name.clone(), def.clone()).is_some() {
                    return Err(MenuError::DuplicatePermission {
                        name: def.name.clone(),
                    });
                }
                pending.extend(def.children.iter());
            }
        }

        debug!(
            groups = groups.len(),
            permissions = by_name.len(),
            "permission registry built"
        );

        Ok(Self { groups, by_name })
    }

    /// Parse a TOML document of `[[groups]]`.
    pub fn from_toml_str(source: &str) -> MenuResult<Self> {
        let doc: RegistryDocument = toml::from_str(source)?;
        Self::from_groups(doc.groups)
    }

    /// Load a registry file and prepend the built-in menu management group.
    ///
    /// A missing file yields only the built-in group.
    pub async fn load(path: &Path) -> MenuResult<Self> {
        let mut groups = vec![menu_management_group()];

        if tokio::fs::try_exists(path)
            .await
            .with_context(|| format!("failed to stat {}", path.display()))?
        {
            let source = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let doc: RegistryDocument = toml::from_str(&source).inspect_err(|e| {
                warn!(path = %path.display(), error = %e, "permission registry is malformed");
            })?;
            groups.extend(doc.groups);
        } else {
            debug!(path = %path.display(), "no permission registry file, using built-ins");
        }

        Self::from_groups(groups)
    }

    /// All groups in definition order.
    pub fn groups(&self) -> &[PermissionGroup] {
        &self.groups
    }

    /// Look up a permission or child permission by name.
    pub fn get(&self, name: &str) -> Option<&PermissionDefinition> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Number of permissions, children included.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Decides whether the current caller holds a policy.
#[async_trait]
pub trait AuthorizationService: Send + Sync {
    async fn is_granted(&self, policy: &str) -> anyhow::Result<bool>;
}

/// Fixed set of granted policies.
#[derive(Debug, Clone, Default)]
pub struct GrantedPolicies {
    policies: HashSet<String>,
    allow_all: bool,
}

impl GrantedPolicies {
    pub fn new<I, S>(policies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            policies: policies.into_iter().map(Into::into).collect(),
            allow_all: false,
        }
    }

    /// Grant every policy. Used by the operator CLI.
    pub fn allow_all() -> Self {
        Self {
            policies: HashSet::new(),
            allow_all: true,
        }
    }
}

#[async_trait]
impl AuthorizationService for GrantedPolicies {
    async fn is_granted(&self, policy: &str) -> anyhow::Result<bool> {
        Ok(self.allow_all || self.policies.contains(policy))
    }
}

/// Fail with `Forbidden` unless the policy is granted.
pub async fn ensure_granted(auth: &dyn AuthorizationService, policy: &str) -> MenuResult<()> {
    if auth.is_granted(policy).await? {
        Ok(())
    } else {
        Err(MenuError::Forbidden {
            policy: policy.to_string(),
        })
    }
}
