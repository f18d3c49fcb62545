//! Menu grant records and grant transfer instructions.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provider name used for role grantees.
pub const ROLE_PROVIDER: &str = "R";

/// Provider name used for user grantees.
pub const USER_PROVIDER: &str = "U";

/// Someone who can receive a grant, identified by provider name and key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grantee {
    /// Grant provider, e.g. "R" for roles or "U" for users.
    pub provider_name: String,
    /// Provider-specific identifier, e.g. a role name or user id.
    pub provider_key: String,
}

impl Grantee {
    pub fn new(provider_name: impl Into<String>, provider_key: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            provider_key: provider_key.into(),
        }
    }

    /// A role grantee.
    pub fn role(name: impl Into<String>) -> Self {
        Self::new(ROLE_PROVIDER, name)
    }

    /// A user grantee.
    pub fn user(id: impl Into<String>) -> Self {
        Self::new(USER_PROVIDER, id)
    }
}

impl fmt::Display for Grantee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider_name, self.provider_key)
    }
}

/// Record that a grantee was given access through a menu.
///
/// Identity is the composite (menu id, provider name, provider key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuGrant {
    pub menu_id: Uuid,
    pub provider_name: String,
    pub provider_key: String,
}

impl MenuGrant {
    pub fn new(menu_id: Uuid, grantee: &Grantee) -> Self {
        Self {
            menu_id,
            provider_name: grantee.provider_name.clone(),
            provider_key: grantee.provider_key.clone(),
        }
    }

    pub fn grantee(&self) -> Grantee {
        Grantee::new(&self.provider_name, &self.provider_key)
    }

    /// Check whether this row belongs to the given grantee.
    pub fn is_for(&self, grantee: &Grantee) -> bool {
        self.provider_name == grantee.provider_name && self.provider_key == grantee.provider_key
    }
}

/// Instruction to move one grantee's permission grant between keys.
///
/// `from` is absent when a binding is added, `to` is absent when it is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantTransfer {
    pub grantee: Grantee,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Authorization-store record: a grantee holds a permission key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Permission key.
    pub name: String,
    pub provider_name: String,
    pub provider_key: String,
}

impl PermissionGrant {
    pub fn new(name: impl Into<String>, grantee: &Grantee) -> Self {
        Self {
            name: name.into(),
            provider_name: grantee.provider_name.clone(),
            provider_key: grantee.provider_key.clone(),
        }
    }

    pub fn is_for(&self, name: &str, grantee: &Grantee) -> bool {
        self.name == name
            && self.provider_name == grantee.provider_name
            && self.provider_key == grantee.provider_key
    }
}
