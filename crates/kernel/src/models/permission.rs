//! Permission definitions and the policy view assembled from them.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

bitflags! {
    /// Which side of a multi-tenant deployment a permission applies to.
    ///
    /// Serialized by flag name, e.g. `"HOST"` or `"TENANT | HOST"`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct TenancySide: u8 {
        /// Guest tenants.
        const TENANT = 0b01;
        /// The host/owner tenant.
        const HOST   = 0b10;
        /// Both sides.
        const BOTH   = Self::TENANT.bits() | Self::HOST.bits();
    }
}

impl TenancySide {
    /// Side of the current request: tenant when a tenant is in scope, host otherwise.
    pub fn for_tenant(tenant_id: Option<Uuid>) -> Self {
        if tenant_id.is_some() {
            TenancySide::TENANT
        } else {
            TenancySide::HOST
        }
    }
}

impl Default for TenancySide {
    fn default() -> Self {
        TenancySide::BOTH
    }
}

/// Display name of a permission: literal text or a localization lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayName {
    Fixed(String),
    Localizable { resource: String, key: String },
}

impl DisplayName {
    pub fn fixed(text: impl Into<String>) -> Self {
        DisplayName::Fixed(text.into())
    }

    pub fn localizable(resource: impl Into<String>, key: impl Into<String>) -> Self {
        DisplayName::Localizable {
            resource: resource.into(),
            key: key.into(),
        }
    }
}

/// A permission and its child permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    pub name: String,
    pub display_name: DisplayName,
    #[serde(default)]
    pub multi_tenancy_side: TenancySide,
    #[serde(default)]
    pub children: Vec<PermissionDefinition>,
}

impl PermissionDefinition {
    pub fn new(name: impl Into<String>, display_name: DisplayName) -> Self {
        Self {
            name: name.into(),
            display_name,
            multi_tenancy_side: TenancySide::BOTH,
            children: Vec::new(),
        }
    }

    pub fn with_side(mut self, side: TenancySide) -> Self {
        self.multi_tenancy_side = side;
        self
    }

    pub fn with_child(mut self, child: PermissionDefinition) -> Self {
        self.children.push(child);
        self
    }

    /// Whether this permission is available on the given side.
    pub fn applies_to(&self, side: TenancySide) -> bool {
        self.multi_tenancy_side.contains(side)
    }
}

/// A named group of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<DisplayName>,
    #[serde(default)]
    pub permissions: Vec<PermissionDefinition>,
}

/// One entry of the policy tree handed to the menu editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyNode {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub children: Vec<PolicyNode>,
}

impl PolicyNode {
    pub fn leaf(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            children: Vec::new(),
        }
    }
}
