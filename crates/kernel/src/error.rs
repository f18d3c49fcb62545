//! Menu management error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by menu operations.
///
/// Validation variants are user-facing and must not be retried; `Storage`
/// wraps failures from the persistence or grant-store collaborators.
#[derive(Debug, Error)]
pub enum MenuError {
    /// The permission key is not defined in the permission registry.
    #[error("unknown permission: '{key}'")]
    UnknownPermission { key: String },

    /// Another menu already holds this permission key.
    #[error("permission '{key}' is already bound to menu '{menu}'")]
    PermissionAlreadyBound { key: String, menu: String },

    /// Stored menus form a parent chain that loops back onto itself.
    #[error("menu {menu_id} is part of a cyclic parent reference")]
    CyclicMenuReference { menu_id: Uuid },

    /// The requested parent is the menu itself or one of its descendants.
    #[error("menu {menu_id} cannot be placed under {parent_id}: it is the menu or one of its descendants")]
    InvalidParent { menu_id: Uuid, parent_id: Uuid },

    /// A menu sits deeper than the tree allows.
    #[error("menu {menu_id} exceeds the maximum menu depth of {max_depth}")]
    MenuTooDeep { menu_id: Uuid, max_depth: usize },

    #[error("menu {0} not found")]
    MenuNotFound(Uuid),

    /// The caller is not granted the policy guarding the operation.
    #[error("forbidden: policy '{policy}' is not granted")]
    Forbidden { policy: String },

    /// Two permission definitions share a name.
    #[error("duplicate permission definition: '{name}'")]
    DuplicatePermission { name: String },

    /// The permission registry document could not be parsed.
    #[error("invalid permission registry: {0}")]
    InvalidRegistry(#[from] toml::de::Error),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl MenuError {
    /// Whether the error was caused by caller input rather than an internal fault.
    ///
    /// Cyclic stored data, broken registry definitions and storage failures
    /// are faults of the deployment, not of the request.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            MenuError::Storage(_)
                | MenuError::CyclicMenuReference { .. }
                | MenuError::DuplicatePermission { .. }
                | MenuError::InvalidRegistry(_)
        )
    }
}

/// Result type alias using MenuError.
pub type MenuResult<T> = Result<T, MenuError>;
