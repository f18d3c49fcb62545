//! Menu management models.

pub mod menu;
pub mod menu_grant;
pub mod permission;

pub use menu::{CreateOrUpdateMenu, Menu, MenuFilter, MenuType};
pub use menu_grant::{GrantTransfer, Grantee, MenuGrant, PermissionGrant};
pub use permission::{
    DisplayName, PermissionDefinition, PermissionGroup, PolicyNode, TenancySide,
};
