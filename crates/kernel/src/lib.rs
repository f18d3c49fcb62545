//! Menudesk Kernel Library
//!
//! Menu tree reconciliation, permission binding and grant migration for an
//! admin panel's navigation menus. The `menudesk` binary is a thin operator
//! CLI over [`menu::MenuService`].

pub mod config;
pub mod error;
pub mod localization;
pub mod menu;
pub mod models;
pub mod permissions;
pub mod store;

pub use config::Config;
pub use error::{MenuError, MenuResult};
pub use menu::MenuService;
pub use permissions::PermissionRegistry;
pub use store::MemoryStore;
