//! Persistence collaborators and the unit-of-work boundary.
//!
//! Every mutating menu operation runs inside one [`UnitOfWork`]. Validation,
//! menu writes and grant migration all go through the repositories exposed
//! by that unit, so they commit or roll back together. Dropping a unit of
//! work without calling [`UnitOfWork::commit`] discards its changes.

mod memory;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Grantee, Menu, MenuFilter, MenuGrant};

pub use memory::{MemoryStore, MemoryUnitOfWork, MenuData};

/// Menu persistence.
#[async_trait]
pub trait MenuRepository: Send {
    /// Flat list of menus passing the filter, in storage order.
    async fn list(&mut self, filter: &MenuFilter) -> Result<Vec<Menu>>;

    async fn find(&mut self, id: Uuid) -> Result<Option<Menu>>;

    /// First menu bound to `key` whose id differs from `excluding`.
    async fn find_by_permission_key(
        &mut self,
        key: &str,
        excluding: Option<Uuid>,
    ) -> Result<Option<Menu>>;

    async fn insert(&mut self, menu: Menu) -> Result<()>;

    /// Replace a stored menu. Returns false when it does not exist.
    async fn update(&mut self, menu: Menu) -> Result<bool>;

    async fn delete(&mut self, id: Uuid) -> Result<bool>;
}

/// Menu grant persistence.
#[async_trait]
pub trait MenuGrantRepository: Send {
    async fn find(&mut self, menu_id: Uuid, grantee: &Grantee) -> Result<Option<MenuGrant>>;

    /// Grants held by one grantee.
    async fn list_by_grantee(&mut self, grantee: &Grantee) -> Result<Vec<MenuGrant>>;

    /// Grants recorded against one menu, in storage order.
    async fn list_by_menu(&mut self, menu_id: Uuid) -> Result<Vec<MenuGrant>>;

    async fn insert(&mut self, grant: MenuGrant) -> Result<()>;

    async fn delete(&mut self, menu_id: Uuid, grantee: &Grantee) -> Result<bool>;

    /// Remove every grant of a menu, returning how many were removed.
    async fn delete_by_menu(&mut self, menu_id: Uuid) -> Result<usize>;
}

/// The external authorization-grant store (permission key -> grantee).
#[async_trait]
pub trait PermissionGrantStore: Send {
    /// Grant a permission key. Granting twice is a no-op.
    async fn grant(&mut self, permission: &str, grantee: &Grantee) -> Result<()>;

    /// Revoke a permission key. Returns false when it was not granted.
    async fn revoke(&mut self, permission: &str, grantee: &Grantee) -> Result<bool>;

    async fn is_granted(&mut self, permission: &str, grantee: &Grantee) -> Result<bool>;
}

/// One atomic scope over all collaborators.
#[async_trait]
pub trait UnitOfWork: Send {
    fn menus(&mut self) -> &mut dyn MenuRepository;

    fn menu_grants(&mut self) -> &mut dyn MenuGrantRepository;

    fn permission_grants(&mut self) -> &mut dyn PermissionGrantStore;

    /// Make every change in this unit visible.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Opens units of work.
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}
