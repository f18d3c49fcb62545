//! In-memory store backed by a single JSON-serializable data set.
//!
//! A unit of work holds the store's mutex for its whole lifetime and works
//! on a staged copy, so concurrent units are serialized and an uncommitted
//! unit leaves no trace.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use super::{
    MenuGrantRepository, MenuRepository, PermissionGrantStore, UnitOfWork, UnitOfWorkFactory,
};
use crate::models::{Grantee, Menu, MenuFilter, MenuGrant, PermissionGrant};

/// Everything the in-memory store persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuData {
    #[serde(default)]
    pub menus: Vec<Menu>,
    #[serde(default)]
    pub menu_grants: Vec<MenuGrant>,
    #[serde(default)]
    pub permission_grants: Vec<PermissionGrant>,
}

/// In-memory [`UnitOfWorkFactory`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<MenuData>>,
}

impl MemoryStore {
    pub fn new(data: MenuData) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Load a data set from a JSON file. A missing file yields an empty store.
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path)
            .await
            .with_context(|| format!("failed to stat {}", path.display()))?
        {
            debug!(path = %path.display(), "no data file, starting empty");
            return Ok(Self::default());
        }

        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let data: MenuData = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        debug!(
            path = %path.display(),
            menus = data.menus.len(),
            menu_grants = data.menu_grants.len(),
            "data file loaded"
        );

        Ok(Self::new(data))
    }

    /// Write the committed data set to a JSON file.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let data = self.snapshot().await;
        let json = serde_json::to_string_pretty(&data).context("failed to serialize data")?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .context("failed to create data directory")?;
        }

        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        debug!(path = %path.display(), "data file written");
        Ok(())
    }

    /// Copy of the committed data.
    pub async fn snapshot(&self) -> MenuData {
        self.data.lock().await.clone()
    }
}

#[async_trait]
impl UnitOfWorkFactory for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let guard = Arc::clone(&self.data).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, staged }))
    }
}

/// Unit of work over a [`MemoryStore`].
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MenuData>,
    staged: MenuData,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    fn menus(&mut self) -> &mut dyn MenuRepository {
        self
    }

    fn menu_grants(&mut self) -> &mut dyn MenuGrantRepository {
        self
    }

    fn permission_grants(&mut self) -> &mut dyn PermissionGrantStore {
        self
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryUnitOfWork { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[async_trait]
impl MenuRepository for MemoryUnitOfWork {
    async fn list(&mut self, filter: &MenuFilter) -> Result<Vec<Menu>> {
        Ok(self
            .staged
            .menus
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn find(&mut self, id: Uuid) -> Result<Option<Menu>> {
        Ok(self.staged.menus.iter().find(|m| m.id == id).cloned())
    }

    async fn find_by_permission_key(
        &mut self,
        key: &str,
        excluding: Option<Uuid>,
    ) -> Result<Option<Menu>> {
        Ok(self
            .staged
            .menus
            .iter()
            .find(|m| m.permission_key.as_deref() == Some(key) && Some(m.id) != excluding)
            .cloned())
    }

    async fn insert(&mut self, menu: Menu) -> Result<()> {
        if self.staged.menus.iter().any(|m| m.id == menu.id) {
            anyhow::bail!("menu {} already exists", menu.id);
        }
        self.staged.menus.push(menu);
        Ok(())
    }

    async fn update(&mut self, menu: Menu) -> Result<bool> {
        match self.staged.menus.iter_mut().find(|m| m.id == menu.id) {
            Some(existing) => {
                *existing = menu;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&mut self, id: Uuid) -> Result<bool> {
        let before = self.staged.menus.len();
        self.staged.menus.retain(|m| m.id != id);
        Ok(self.staged.menus.len() != before)
    }
}

#[async_trait]
impl MenuGrantRepository for MemoryUnitOfWork {
    async fn find(&mut self, menu_id: Uuid, grantee: &Grantee) -> Result<Option<MenuGrant>> {
        Ok(self
            .staged
            .menu_grants
            .iter()
            .find(|g| g.menu_id == menu_id && g.is_for(grantee))
            .cloned())
    }

    async fn list_by_grantee(&mut self, grantee: &Grantee) -> Result<Vec<MenuGrant>> {
        Ok(self
            .staged
            .menu_grants
            .iter()
            .filter(|g| g.is_for(grantee))
            .cloned()
            .collect())
    }

    async fn list_by_menu(&mut self, menu_id: Uuid) -> Result<Vec<MenuGrant>> {
        Ok(self
            .staged
            .menu_grants
            .iter()
            .filter(|g| g.menu_id == menu_id)
            .cloned()
            .collect())
    }

    async fn insert(&mut self, grant: MenuGrant) -> Result<()> {
        if self
            .staged
            .menu_grants
            .iter()
            .any(|g| g.menu_id == grant.menu_id && g.is_for(&grant.grantee()))
        {
            anyhow::bail!(
                "menu grant for {} on menu {} already exists",
                grant.grantee(),
                grant.menu_id
            );
        }
        self.staged.menu_grants.push(grant);
        Ok(())
    }

    async fn delete(&mut self, menu_id: Uuid, grantee: &Grantee) -> Result<bool> {
        let before = self.staged.menu_grants.len();
        self.staged
            .menu_grants
            .retain(|g| !(g.menu_id == menu_id && g.is_for(grantee)));
        Ok(self.staged.menu_grants.len() != before)
    }

    async fn delete_by_menu(&mut self, menu_id: Uuid) -> Result<usize> {
        let before = self.staged.menu_grants.len();
        self.staged.menu_grants.retain(|g| g.menu_id != menu_id);
        Ok(before - self.staged.menu_grants.len())
    }
}

#[async_trait]
impl PermissionGrantStore for MemoryUnitOfWork {
    async fn grant(&mut self, permission: &str, grantee: &Grantee) -> Result<()> {
        if !self
            .staged
            .permission_grants
            .iter()
            .any(|g| g.is_for(permission, grantee))
        {
            self.staged
                .permission_grants
                .push(PermissionGrant::new(permission, grantee));
        }
        Ok(())
    }

    async fn revoke(&mut self, permission: &str, grantee: &Grantee) -> Result<bool> {
        let before = self.staged.permission_grants.len();
        self.staged
            .permission_grants
            .retain(|g| !g.is_for(permission, grantee));
        Ok(self.staged.permission_grants.len() != before)
    }

    async fn is_granted(&mut self, permission: &str, grantee: &Grantee) -> Result<bool> {
        Ok(self
            .staged
            .permission_grants
            .iter()
            .any(|g| g.is_for(permission, grantee)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::CreateOrUpdateMenu;

    fn menu(display_name: &str) -> Menu {
        Menu::new(CreateOrUpdateMenu {
            name: display_name.to_lowercase(),
            display_name: display_name.to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn uncommitted_unit_rolls_back() {
        let store = MemoryStore::default();

        let mut uow = store.begin().await.unwrap();
        uow.menus().insert(menu("Home")).await.unwrap();
        drop(uow);

        assert!(store.snapshot().await.menus.is_empty());

        let mut uow = store.begin().await.unwrap();
        uow.menus().insert(menu("Home")).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(store.snapshot().await.menus.len(), 1);
    }

    #[tokio::test]
    async fn find_by_permission_key_skips_excluded() {
        let mut bound = menu("Posts");
        bound.permission_key = Some("Blog.Posts".to_string());
        let id = bound.id;
        let store = MemoryStore::new(MenuData {
            menus: vec![bound],
            ..Default::default()
        });

        let mut uow = store.begin().await.unwrap();
        let found = uow
            .menus()
            .find_by_permission_key("Blog.Posts", None)
            .await
            .unwrap();
        assert_eq!(found.map(|m| m.id), Some(id));

        let excluded = uow
            .menus()
            .find_by_permission_key("Blog.Posts", Some(id))
            .await
            .unwrap();
        assert!(excluded.is_none());
    }

    #[tokio::test]
    async fn menu_grant_lookups() {
        let store = MemoryStore::default();
        let menu_id = Uuid::now_v7();
        let other_menu = Uuid::now_v7();
        let admin = Grantee::role("admin");
        let editor = Grantee::role("editor");

        let mut uow = store.begin().await.unwrap();
        let grants = uow.menu_grants();
        grants.insert(MenuGrant::new(menu_id, &admin)).await.unwrap();
        grants.insert(MenuGrant::new(menu_id, &editor)).await.unwrap();
        grants
            .insert(MenuGrant::new(other_menu, &admin))
            .await
            .unwrap();
        assert!(grants.insert(MenuGrant::new(menu_id, &admin)).await.is_err());

        assert!(grants.find(menu_id, &editor).await.unwrap().is_some());
        assert!(grants.find(other_menu, &editor).await.unwrap().is_none());
        assert_eq!(grants.list_by_grantee(&admin).await.unwrap().len(), 2);
        assert_eq!(grants.list_by_menu(menu_id).await.unwrap().len(), 2);
        assert_eq!(grants.delete_by_menu(menu_id).await.unwrap(), 2);
        assert!(grants.list_by_menu(menu_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn permission_grants_are_idempotent() {
        let store = MemoryStore::default();
        let role = Grantee::role("admin");

        let mut uow = store.begin().await.unwrap();
        let grants = uow.permission_grants();
        grants.grant("Blog.Posts", &role).await.unwrap();
        grants.grant("Blog.Posts", &role).await.unwrap();
        assert!(grants.is_granted("Blog.Posts", &role).await.unwrap());
        assert!(grants.revoke("Blog.Posts", &role).await.unwrap());
        assert!(!grants.revoke("Blog.Posts", &role).await.unwrap());
        uow.commit().await.unwrap();

        assert!(store.snapshot().await.permission_grants.is_empty());
    }

    #[tokio::test]
    async fn save_and_load_round_trip_file() {
        let dir = std::env::temp_dir().join(format!("menudesk-{}", Uuid::now_v7()));
        let path = dir.join("data.json");

        let store = MemoryStore::new(MenuData {
            menus: vec![menu("Home")],
            ..Default::default()
        });
        store.save(&path).await.unwrap();

        let loaded = MemoryStore::load(&path).await.unwrap();
        assert_eq!(loaded.snapshot().await, store.snapshot().await);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
