//! Menu application service.
//!
//! Guards each operation with its policy, opens one unit of work per call,
//! and routes writes through the binding synchronizer before persistence.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::binding::{BindingValidator, sync_grants_on_permission_change};
use super::policy::assemble_policies;
use super::tree::{MenuNode, build_tree, check_placement};
use crate::error::{MenuError, MenuResult};
use crate::localization::{KeyLocalizer, Localizer};
use crate::models::{
    CreateOrUpdateMenu, GrantTransfer, Grantee, Menu, MenuFilter, MenuGrant, PolicyNode,
    TenancySide,
};
use crate::permissions::{
    AuthorizationService, PermissionRegistry, ensure_granted, menu_policies,
};
use crate::store::{UnitOfWork, UnitOfWorkFactory};

/// A page of results with the total number of matching records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagedResult<T> {
    pub total_count: usize,
    pub items: Vec<T>,
}

/// Outcome of an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuUpdate {
    pub menu: Menu,
    /// Grant transfers applied because the permission key changed.
    pub transfers: Vec<GrantTransfer>,
}

/// Reject a parent that would create a cycle or exceed the depth limit.
async fn ensure_placement(
    uow: &mut dyn UnitOfWork,
    menu_id: Uuid,
    parent_id: Uuid,
) -> MenuResult<()> {
    let menus = uow
        .menus()
        .list(&MenuFilter::default())
        .await
        .context("failed to list menus")?;
    check_placement(&menus, menu_id, parent_id).inspect_err(|e| {
        warn!(%menu_id, %parent_id, error = %e, "menu placement rejected");
    })
}

/// Menu CRUD, listing and menu grant management.
pub struct MenuService {
    registry: Arc<PermissionRegistry>,
    auth: Arc<dyn AuthorizationService>,
    store: Arc<dyn UnitOfWorkFactory>,
    localizer: Arc<dyn Localizer>,
}

impl MenuService {
    pub fn new(
        registry: Arc<PermissionRegistry>,
        auth: Arc<dyn AuthorizationService>,
        store: Arc<dyn UnitOfWorkFactory>,
    ) -> Self {
        Self {
            registry,
            auth,
            store,
            localizer: Arc::new(KeyLocalizer),
        }
    }

    /// Use a specific localizer for policy display names.
    pub fn with_localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = localizer;
        self
    }

    fn validator(&self) -> BindingValidator<'_> {
        BindingValidator::new(&self.registry)
    }

    /// Create a menu after validating its permission binding.
    pub async fn create(&self, input: CreateOrUpdateMenu) -> MenuResult<Menu> {
        ensure_granted(self.auth.as_ref(), menu_policies::CREATE).await?;

        let mut uow = self.store.begin().await?;
        let key = input.normalized_permission_key();
        self.validator()
            .validate(uow.menus(), key.as_deref(), None)
            .await?;

        let menu = Menu::new(input);
        if let Some(parent_id) = menu.parent_id {
            ensure_placement(uow.as_mut(), menu.id, parent_id).await?;
        }
        uow.menus()
            .insert(menu.clone())
            .await
            .context("failed to insert menu")?;
        uow.commit().await?;

        info!(menu_id = %menu.id, permission_key = ?menu.permission_key, "menu created");
        Ok(menu)
    }

    /// Update a menu, migrating its grants when the permission key changes.
    ///
    /// Validation, grant migration and the menu write share one unit of work;
    /// any failure leaves all three unapplied.
    pub async fn update(&self, id: Uuid, input: CreateOrUpdateMenu) -> MenuResult<MenuUpdate> {
        ensure_granted(self.auth.as_ref(), menu_policies::UPDATE).await?;

        let mut uow = self.store.begin().await?;
        let new_key = input.normalized_permission_key();
        self.validator()
            .validate(uow.menus(), new_key.as_deref(), Some(id))
            .await?;

        let mut menu = uow
            .menus()
            .find(id)
            .await
            .context("failed to load menu")?
            .ok_or(MenuError::MenuNotFound(id))?;

        if let Some(parent_id) = input.parent_id.filter(|p| menu.parent_id != Some(*p)) {
            ensure_placement(uow.as_mut(), id, parent_id).await?;
        }

        let transfers = if menu.permission_key != new_key {
            sync_grants_on_permission_change(
                uow.as_mut(),
                id,
                menu.permission_key.as_deref(),
                new_key.as_deref(),
            )
            .await?
        } else {
            Vec::new()
        };

        menu.apply(input);
        if !uow
            .menus()
            .update(menu.clone())
            .await
            .context("failed to update menu")?
        {
            return Err(MenuError::MenuNotFound(id));
        }
        uow.commit().await?;

        info!(
            menu_id = %id,
            permission_key = ?menu.permission_key,
            transfers = transfers.len(),
            "menu updated"
        );
        Ok(MenuUpdate { menu, transfers })
    }

    /// Delete a menu and its menu grants. Child menus are left in place.
    ///
    /// Grantees that held the menu lose its permission key as well.
    pub async fn delete(&self, id: Uuid) -> MenuResult<()> {
        ensure_granted(self.auth.as_ref(), menu_policies::DELETE).await?;

        let mut uow = self.store.begin().await?;
        let menu = uow
            .menus()
            .find(id)
            .await
            .context("failed to load menu")?
            .ok_or(MenuError::MenuNotFound(id))?;

        let grants = uow
            .menu_grants()
            .list_by_menu(id)
            .await
            .context("failed to list menu grants")?;
        if let Some(key) = menu.permission_key.as_deref() {
            for grant in &grants {
                let grantee = grant.grantee();
                uow.permission_grants()
                    .revoke(key, &grantee)
                    .await
                    .with_context(|| format!("failed to revoke '{key}' from {grantee}"))?;
            }
        }

        uow.menu_grants()
            .delete_by_menu(id)
            .await
            .context("failed to delete menu grants")?;
        if !uow
            .menus()
            .delete(id)
            .await
            .context("failed to delete menu")?
        {
            return Err(MenuError::MenuNotFound(id));
        }
        uow.commit().await?;

        info!(menu_id = %id, menu_grants = grants.len(), "menu deleted");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> MenuResult<Menu> {
        ensure_granted(self.auth.as_ref(), menu_policies::DEFAULT).await?;

        let mut uow = self.store.begin().await?;
        uow.menus()
            .find(id)
            .await
            .context("failed to load menu")?
            .ok_or(MenuError::MenuNotFound(id))
    }

    /// List menus matching `filter` as an ordered forest.
    ///
    /// `total_count` counts every matching menu, not just the roots.
    pub async fn list(&self, filter: &MenuFilter) -> MenuResult<PagedResult<MenuNode>> {
        ensure_granted(self.auth.as_ref(), menu_policies::DEFAULT).await?;

        let menus = {
            let mut uow = self.store.begin().await?;
            uow.menus()
                .list(filter)
                .await
                .context("failed to list menus")?
        };

        let items = build_tree(&menus)?;
        debug!(menus = menus.len(), roots = items.len(), "menu tree built");

        Ok(PagedResult {
            total_count: menus.len(),
            items,
        })
    }

    /// Policies available for binding, for the host or the given tenant.
    pub fn auth_policies(&self, tenant_id: Option<Uuid>) -> Vec<PolicyNode> {
        assemble_policies(
            self.registry.groups(),
            TenancySide::for_tenant(tenant_id),
            self.localizer.as_ref(),
        )
    }

    /// Check a permission binding without writing anything.
    pub async fn validate_binding(
        &self,
        permission_key: Option<&str>,
        excluding: Option<Uuid>,
    ) -> MenuResult<()> {
        let mut uow = self.store.begin().await?;
        self.validator()
            .validate(uow.menus(), permission_key, excluding)
            .await
    }

    /// Grant a menu to a grantee, along with the menu's permission key.
    ///
    /// Returns false when the grantee already held the menu.
    pub async fn grant_menu(&self, menu_id: Uuid, grantee: &Grantee) -> MenuResult<bool> {
        ensure_granted(self.auth.as_ref(), menu_policies::UPDATE).await?;

        let mut uow = self.store.begin().await?;
        let menu = uow
            .menus()
            .find(menu_id)
            .await
            .context("failed to load menu")?
            .ok_or(MenuError::MenuNotFound(menu_id))?;

        if uow
            .menu_grants()
            .find(menu_id, grantee)
            .await
            .context("failed to look up menu grant")?
            .is_some()
        {
            return Ok(false);
        }

        uow.menu_grants()
            .insert(MenuGrant::new(menu_id, grantee))
            .await
            .context("failed to insert menu grant")?;
        if let Some(key) = menu.permission_key.as_deref() {
            uow.permission_grants()
                .grant(key, grantee)
                .await
                .with_context(|| format!("failed to grant '{key}' to {grantee}"))?;
        }
        uow.commit().await?;

        info!(%menu_id, %grantee, "menu granted");
        Ok(true)
    }

    /// Revoke a menu from a grantee, along with the menu's permission key.
    ///
    /// Returns false when the grantee did not hold the menu.
    pub async fn revoke_menu(&self, menu_id: Uuid, grantee: &Grantee) -> MenuResult<bool> {
        ensure_granted(self.auth.as_ref(), menu_policies::UPDATE).await?;

        let mut uow = self.store.begin().await?;
        let menu = uow
            .menus()
            .find(menu_id)
            .await
            .context("failed to load menu")?
            .ok_or(MenuError::MenuNotFound(menu_id))?;

        if !uow
            .menu_grants()
            .delete(menu_id, grantee)
            .await
            .context("failed to delete menu grant")?
        {
            return Ok(false);
        }
        if let Some(key) = menu.permission_key.as_deref() {
            uow.permission_grants()
                .revoke(key, grantee)
                .await
                .with_context(|| format!("failed to revoke '{key}' from {grantee}"))?;
        }
        uow.commit().await?;

        info!(%menu_id, %grantee, "menu revoked");
        Ok(true)
    }

    /// Menus granted to a grantee, in grant order. Grants of deleted menus are skipped.
    pub async fn granted_menus(&self, grantee: &Grantee) -> MenuResult<Vec<Menu>> {
        ensure_granted(self.auth.as_ref(), menu_policies::DEFAULT).await?;

        let mut uow = self.store.begin().await?;
        let grants = uow
            .menu_grants()
            .list_by_grantee(grantee)
            .await
            .context("failed to list menu grants")?;

        let mut menus = Vec::with_capacity(grants.len());
        for grant in grants {
            if let Some(menu) = uow
                .menus()
                .find(grant.menu_id)
                .await
                .context("failed to load menu")?
            {
                menus.push(menu);
            }
        }
        Ok(menus)
    }
}
