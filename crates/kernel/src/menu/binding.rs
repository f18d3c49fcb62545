//! Permission binding synchronizer.
//!
//! At most one menu may be bound to a given permission key. When a menu's
//! key changes, every grantee recorded against that menu is moved from the
//! old key to the new one in the authorization-grant store.

use anyhow::Context;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{MenuError, MenuResult};
use crate::models::menu::normalize_permission_key;
use crate::models::{GrantTransfer, Menu, MenuGrant};
use crate::permissions::PermissionRegistry;
use crate::store::{MenuRepository, PermissionGrantStore, UnitOfWork};

/// Validates a menu's permission key before it is written.
#[derive(Debug, Clone, Copy)]
pub struct BindingValidator<'a> {
    registry: &'a PermissionRegistry,
}

impl<'a> BindingValidator<'a> {
    pub fn new(registry: &'a PermissionRegistry) -> Self {
        Self { registry }
    }

    /// Validate against persisted menus.
    ///
    /// Pass `excluding` = the menu being updated so it may keep its own key;
    /// pass `None` on create.
    pub async fn validate(
        &self,
        menus: &mut dyn MenuRepository,
        permission_key: Option<&str>,
        excluding: Option<Uuid>,
    ) -> MenuResult<()> {
        let Some(key) = self.known_key(permission_key)? else {
            return Ok(());
        };

        let holder = menus
            .find_by_permission_key(key, excluding)
            .await
            .context("failed to look up permission binding")?;

        match holder {
            Some(menu) => Err(already_bound(key, &menu)),
            None => Ok(()),
        }
    }

    /// Validate against an in-memory snapshot of menus.
    pub fn validate_snapshot(
        &self,
        menus: &[Menu],
        permission_key: Option<&str>,
        excluding: Option<Uuid>,
    ) -> MenuResult<()> {
        let Some(key) = self.known_key(permission_key)? else {
            return Ok(());
        };

        match menus
            .iter()
            .find(|m| m.permission_key.as_deref() == Some(key) && Some(m.id) != excluding)
        {
            Some(menu) => Err(already_bound(key, menu)),
            None => Ok(()),
        }
    }

    /// `None` for unbound menus, the key itself when the registry knows it.
    fn known_key<'k>(&self, permission_key: Option<&'k str>) -> MenuResult<Option<&'k str>> {
        let Some(key) = normalize_permission_key(permission_key) else {
            return Ok(None);
        };

        if !self.registry.contains(key) {
            warn!(permission_key = %key, "rejected binding to unknown permission");
            return Err(MenuError::UnknownPermission {
                key: key.to_string(),
            });
        }

        Ok(Some(key))
    }
}

fn already_bound(key: &str, holder: &Menu) -> MenuError {
    warn!(
        permission_key = %key,
        menu_id = %holder.id,
        "rejected binding, permission already bound"
    );
    MenuError::PermissionAlreadyBound {
        key: key.to_string(),
        menu: holder.display_name.clone(),
    }
}

/// One transfer per grantee when the key changes, none when it does not.
///
/// Blank keys count as unbound, so changing `""` to `None` plans nothing.
pub fn plan_grant_transfers(
    grants: &[MenuGrant],
    old_key: Option<&str>,
    new_key: Option<&str>,
) -> Vec<GrantTransfer> {
    let old_key = normalize_permission_key(old_key);
    let new_key = normalize_permission_key(new_key);

    if old_key == new_key {
        return Vec::new();
    }

    grants
        .iter()
        .map(|grant| GrantTransfer {
            grantee: grant.grantee(),
            from: old_key.map(str::to_string),
            to: new_key.map(str::to_string),
        })
        .collect()
}

/// Apply transfers in order: revoke the old key, then grant the new one.
///
/// Stops at the first failure. The caller's unit of work must be dropped
/// so that earlier transfers roll back with it.
pub async fn apply_grant_transfers(
    store: &mut dyn PermissionGrantStore,
    transfers: &[GrantTransfer],
) -> MenuResult<()> {
    for transfer in transfers {
        if let Some(from) = transfer.from.as_deref() {
            store
                .revoke(from, &transfer.grantee)
                .await
                .with_context(|| format!("failed to revoke '{from}' from {}", transfer.grantee))?;
        }
        if let Some(to) = transfer.to.as_deref() {
            store
                .grant(to, &transfer.grantee)
                .await
                .with_context(|| format!("failed to grant '{to}' to {}", transfer.grantee))?;
        }
        debug!(
            grantee = %transfer.grantee,
            from = ?transfer.from,
            to = ?transfer.to,
            "grant transferred"
        );
    }
    Ok(())
}

/// Move a menu's grantees from `old_key` to `new_key` inside `uow`.
///
/// Returns the transfers that were applied.
pub async fn sync_grants_on_permission_change(
    uow: &mut dyn UnitOfWork,
    menu_id: Uuid,
    old_key: Option<&str>,
    new_key: Option<&str>,
) -> MenuResult<Vec<GrantTransfer>> {
    if normalize_permission_key(old_key) == normalize_permission_key(new_key) {
        return Ok(Vec::new());
    }

    let grants = uow
        .menu_grants()
        .list_by_menu(menu_id)
        .await
        .with_context(|| format!("failed to list grants of menu {menu_id}"))?;

    let transfers = plan_grant_transfers(&grants, old_key, new_key);
    apply_grant_transfers(uow.permission_grants(), &transfers).await?;

    debug!(%menu_id, transfers = transfers.len(), "menu grants migrated");
    Ok(transfers)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{
        CreateOrUpdateMenu, DisplayName, Grantee, PermissionDefinition, PermissionGroup,
    };
    use crate::store::{MemoryStore, MenuData, UnitOfWorkFactory};

    fn registry() -> PermissionRegistry {
        PermissionRegistry::from_groups(vec![PermissionGroup {
            name: "Blog".to_string(),
            display_name: None,
            permissions: vec![
                PermissionDefinition::new("Blog.Posts", DisplayName::fixed("Posts")).with_child(
                    PermissionDefinition::new("Blog.Posts.Edit", DisplayName::fixed("Edit")),
                ),
                PermissionDefinition::new("Blog.Tags", DisplayName::fixed("Tags")),
            ],
        }])
        .unwrap()
    }

    fn bound_menu(display_name: &str, key: Option<&str>) -> Menu {
        Menu::new(CreateOrUpdateMenu {
            name: display_name.to_lowercase(),
            display_name: display_name.to_string(),
            permission_key: key.map(str::to_string),
            ..Default::default()
        })
    }

    #[test]
    fn blank_key_always_passes() {
        let registry = registry();
        let validator = BindingValidator::new(&registry);
        let menus = vec![bound_menu("Posts", Some("Blog.Posts"))];

        assert!(validator.validate_snapshot(&menus, None, None).is_ok());
        assert!(validator.validate_snapshot(&menus, Some(""), None).is_ok());
        assert!(validator.validate_snapshot(&menus, Some("  "), None).is_ok());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let registry = registry();
        let validator = BindingValidator::new(&registry);

        let err = validator
            .validate_snapshot(&[], Some("Blog.Missing"), None)
            .unwrap_err();
        assert!(matches!(err, MenuError::UnknownPermission { key } if key == "Blog.Missing"));
    }

    #[test]
    fn child_permission_is_known() {
        let registry = registry();
        let validator = BindingValidator::new(&registry);
        assert!(
            validator
                .validate_snapshot(&[], Some("Blog.Posts.Edit"), None)
                .is_ok()
        );
    }

    #[test]
    fn key_held_by_other_menu_is_rejected() {
        let registry = registry();
        let validator = BindingValidator::new(&registry);
        let holder = bound_menu("Posts", Some("Blog.Posts"));
        let other = bound_menu("Articles", None);
        let menus = vec![holder.clone(), other.clone()];

        let err = validator
            .validate_snapshot(&menus, Some("Blog.Posts"), Some(other.id))
            .unwrap_err();
        assert!(matches!(
            err,
            MenuError::PermissionAlreadyBound { menu, .. } if menu == "Posts"
        ));

        assert!(
            validator
                .validate_snapshot(&menus, Some("Blog.Posts"), Some(holder.id))
                .is_ok()
        );
    }

    #[tokio::test]
    async fn repository_validation_matches_snapshot() {
        let registry = registry();
        let validator = BindingValidator::new(&registry);
        let holder = bound_menu("Posts", Some("Blog.Posts"));
        let holder_id = holder.id;
        let store = MemoryStore::new(MenuData {
            menus: vec![holder],
            ..Default::default()
        });

        let mut uow = store.begin().await.unwrap();
        assert!(matches!(
            validator
                .validate(uow.menus(), Some("Blog.Posts"), None)
                .await,
            Err(MenuError::PermissionAlreadyBound { .. })
        ));
        assert!(
            validator
                .validate(uow.menus(), Some("Blog.Posts"), Some(holder_id))
                .await
                .is_ok()
        );
        assert!(
            validator
                .validate(uow.menus(), Some("Blog.Tags"), None)
                .await
                .is_ok()
        );
    }

    #[test]
    fn plan_has_one_transfer_per_grantee() {
        let menu_id = Uuid::now_v7();
        let grants = vec![
            MenuGrant::new(menu_id, &Grantee::role("admin")),
            MenuGrant::new(menu_id, &Grantee::user("42")),
        ];

        let transfers = plan_grant_transfers(&grants, Some("Blog.Posts"), Some("Blog.Tags"));
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].grantee, Grantee::role("admin"));
        assert_eq!(transfers[1].grantee, Grantee::user("42"));
        assert!(transfers.iter().all(|t| {
            t.from.as_deref() == Some("Blog.Posts") && t.to.as_deref() == Some("Blog.Tags")
        }));
    }

    #[test]
    fn unchanged_key_plans_nothing() {
        let menu_id = Uuid::now_v7();
        let grants = vec![MenuGrant::new(menu_id, &Grantee::role("admin"))];

        assert!(plan_grant_transfers(&grants, Some("Blog.Posts"), Some("Blog.Posts")).is_empty());
        assert!(plan_grant_transfers(&grants, None, Some(" ")).is_empty());
    }

    #[test]
    fn adding_and_removing_a_binding() {
        let menu_id = Uuid::now_v7();
        let grants = vec![MenuGrant::new(menu_id, &Grantee::role("admin"))];

        let added = plan_grant_transfers(&grants, None, Some("Blog.Posts"));
        assert_eq!(added[0].from, None);
        assert_eq!(added[0].to.as_deref(), Some("Blog.Posts"));

        let removed = plan_grant_transfers(&grants, Some("Blog.Posts"), None);
        assert_eq!(removed[0].from.as_deref(), Some("Blog.Posts"));
        assert_eq!(removed[0].to, None);
    }

    #[tokio::test]
    async fn sync_moves_grants_in_store() {
        let menu_id = Uuid::now_v7();
        let admin = Grantee::role("admin");
        let store = MemoryStore::new(MenuData {
            menu_grants: vec![MenuGrant::new(menu_id, &admin)],
            ..Default::default()
        });

        let mut uow = store.begin().await.unwrap();
        uow.permission_grants()
            .grant("Blog.Posts", &admin)
            .await
            .unwrap();

        let transfers = sync_grants_on_permission_change(
            uow.as_mut(),
            menu_id,
            Some("Blog.Posts"),
            Some("Blog.Tags"),
        )
        .await
        .unwrap();
        assert_eq!(transfers.len(), 1);

        let grants = uow.permission_grants();
        assert!(!grants.is_granted("Blog.Posts", &admin).await.unwrap());
        assert!(grants.is_granted("Blog.Tags", &admin).await.unwrap());
    }
}
