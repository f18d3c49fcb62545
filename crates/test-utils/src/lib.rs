//! Menudesk test utilities.
//!
//! Fixture builders for menus, grants and permission registries used by
//! the kernel's integration tests.

use std::sync::Arc;

use menudesk_kernel::menu::MenuService;
use menudesk_kernel::models::{
    DisplayName, Grantee, Menu, MenuGrant, MenuType, PermissionDefinition, PermissionGrant,
    PermissionGroup, TenancySide,
};
use menudesk_kernel::permissions::{GrantedPolicies, PermissionRegistry, menu_management_group};
use menudesk_kernel::store::{MemoryStore, MenuData};
use uuid::Uuid;

/// Create a test menu with default values.
///
/// Small integer ids keep expected orderings readable in assertions.
pub fn test_menu(id: u128, display_name: &str) -> TestMenu {
    TestMenu {
        menu: Menu {
            id: Uuid::from_u128(id),
            name: display_name.to_lowercase().replace(' ', "-"),
            display_name: display_name.to_string(),
            menu_type: MenuType::Menu,
            component: None,
            path: None,
            icon: None,
            sort: String::new(),
            target_url: None,
            permission_key: None,
            parent_id: None,
            created: 0,
            changed: 0,
        },
    }
}

/// A test menu builder for creating fixtures.
#[derive(Debug, Clone)]
pub struct TestMenu {
    menu: Menu,
}

impl TestMenu {
    /// Set the parent by numeric id.
    pub fn with_parent(mut self, parent: u128) -> Self {
        self.menu.parent_id = Some(Uuid::from_u128(parent));
        self
    }

    pub fn with_sort(mut self, sort: &str) -> Self {
        self.menu.sort = sort.to_string();
        self
    }

    pub fn with_permission(mut self, key: &str) -> Self {
        self.menu.permission_key = Some(key.to_string());
        self
    }

    /// Mark as a page entry.
    pub fn page(mut self) -> Self {
        self.menu.menu_type = MenuType::Page;
        self
    }

    pub fn build(self) -> Menu {
        self.menu
    }
}

/// Uuid for a numeric fixture id.
pub fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

/// Blog and admin permissions plus the built-in menu management group.
///
/// `Admin.Tenants` is host-only; `Admin.Users.Impersonate` is a host-only child.
pub fn test_registry() -> PermissionRegistry {
    let blog = PermissionGroup {
        name: "Blog".to_string(),
        display_name: Some(DisplayName::fixed("Blog")),
        permissions: vec![
            PermissionDefinition::new("Blog.Posts", DisplayName::fixed("Posts"))
                .with_child(PermissionDefinition::new(
                    "Blog.Posts.Create",
                    DisplayName::fixed("Create posts"),
                ))
                .with_child(PermissionDefinition::new(
                    "Blog.Posts.Delete",
                    DisplayName::fixed("Delete posts"),
                )),
            PermissionDefinition::new("Blog.Tags", DisplayName::fixed("Tags")),
            PermissionDefinition::new("Blog.Comments", DisplayName::fixed("Comments")),
        ],
    };

    let admin = PermissionGroup {
        name: "Admin".to_string(),
        display_name: Some(DisplayName::fixed("Administration")),
        permissions: vec![
            PermissionDefinition::new("Admin.Tenants", DisplayName::fixed("Tenants"))
                .with_side(TenancySide::HOST),
            PermissionDefinition::new("Admin.Users", DisplayName::fixed("Users")).with_child(
                PermissionDefinition::new(
                    "Admin.Users.Impersonate",
                    DisplayName::fixed("Impersonate"),
                )
                .with_side(TenancySide::HOST),
            ),
        ],
    };

    let empty = PermissionGroup {
        name: "Reports".to_string(),
        display_name: None,
        permissions: Vec::new(),
    };

    match PermissionRegistry::from_groups(vec![menu_management_group(), blog, empty, admin]) {
        Ok(registry) => registry,
        Err(e) => panic!("fixture registry is invalid: {e}"),
    }
}

/// Data set builder for a [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct TestData {
    data: MenuData,
}

impl TestData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn menu(mut self, menu: TestMenu) -> Self {
        self.data.menus.push(menu.build());
        self
    }

    /// Record a menu grant and, when the menu is bound, the matching permission grant.
    pub fn grant(mut self, menu: u128, grantee: &Grantee) -> Self {
        let menu_id = Uuid::from_u128(menu);
        let key = self
            .data
            .menus
            .iter()
            .find(|m| m.id == menu_id)
            .and_then(|m| m.permission_key.clone());

        self.data.menu_grants.push(MenuGrant::new(menu_id, grantee));
        if let Some(key) = key {
            self.data
                .permission_grants
                .push(PermissionGrant::new(key, grantee));
        }
        self
    }

    pub fn store(self) -> MemoryStore {
        MemoryStore::new(self.data)
    }
}

/// Service over `store` with every policy granted and the fixture registry.
pub fn test_service(store: &MemoryStore) -> MenuService {
    service_with_policies(store, GrantedPolicies::allow_all())
}

/// Service over `store` with a specific set of granted policies.
pub fn service_with_policies(store: &MemoryStore, policies: GrantedPolicies) -> MenuService {
    MenuService::new(
        Arc::new(test_registry()),
        Arc::new(policies),
        Arc::new(store.clone()),
    )
}
