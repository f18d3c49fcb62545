//! Menu model for the admin navigation tree.
//!
//! Menus are stored flat. Hierarchy is expressed only through `parent_id`
//! and is rebuilt per request by [`crate::menu::build_tree`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of navigation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuType {
    /// Grouping entry that only holds children.
    #[default]
    Menu,
    /// Entry that routes to a page component.
    Page,
}

impl std::str::FromStr for MenuType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "menu" => Ok(MenuType::Menu),
            "page" => Ok(MenuType::Page),
            other => Err(format!("unknown menu type '{other}', expected 'menu' or 'page'")),
        }
    }
}

/// Menu record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Machine name.
    pub name: String,

    /// Display title.
    pub display_name: String,

    pub menu_type: MenuType,

    /// Frontend component rendered for pages.
    #[serde(default)]
    pub component: Option<String>,

    /// Route path.
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub icon: Option<String>,

    /// Sort key, compared byte-wise ("10" sorts before "9").
    #[serde(default)]
    pub sort: String,

    /// External link target.
    #[serde(default)]
    pub target_url: Option<String>,

    /// Permission key bound to this menu. Unique across all menus when set.
    #[serde(default)]
    pub permission_key: Option<String>,

    /// Optional parent menu.
    #[serde(default)]
    pub parent_id: Option<Uuid>,

    /// Unix timestamp when created.
    #[serde(default)]
    pub created: i64,

    /// Unix timestamp when last changed.
    #[serde(default)]
    pub changed: i64,
}

/// Input for creating or updating a menu.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOrUpdateMenu {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub menu_type: MenuType,
    pub component: Option<String>,
    pub path: Option<String>,
    pub icon: Option<String>,
    #[serde(default)]
    pub sort: String,
    pub target_url: Option<String>,
    pub permission_key: Option<String>,
    pub parent_id: Option<Uuid>,
}

impl CreateOrUpdateMenu {
    /// The requested permission key, with blank keys treated as unbound.
    pub fn normalized_permission_key(&self) -> Option<String> {
        normalize_permission_key(self.permission_key.as_deref()).map(str::to_string)
    }
}

impl From<Menu> for CreateOrUpdateMenu {
    /// Input that rewrites a menu with its current attributes.
    fn from(menu: Menu) -> Self {
        Self {
            name: menu.name,
            display_name: menu.display_name,
            menu_type: menu.menu_type,
            component: menu.component,
            path: menu.path,
            icon: menu.icon,
            sort: menu.sort,
            target_url: menu.target_url,
            permission_key: menu.permission_key,
            parent_id: menu.parent_id,
        }
    }
}

impl Menu {
    /// Build a new menu from create input.
    pub fn new(input: CreateOrUpdateMenu) -> Self {
        let now = chrono::Utc::now().timestamp();
        let permission_key = input.normalized_permission_key();

        Self {
            id: Uuid::now_v7(),
            name: input.name,
            display_name: input.display_name,
            menu_type: input.menu_type,
            component: input.component,
            path: input.path,
            icon: input.icon,
            sort: input.sort,
            target_url: input.target_url,
            permission_key,
            parent_id: input.parent_id,
            created: now,
            changed: now,
        }
    }

    /// Overwrite every mutable attribute from update input.
    pub fn apply(&mut self, input: CreateOrUpdateMenu) {
        self.permission_key = input.normalized_permission_key();
        self.name = input.name;
        self.display_name = input.display_name;
        self.menu_type = input.menu_type;
        self.component = input.component;
        self.path = input.path;
        self.icon = input.icon;
        self.sort = input.sort;
        self.target_url = input.target_url;
        self.parent_id = input.parent_id;
        self.changed = chrono::Utc::now().timestamp();
    }
}

/// Treat empty and whitespace-only keys as "no binding".
pub fn normalize_permission_key(key: Option<&str>) -> Option<&str> {
    key.filter(|k| !k.trim().is_empty())
}

/// Filter applied by persistence before a flat snapshot reaches the tree builder.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuFilter {
    /// Exact menu type.
    pub menu_type: Option<MenuType>,
    /// Case-sensitive substring of the display name. Blank means no filter.
    pub name: Option<String>,
}

impl MenuFilter {
    /// Check whether a menu passes this filter.
    pub fn matches(&self, menu: &Menu) -> bool {
        if let Some(menu_type) = self.menu_type
            && menu.menu_type != menu_type
        {
            return false;
        }

        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => menu.display_name.contains(name),
            _ => true,
        }
    }
}
