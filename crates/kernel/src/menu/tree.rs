//! Menu tree builder.
//!
//! Rebuilds the navigation forest from a flat menu snapshot. Menus whose
//! parent is missing from the snapshot (for example because a filter removed
//! it) are adopted as roots. Every level is ordered by sort key using byte
//! order, so "10" sorts before "9".

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{MenuError, MenuResult};
use crate::models::Menu;

/// Deepest level a menu may sit at; roots are level 1.
pub const MAX_MENU_DEPTH: usize = 32;

/// A menu with its ordered children.
///
/// Serializes as the menu's own fields plus a `children` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuNode {
    #[serde(flatten)]
    pub menu: Menu,
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    pub fn id(&self) -> Uuid {
        self.menu.id
    }

    /// Number of nodes in this subtree, this node included.
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(MenuNode::subtree_size).sum::<usize>()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

struct TreeBuilder<'a> {
    children_by_parent: HashMap<Uuid, Vec<&'a Menu>>,
    /// Ids on the path from the current root to the node being built.
    ancestors: HashSet<Uuid>,
    reached: HashSet<Uuid>,
}

impl<'a> TreeBuilder<'a> {
    fn node(&mut self, menu: &'a Menu) -> MenuResult<MenuNode> {
        if self.ancestors.len() >= MAX_MENU_DEPTH {
            return Err(MenuError::MenuTooDeep {
                menu_id: menu.id,
                max_depth: MAX_MENU_DEPTH,
            });
        }
        if !self.ancestors.insert(menu.id) {
            return Err(MenuError::CyclicMenuReference { menu_id: menu.id });
        }
        self.reached.insert(menu.id);

        let kids = self
            .children_by_parent
            .get(&menu.id)
            .cloned()
            .unwrap_or_default();

        let mut children = Vec::with_capacity(kids.len());
        for child in kids {
            children.push(self.node(child)?);
        }

        self.ancestors.remove(&menu.id);

        Ok(MenuNode {
            menu: menu.clone(),
            children,
        })
    }
}

/// Build the ordered menu forest from a flat list.
///
/// Roots are menus without a parent plus orphans whose parent id matches no
/// menu in `menus`. Fails with [`MenuError::CyclicMenuReference`] when a
/// parent chain loops, either on a path reachable from a root or among menus
/// that no root reaches, and with [`MenuError::MenuTooDeep`] when a branch is
/// deeper than [`MAX_MENU_DEPTH`].
pub fn build_tree(menus: &[Menu]) -> MenuResult<Vec<MenuNode>> {
    let ids: HashSet<Uuid> = menus.iter().map(|m| m.id).collect();

    let mut children_by_parent: HashMap<Uuid, Vec<&Menu>> = HashMap::new();
    for menu in menus {
        if let Some(parent_id) = menu.parent_id {
            children_by_parent.entry(parent_id).or_default().push(menu);
        }
    }

    let mut builder = TreeBuilder {
        children_by_parent,
        ancestors: HashSet::new(),
        reached: HashSet::with_capacity(menus.len()),
    };

    let mut roots = Vec::new();
    for menu in menus {
        let is_root = match menu.parent_id {
            None => true,
            Some(parent_id) if !ids.contains(&parent_id) => {
                debug!(menu_id = %menu.id, %parent_id, "adopting orphan menu as root");
                true
            }
            Some(_) => false,
        };

        if is_root {
            roots.push(builder.node(menu)?);
        }
    }

    if let Some(stray) = menus.iter().find(|m| !builder.reached.contains(&m.id)) {
        warn!(menu_id = %stray.id, "menu unreachable from any root, parent chain is cyclic");
        return Err(MenuError::CyclicMenuReference { menu_id: stray.id });
    }

    sort_level(&mut roots);
    Ok(roots)
}

/// Check that `menu_id` may be placed under `parent_id` within `menus`.
///
/// `menu_id` need not exist yet. Fails with [`MenuError::InvalidParent`]
/// when the parent is the menu itself or one of its descendants, and with
/// [`MenuError::MenuTooDeep`] when the moved subtree would end up deeper
/// than [`MAX_MENU_DEPTH`]. A parent missing from `menus` counts as a root.
pub fn check_placement(menus: &[Menu], menu_id: Uuid, parent_id: Uuid) -> MenuResult<()> {
    let parents: HashMap<Uuid, Option<Uuid>> =
        menus.iter().map(|m| (m.id, m.parent_id)).collect();

    // Level of the parent, found by walking up to its root.
    let mut parent_level = 0;
    let mut seen = HashSet::new();
    let mut cursor = Some(parent_id);
    while let Some(current) = cursor {
        if current == menu_id {
            return Err(MenuError::InvalidParent { menu_id, parent_id });
        }
        if !seen.insert(current) {
            return Err(MenuError::CyclicMenuReference { menu_id: current });
        }
        parent_level += 1;
        cursor = parents.get(&current).copied().flatten();
    }

    // Height of the subtree rooted at the moved menu, itself included.
    let mut children_by_parent: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for menu in menus {
        if let Some(parent) = menu.parent_id {
            children_by_parent.entry(parent).or_default().push(menu.id);
        }
    }
    let mut height = 1;
    let mut level = vec![menu_id];
    let mut visited = HashSet::from([menu_id]);
    loop {
        let next: Vec<Uuid> = level
            .iter()
            .filter_map(|id| children_by_parent.get(id))
            .flatten()
            .copied()
            .filter(|id| visited.insert(*id))
            .collect();
        if next.is_empty() {
            break;
        }
        height += 1;
        level = next;
    }

    if parent_level + height > MAX_MENU_DEPTH {
        return Err(MenuError::MenuTooDeep {
            menu_id,
            max_depth: MAX_MENU_DEPTH,
        });
    }
    Ok(())
}

/// Order siblings by sort key, recursively. Ties keep their input order.
fn sort_level(nodes: &mut [MenuNode]) {
    nodes.sort_by(|a, b| a.menu.sort.as_bytes().cmp(b.menu.sort.as_bytes()));
    for node in nodes.iter_mut() {
        sort_level(&mut node.children);
    }
}
