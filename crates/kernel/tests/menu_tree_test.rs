#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Menu tree integration tests.
//!
//! Lists menus through the real service and in-memory store, covering
//! orphan adoption under filters and the structural properties of the forest.

use std::collections::HashMap;

use menudesk_kernel::MenuError;
use menudesk_kernel::menu::{MenuNode, build_tree};
use menudesk_kernel::models::{Menu, MenuFilter, MenuType};
use menudesk_test_utils::{TestData, id, test_menu, test_service};
use uuid::Uuid;

fn ids(nodes: &[MenuNode]) -> Vec<Uuid> {
    nodes.iter().map(MenuNode::id).collect()
}

/// Count how often each id appears anywhere in the forest.
fn occurrences(nodes: &[MenuNode], seen: &mut HashMap<Uuid, usize>) {
    for node in nodes {
        *seen.entry(node.id()).or_default() += 1;
        occurrences(&node.children, seen);
    }
}

fn assert_siblings_sorted(nodes: &[MenuNode]) {
    for pair in nodes.windows(2) {
        assert!(
            pair[0].menu.sort.as_bytes() <= pair[1].menu.sort.as_bytes(),
            "'{}' sorted after '{}'",
            pair[0].menu.sort,
            pair[1].menu.sort
        );
    }
    for node in nodes {
        assert_siblings_sorted(&node.children);
    }
}

/// Deterministic pseudo-random forest: every menu's parent is an earlier
/// menu, nothing, or an id outside the set.
fn generated_menus(seed: u64, count: u128) -> Vec<Menu> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        state >> 33
    };

    (1..=count)
        .map(|n| {
            let sort = (next() % 20).to_string();
            let mut menu = test_menu(n, &format!("Menu {n}")).with_sort(&sort);
            match next() % 4 {
                0 => {}
                1 => menu = menu.with_parent(10_000 + n),
                _ if n > 1 => menu = menu.with_parent(1 + u128::from(next()) % (n - 1)),
                _ => {}
            }
            menu.build()
        })
        .collect()
}

// -------------------------------------------------------------------------
// Listing through the service
// -------------------------------------------------------------------------

#[tokio::test]
async fn list_adopts_orphans_and_orders_children() {
    let store = TestData::new()
        .menu(test_menu(1, "Home").with_sort("1"))
        .menu(test_menu(2, "Settings").with_parent(1).with_sort("2"))
        .menu(test_menu(3, "Profile").with_parent(1).with_sort("1"))
        .menu(test_menu(4, "Lost").with_parent(99).with_sort("1"))
        .store();
    let service = test_service(&store);

    let result = service.list(&MenuFilter::default()).await.unwrap();

    assert_eq!(result.total_count, 4);
    assert_eq!(ids(&result.items), vec![id(1), id(4)]);
    assert_eq!(ids(&result.items[0].children), vec![id(3), id(2)]);
}

#[tokio::test]
async fn name_filter_promotes_children_of_filtered_parents() {
    let store = TestData::new()
        .menu(test_menu(1, "Admin").with_sort("1"))
        .menu(test_menu(2, "User list").with_parent(1).with_sort("2"))
        .menu(test_menu(3, "User roles").with_parent(1).with_sort("1"))
        .menu(test_menu(4, "Audit").with_parent(1).with_sort("3"))
        .store();
    let service = test_service(&store);

    let filter = MenuFilter {
        name: Some("User".to_string()),
        ..Default::default()
    };
    let result = service.list(&filter).await.unwrap();

    assert_eq!(result.total_count, 2);
    assert_eq!(ids(&result.items), vec![id(3), id(2)]);
    assert!(result.items.iter().all(MenuNode::is_leaf));
}

#[tokio::test]
async fn name_filter_is_case_sensitive() {
    let store = TestData::new()
        .menu(test_menu(1, "Users"))
        .menu(test_menu(2, "superusers"))
        .store();
    let service = test_service(&store);

    let filter = MenuFilter {
        name: Some("Users".to_string()),
        ..Default::default()
    };
    let result = service.list(&filter).await.unwrap();
    assert_eq!(ids(&result.items), vec![id(1)]);
}

#[tokio::test]
async fn type_filter_keeps_matching_menus_only() {
    let store = TestData::new()
        .menu(test_menu(1, "Content").with_sort("1"))
        .menu(test_menu(2, "Posts").with_parent(1).with_sort("1").page())
        .menu(test_menu(3, "Tags").with_parent(1).with_sort("0").page())
        .store();
    let service = test_service(&store);

    let filter = MenuFilter {
        menu_type: Some(MenuType::Page),
        ..Default::default()
    };
    let result = service.list(&filter).await.unwrap();

    assert_eq!(result.total_count, 2);
    assert_eq!(ids(&result.items), vec![id(3), id(2)]);
}

#[tokio::test]
async fn list_reports_cyclic_data() {
    let store = TestData::new()
        .menu(test_menu(1, "Home"))
        .menu(test_menu(2, "A").with_parent(3))
        .menu(test_menu(3, "B").with_parent(2))
        .store();
    let service = test_service(&store);

    let err = service.list(&MenuFilter::default()).await.unwrap_err();
    assert!(matches!(err, MenuError::CyclicMenuReference { menu_id } if menu_id == id(2)));
}

#[tokio::test]
async fn list_serializes_as_nested_json() {
    let store = TestData::new()
        .menu(test_menu(1, "Home").with_sort("1"))
        .menu(test_menu(2, "Profile").with_parent(1))
        .store();
    let service = test_service(&store);

    let result = service.list(&MenuFilter::default()).await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["total_count"], 2);
    assert_eq!(json["items"][0]["display_name"], "Home");
    assert_eq!(json["items"][0]["children"][0]["display_name"], "Profile");
    assert_eq!(
        json["items"][0]["children"][0]["children"],
        serde_json::json!([])
    );
}

// -------------------------------------------------------------------------
// Forest properties
// -------------------------------------------------------------------------

#[test]
fn every_menu_appears_exactly_once() {
    for seed in 0..50 {
        let menus = generated_menus(seed, 40);
        let tree = build_tree(&menus).unwrap();

        let mut seen = HashMap::new();
        occurrences(&tree, &mut seen);

        assert_eq!(seen.len(), menus.len(), "seed {seed}");
        assert!(seen.values().all(|&n| n == 1), "seed {seed}");
    }
}

#[test]
fn siblings_are_sorted_at_every_depth() {
    for seed in 0..50 {
        let tree = build_tree(&generated_menus(seed, 40)).unwrap();
        assert_siblings_sorted(&tree);
    }
}

#[test]
fn roots_are_exactly_parentless_and_orphaned_menus() {
    for seed in 0..50 {
        let menus = generated_menus(seed, 40);
        let present: Vec<Uuid> = menus.iter().map(|m| m.id).collect();
        let mut expected: Vec<Uuid> = menus
            .iter()
            .filter(|m| m.parent_id.is_none_or(|p| !present.contains(&p)))
            .map(|m| m.id)
            .collect();
        expected.sort();

        let mut roots = ids(&build_tree(&menus).unwrap());
        roots.sort();

        assert_eq!(roots, expected, "seed {seed}");
    }
}
