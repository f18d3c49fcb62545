//! Menu management core.
//!
//! - `tree`: rebuilds the ordered navigation forest from a flat snapshot
//! - `binding`: enforces one menu per permission key and migrates grants
//! - `policy`: assembles the permission policy list for the menu editor
//! - `service`: policy-guarded operations over a unit of work

mod binding;
mod policy;
mod service;
mod tree;

pub use binding::{
    BindingValidator, apply_grant_transfers, plan_grant_transfers,
    sync_grants_on_permission_change,
};
pub use policy::assemble_policies;
pub use service::{MenuService, MenuUpdate, PagedResult};
pub use tree::{MAX_MENU_DEPTH, MenuNode, build_tree, check_placement};
