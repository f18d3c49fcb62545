//! Permission policy assembler.
//!
//! Produces the two-level policy list the menu editor offers when binding a
//! permission. Each entry repeats itself as its own first child; the editor
//! relies on that shape.

use crate::localization::Localizer;
use crate::models::{PermissionGroup, PolicyNode, TenancySide};

/// Flatten permission groups into policy nodes visible on `side`.
///
/// Empty groups are skipped. A permission hidden on `side` is skipped along
/// with its children. Input order is preserved.
pub fn assemble_policies(
    groups: &[PermissionGroup],
    side: TenancySide,
    localizer: &dyn Localizer,
) -> Vec<PolicyNode> {
    let mut policies = Vec::new();

    for group in groups.iter().filter(|g| !g.permissions.is_empty()) {
        for permission in group.permissions.iter().filter(|p| p.applies_to(side)) {
            let display_name = localizer.localize(&permission.display_name);

            let mut children = vec![PolicyNode::leaf(&permission.name, &display_name)];
            children.extend(
                permission
                    .children
                    .iter()
                    .filter(|c| c.applies_to(side))
                    .map(|c| PolicyNode::leaf(&c.name, localizer.localize(&c.display_name))),
            );

            policies.push(PolicyNode {
                name: permission.name.clone(),
                display_name,
                children,
            });
        }
    }

    policies
}
