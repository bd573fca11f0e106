//! Inventory fixtures

use prov_core::Inventory;
use prov_meta::{OwnerKey, QuotaRegistry};

/// Keys of the owners created by [`standard_inventory`]
#[derive(Debug, Clone, Copy)]
pub struct StandardTree {
    pub customer: OwnerKey,
    pub project: OwnerKey,
    pub membership: OwnerKey,
}

impl Default for StandardTree {
    fn default() -> Self {
        Self {
            customer: OwnerKey::customer(1),
            project: OwnerKey::project(1),
            membership: OwnerKey::membership(1),
        }
    }
}

/// Inventory with one customer, one project and one membership
///
/// The membership starts with `storage` 100/50 and `vcpu` 8/4, and
/// `ram` 4096/0. Other quotas keep a zero limit.
///
/// # Panics
/// Panics if any registration fails.
pub fn standard_inventory() -> (Inventory, StandardTree) {
    let tree = StandardTree::default();
    let inventory = Inventory::new(QuotaRegistry::with_builtins());

    inventory
        .register_owner(tree.customer, None)
        .unwrap_or_else(|e| panic!("standard_inventory: customer: {e}"));
    inventory
        .register_owner(tree.project, Some(tree.customer))
        .unwrap_or_else(|e| panic!("standard_inventory: project: {e}"));
    inventory
        .register_owner(tree.membership, Some(tree.project))
        .unwrap_or_else(|e| panic!("standard_inventory: membership: {e}"));

    for (name, limit, usage) in [("storage", 100.0, 50.0), ("vcpu", 8.0, 4.0), ("ram", 4096.0, 0.0)] {
        inventory
            .set_limit(&tree.membership, name, limit)
            .unwrap_or_else(|e| panic!("standard_inventory: limit {name}: {e}"));
        inventory
            .set_usage(&tree.membership, name, usage)
            .unwrap_or_else(|e| panic!("standard_inventory: usage {name}: {e}"));
    }

    (inventory, tree)
}
