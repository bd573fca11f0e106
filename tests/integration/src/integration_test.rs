//! End-to-end integration test for the provisioning path
//!
//! This test exercises the complete flow: config loading -> owner
//! registration -> validation -> persistence -> reload.

use std::collections::BTreeMap;

use prov_core::{Error, Inventory, QuotaDeltas, StateSnapshot, SyncEntity, SyncState};
use prov_meta::{ConfigResolver, OwnerKey, QuotaRegistry};
use prov_test_utils::{TestProject, standard_inventory};
use tempfile::TempDir;

fn deltas(pairs: &[(&str, f64)]) -> QuotaDeltas {
    pairs.iter().map(|(n, d)| (n.to_string(), *d)).collect()
}

#[test]
fn test_end_to_end_scenario() {
    let (inventory, tree) = standard_inventory();
    let owner = tree.membership;

    let _commitment = inventory
        .validate(owner, deltas(&[("storage", 40.0), ("vcpu", 2.0)]))
        .unwrap();
    assert_eq!(inventory.get(&owner, "storage").unwrap().usage, 90.0);
    assert_eq!(inventory.get(&owner, "vcpu").unwrap().usage, 6.0);

    let err = inventory
        .validate(owner, deltas(&[("storage", 20.0)]))
        .unwrap_err();
    let Error::QuotaExceeded(violations) = err else {
        panic!("expected QuotaExceeded, got {err:?}");
    };
    assert_eq!(violations.names(), vec!["storage"]);
    let storage = violations.get("storage").unwrap();
    assert_eq!(storage.limit, 100.0);
    assert_eq!(storage.usage, 90.0);
    assert_eq!(storage.requested_total, 110.0);

    assert_eq!(inventory.get(&owner, "storage").unwrap().usage, 90.0);
    assert_eq!(inventory.get(&owner, "vcpu").unwrap().usage, 6.0);
}

#[test]
fn test_config_defaults_flow_into_new_owners() {
    let project = TestProject::new();
    project.write_config(&[
        ("customer", "nc_project_count", 3.0),
        ("cloud_project_membership", "storage", 2048.0),
        ("cloud_project_membership", "floating_ip_count", 2.0),
    ]);
    let user_dir = TempDir::new().unwrap();

    let config = ConfigResolver::with_user_config_dir(project.root(), user_dir.path().to_path_buf())
        .resolve()
        .unwrap();
    let inventory = Inventory::from_config(&config);

    inventory.register_owner(OwnerKey::customer(1), None).unwrap();
    inventory
        .register_owner(OwnerKey::project(1), Some(OwnerKey::customer(1)))
        .unwrap();
    inventory
        .register_owner(OwnerKey::membership(1), Some(OwnerKey::project(1)))
        .unwrap();

    let state = inventory.quota_state(&OwnerKey::membership(1)).unwrap();
    assert_eq!(state["storage"].limit, 2048.0);
    assert_eq!(state["floating_ip_count"].limit, 2.0);
    assert_eq!(state["vcpu"].limit, 0.0);

    let customer = inventory
        .get(&OwnerKey::customer(1), "nc_project_count")
        .unwrap();
    assert_eq!((customer.limit, customer.usage), (3.0, 1.0));

    assert_eq!(config.state_path, project.state_path());
}

#[test]
fn test_state_survives_reload() {
    let project = TestProject::new();
    let (inventory, tree) = standard_inventory();
    let _commitment = inventory
        .validate(tree.membership, deltas(&[("storage", 10.0)]))
        .unwrap();
    inventory
        .begin_syncing(&SyncEntity::membership(tree.membership.id))
        .unwrap();

    inventory.snapshot().save(&project.state_path()).unwrap();
    project.assert_file_contains(".provisioning/state.toml", "state = \"syncing\"");

    let snapshot = StateSnapshot::load(&project.state_path()).unwrap();
    let reloaded =
        Inventory::restore(QuotaRegistry::with_builtins(), BTreeMap::new(), &snapshot).unwrap();

    assert_eq!(
        reloaded.quota_state(&tree.membership).unwrap(),
        inventory.quota_state(&tree.membership).unwrap()
    );
    assert_eq!(
        reloaded
            .sync_state(&SyncEntity::membership(tree.membership.id))
            .unwrap(),
        SyncState::Syncing
    );
}
