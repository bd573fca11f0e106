//! Lifecycle scenarios across owners, provisioning and reconciliation

use std::sync::{Arc, Barrier};
use std::thread;

use prov_core::{Error, InstanceSpec, QuotaDeltas, ResourceAllocation, SyncEntity, SyncState};
use prov_meta::{OwnerKey, OwnerType};
use prov_test_utils::standard_inventory;

#[test]
fn test_reconciliation_cycle_gates_provisioning() {
    let (inventory, tree) = standard_inventory();
    let entity = SyncEntity::membership(tree.membership.id);
    let allocation = ResourceAllocation::new(tree.membership).with("storage", 5.0);

    // Scheduled, syncing and synced all admit work
    let _ = inventory.validate_allocation(&allocation).unwrap();
    inventory.begin_syncing(&entity).unwrap();
    let _ = inventory.validate_allocation(&allocation).unwrap();
    inventory.set_in_sync(&entity).unwrap();
    assert!(inventory.sync_state(&entity).unwrap().is_stable());
    let _ = inventory.validate_allocation(&allocation).unwrap();

    inventory.set_erred(&entity).unwrap();
    let err = inventory.validate_allocation(&allocation).unwrap_err();
    assert!(matches!(err, Error::OwnerNotSynced { .. }));
    assert_eq!(inventory.get(&tree.membership, "storage").unwrap().usage, 65.0);

    // Only an administrative reset leaves erred
    assert!(matches!(
        inventory.schedule_syncing(&entity),
        Err(Error::InvalidTransition { .. })
    ));
    assert_eq!(inventory.reset(&entity).unwrap(), SyncState::Scheduled);
    let _ = inventory.validate_allocation(&allocation).unwrap();
}

#[test]
fn test_instances_across_memberships_roll_up_for_reporting() {
    let (inventory, tree) = standard_inventory();
    let second = OwnerKey::membership(2);
    inventory.register_owner(second, Some(tree.project)).unwrap();
    inventory.set_limit(&second, "storage", 100.0).unwrap();
    inventory.set_limit(&second, "vcpu", 8.0).unwrap();
    inventory.set_limit(&second, "ram", 4096.0).unwrap();
    inventory.set_limit(&second, "max_instances", 1.0).unwrap();

    let spec = InstanceSpec {
        cores: 2.0,
        ram: 1024.0,
        system_volume_size: 10.0,
        data_volume_size: 20.0,
    };
    let _ = inventory
        .validate_allocation(&ResourceAllocation::for_instance(second, &spec))
        .unwrap();

    // max_instances is now full on the second membership
    assert!(matches!(
        inventory.validate_allocation(&ResourceAllocation::for_instance(second, &spec)),
        Err(Error::QuotaExceeded(_))
    ));

    let flat = inventory
        .sum_across_owners(OwnerType::CloudProjectMembership, &[], &["storage", "vcpu"])
        .unwrap()
        .to_flat_map();
    assert_eq!(flat["storage"], 200.0);
    assert_eq!(flat["storage_usage"], 80.0);
    assert_eq!(flat["vcpu_usage"], 6.0);

    assert!(matches!(
        inventory.sum_over(&[tree.membership, tree.project], &[]),
        Err(Error::MixedOwnerType { .. })
    ));
}

#[test]
fn test_concurrent_validation_through_inventory() {
    let (inventory, tree) = standard_inventory();
    inventory.set_usage(&tree.membership, "storage", 50.0).unwrap();
    let inventory = Arc::new(inventory);

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let inventory = inventory.clone();
            let barrier = barrier.clone();
            let owner = tree.membership;
            thread::spawn(move || {
                barrier.wait();
                inventory
                    .validate(owner, QuotaDeltas::from([("storage".to_string(), 30.0)]))
                    .is_ok()
            })
        })
        .collect();

    let admitted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(admitted, 1);
    assert_eq!(inventory.get(&tree.membership, "storage").unwrap().usage, 80.0);
}

#[test]
fn test_removing_customer_drops_whole_tree() {
    let (inventory, tree) = standard_inventory();
    inventory
        .register_owner(OwnerKey::project_group(1), Some(tree.customer))
        .unwrap();

    let removed = inventory.remove_owner(&tree.customer).unwrap();

    assert_eq!(removed.len(), 4);
    assert_eq!(removed.last(), Some(&tree.customer));
    assert!(inventory.ledger().owners().is_empty());
    assert!(inventory.sync().records().is_empty());
}
