//! Tests for the provisioning validator and inventory facade

use pretty_assertions::assert_eq;
use prov_core::{
    Error, InstanceSpec, Inventory, QuotaDeltas, ResizeRequest, ResourceAllocation, SyncEntity,
    SyncState,
};
use prov_meta::{OwnerKey, QuotaRegistry};

fn deltas(pairs: &[(&str, f64)]) -> QuotaDeltas {
    pairs.iter().map(|(n, d)| (n.to_string(), *d)).collect()
}

fn setup() -> (Inventory, OwnerKey) {
    let inventory = Inventory::new(QuotaRegistry::with_builtins());
    let membership = OwnerKey::membership(1);
    inventory.register_owner(OwnerKey::customer(1), None).unwrap();
    inventory
        .register_owner(OwnerKey::project(1), Some(OwnerKey::customer(1)))
        .unwrap();
    inventory
        .register_owner(membership, Some(OwnerKey::project(1)))
        .unwrap();

    for (name, limit, usage) in [("storage", 100.0, 50.0), ("vcpu", 8.0, 4.0)] {
        inventory.set_limit(&membership, name, limit).unwrap();
        inventory.set_usage(&membership, name, usage).unwrap();
    }
    (inventory, membership)
}

fn usage(inventory: &Inventory, owner: &OwnerKey) -> (f64, f64) {
    (
        inventory.get(owner, "storage").unwrap().usage,
        inventory.get(owner, "vcpu").unwrap().usage,
    )
}

#[test]
fn test_validate_then_reject_over_limit() {
    let (inventory, membership) = setup();

    let _commitment = inventory
        .validate(membership, deltas(&[("storage", 40.0), ("vcpu", 2.0)]))
        .unwrap();
    assert_eq!(usage(&inventory, &membership), (90.0, 6.0));

    let err = inventory
        .validate(membership, deltas(&[("storage", 20.0)]))
        .unwrap_err();

    let Error::QuotaExceeded(violations) = &err else {
        panic!("expected QuotaExceeded, got {err:?}");
    };
    assert_eq!(violations.len(), 1);
    let storage = violations.get("storage").unwrap();
    assert_eq!(
        (storage.limit, storage.usage, storage.requested_total),
        (100.0, 90.0, 110.0)
    );
    assert!(err.to_string().contains("storage quota limit: 100, usage: 90, requires 110"));
    assert_eq!(usage(&inventory, &membership), (90.0, 6.0));
}

#[test]
fn test_erred_membership_blocks_provisioning() {
    let (inventory, membership) = setup();
    let entity = SyncEntity::membership(1);
    inventory.set_erred(&entity).unwrap();

    let err = inventory
        .validate(membership, deltas(&[("storage", 1.0)]))
        .unwrap_err();
    assert!(matches!(err, Error::OwnerNotSynced { state: SyncState::Erred, .. }));

    inventory.reset(&entity).unwrap();
    let _commitment = inventory
        .validate(membership, deltas(&[("storage", 1.0)]))
        .unwrap();
}

#[test]
fn test_failed_resource_creation_releases_commitment() {
    let (inventory, membership) = setup();

    let commitment = inventory
        .validate(membership, deltas(&[("storage", 10.0)]))
        .unwrap();
    assert_eq!(usage(&inventory, &membership).0, 60.0);

    inventory.release(commitment).unwrap();
    assert_eq!(usage(&inventory, &membership), (50.0, 4.0));
}

#[test]
fn test_instance_lifecycle() {
    let (inventory, membership) = setup();
    inventory.set_limit(&membership, "ram", 4096.0).unwrap();
    inventory.set_limit(&membership, "max_instances", 2.0).unwrap();

    let spec = InstanceSpec {
        cores: 2.0,
        ram: 2048.0,
        system_volume_size: 10.0,
        data_volume_size: 20.0,
    };
    let allocation = ResourceAllocation::for_instance(membership, &spec);
    let _commitment = inventory.validate_allocation(&allocation).unwrap();
    assert_eq!(usage(&inventory, &membership), (80.0, 6.0));
    assert_eq!(inventory.get(&membership, "max_instances").unwrap().usage, 1.0);

    inventory.resource_deleted(allocation).unwrap();
    assert_eq!(usage(&inventory, &membership), (50.0, 4.0));
    assert_eq!(inventory.get(&membership, "ram").unwrap().usage, 0.0);
}

#[test]
fn test_resize_disk_and_flavor() {
    let (inventory, membership) = setup();
    inventory.set_limit(&membership, "ram", 4096.0).unwrap();

    let _disk = inventory
        .validate_resize(membership, &ResizeRequest::disk(20.0, 50.0))
        .unwrap();
    assert_eq!(usage(&inventory, &membership).0, 80.0);

    let _flavor = inventory
        .validate_resize(membership, &ResizeRequest::flavor(2.0, 1024.0, 4.0, 2048.0))
        .unwrap();
    assert_eq!(usage(&inventory, &membership).1, 6.0);
    assert_eq!(inventory.get(&membership, "ram").unwrap().usage, 1024.0);
}

#[test]
fn test_resize_with_disk_and_flavor_is_invalid() {
    let (inventory, membership) = setup();
    let request = ResizeRequest {
        disk_size_delta: Some(10.0),
        vcpu_delta: Some(1.0),
        ram_delta: Some(512.0),
    };

    let err = inventory.validate_resize(membership, &request).unwrap_err();

    assert!(matches!(err, Error::InvalidRequest { .. }));
    assert_eq!(usage(&inventory, &membership), (50.0, 4.0));
}

#[test]
fn test_resize_with_neither_is_invalid() {
    let (inventory, membership) = setup();
    assert!(matches!(
        inventory.validate_resize(membership, &ResizeRequest::default()),
        Err(Error::InvalidRequest { .. })
    ));
}

#[test]
fn test_parent_limits_are_not_enforced() {
    let (inventory, membership) = setup();
    let project = OwnerKey::project(1);
    inventory.set_limit(&project, "storage", 10.0).unwrap();

    let _commitment = inventory
        .validate(membership, deltas(&[("storage", 40.0)]))
        .unwrap();
    assert_eq!(inventory.get(&project, "storage").unwrap().usage, 0.0);
}

#[test]
fn test_owner_chain() {
    let (inventory, membership) = setup();
    assert_eq!(
        inventory.resolve_owner_chain(&membership).unwrap(),
        vec![membership, OwnerKey::project(1), OwnerKey::customer(1)]
    );
}
