//! Inventory facade
//!
//! [`Inventory`] wires the hierarchy, the quota ledger, the sync tracker,
//! the validator and the structure event handlers together. It is the
//! surface request handlers and the CLI talk to.

use std::collections::BTreeMap;
use std::sync::Arc;

use prov_meta::config::default_limit;
use prov_meta::{DefaultLimits, OwnerKey, OwnerType, QuotaRegistry, ResolvedConfig};

use crate::events::{EventDispatcher, EventHandler, QuotaEventHandler, StructureEvent};
use crate::owner::OwnershipHierarchy;
use crate::provision::{Commitment, ProvisioningValidator, ResizeRequest, ResourceAllocation};
use crate::quota::{Quota, QuotaDeltas, QuotaLedger, QuotaSums};
use crate::store::{OwnerRecord, QuotaRecord, StateSnapshot, SyncEntry};
use crate::sync::{SyncEntity, SyncEntityKind, SyncEvent, SyncRecord, SyncState, SyncTracker};
use crate::{Error, Result};

/// Owners, their quotas and sync state behind one handle
#[derive(Debug)]
pub struct Inventory {
    hierarchy: OwnershipHierarchy,
    ledger: Arc<QuotaLedger>,
    sync: Arc<SyncTracker>,
    validator: ProvisioningValidator,
    events: EventDispatcher,
    defaults: DefaultLimits,
}

impl Inventory {
    /// Empty inventory with zero default limits
    pub fn new(registry: QuotaRegistry) -> Self {
        let ledger = Arc::new(QuotaLedger::new());
        let sync = Arc::new(SyncTracker::new());
        let mut events = EventDispatcher::new();
        events.register(Arc::new(QuotaEventHandler::new(ledger.clone())));

        Self {
            hierarchy: OwnershipHierarchy::new(registry),
            validator: ProvisioningValidator::new(ledger.clone(), sync.clone()),
            ledger,
            sync,
            events,
            defaults: DefaultLimits::new(),
        }
    }

    /// Empty inventory with the built-in registry and configured defaults
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(QuotaRegistry::with_builtins()).with_defaults(config.defaults.clone())
    }

    pub fn with_defaults(mut self, defaults: DefaultLimits) -> Self {
        self.defaults = defaults;
        self
    }

    /// Add an event handler after the built-in quota handler
    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.events.register(handler);
    }

    pub fn hierarchy(&self) -> &OwnershipHierarchy {
        &self.hierarchy
    }

    pub fn ledger(&self) -> &Arc<QuotaLedger> {
        &self.ledger
    }

    pub fn sync(&self) -> &Arc<SyncTracker> {
        &self.sync
    }

    pub fn validator(&self) -> &ProvisioningValidator {
        &self.validator
    }

    // ---- owners ----

    /// Register an owner, create its quotas at their default limits and,
    /// for memberships, start tracking its sync state
    ///
    /// Registering a project publishes [`StructureEvent::ProjectCreated`].
    /// If anything fails, every step already taken is undone.
    pub fn register_owner(&self, owner: OwnerKey, parent: Option<OwnerKey>) -> Result<()> {
        self.hierarchy.add(owner, parent)?;

        let limits: Vec<(String, f64)> = self
            .hierarchy
            .quota_names_for(owner.owner_type)?
            .iter()
            .map(|name| {
                let limit = default_limit(&self.defaults, owner.owner_type, name);
                (name.clone(), limit)
            })
            .collect();

        if let Err(err) = self.ledger.create_owner(owner, limits) {
            self.hierarchy.remove(&owner)?;
            return Err(err);
        }

        if let Some(entity) = SyncEntity::for_owner(&owner) {
            self.sync.track(entity);
        }

        if let (OwnerType::Project, Some(customer)) = (owner.owner_type, parent) {
            let event = StructureEvent::ProjectCreated {
                customer,
                project: owner,
            };
            if let Err(err) = self.events.publish(&event) {
                self.drop_owner_records(&owner);
                self.hierarchy.remove(&owner)?;
                return Err(err);
            }
        }

        tracing::info!(%owner, parent = ?parent.map(|p| p.to_string()), "Registered owner");
        Ok(())
    }

    /// Remove an owner with everything it contains
    ///
    /// Returns the removed owners, descendants first. Each removed project
    /// publishes [`StructureEvent::ProjectDeleted`]. A failing handler is
    /// logged and does not undo the removal.
    pub fn remove_owner(&self, owner: &OwnerKey) -> Result<Vec<OwnerKey>> {
        let parents: BTreeMap<OwnerKey, Option<OwnerKey>> = self.hierarchy.entries().into_iter().collect();
        let removed = self.hierarchy.remove(owner)?;

        for key in &removed {
            self.drop_owner_records(key);
        }

        for key in removed.iter().filter(|key| key.owner_type == OwnerType::Project) {
            let Some(Some(customer)) = parents.get(key) else {
                continue;
            };
            if removed.contains(customer) {
                continue;
            }
            let event = StructureEvent::ProjectDeleted {
                customer: *customer,
                project: *key,
            };
            if let Err(err) = self.events.publish(&event) {
                tracing::warn!(project = %key, %customer, error = %err, "Project deletion event failed");
            }
        }

        tracing::info!(%owner, removed = removed.len(), "Removed owner");
        Ok(removed)
    }

    /// The owner followed by its ancestors, nearest first
    pub fn resolve_owner_chain(&self, owner: &OwnerKey) -> Result<Vec<OwnerKey>> {
        self.hierarchy.resolve_owner_chain(owner)
    }

    pub fn parent_of(&self, owner: &OwnerKey) -> Result<Option<OwnerKey>> {
        self.hierarchy.parent_of(owner)
    }

    /// Count a user role granted under a customer
    pub fn grant_user_role(&self, customer: OwnerKey) -> Result<()> {
        self.ensure_type(&customer, OwnerType::Customer)?;
        self.events
            .publish(&StructureEvent::UserRoleGranted { customer })
    }

    pub fn revoke_user_role(&self, customer: OwnerKey) -> Result<()> {
        self.ensure_type(&customer, OwnerType::Customer)?;
        self.events
            .publish(&StructureEvent::UserRoleRevoked { customer })
    }

    // ---- quotas ----

    pub fn get(&self, owner: &OwnerKey, name: &str) -> Result<Quota> {
        self.ledger.get(owner, name)
    }

    pub fn quota_state(&self, owner: &OwnerKey) -> Result<BTreeMap<String, Quota>> {
        self.ledger.quota_state(owner)
    }

    pub fn set_limit(&self, owner: &OwnerKey, name: &str, limit: f64) -> Result<()> {
        self.ledger.set_limit(owner, name, limit)
    }

    pub fn set_usage(&self, owner: &OwnerKey, name: &str, usage: f64) -> Result<()> {
        self.ledger.set_usage(owner, name, usage)
    }

    /// Sum limits and usage over owners of one type
    ///
    /// Empty `ids` sums every registered owner of the type; empty `names`
    /// sums every quota name the registry declares for it.
    pub fn sum_across_owners(
        &self,
        owner_type: OwnerType,
        ids: &[u64],
        names: &[&str],
    ) -> Result<QuotaSums> {
        let registered = self.hierarchy.quota_names_for(owner_type)?;

        let owners: Vec<OwnerKey> = if ids.is_empty() {
            self.hierarchy.owners_of_type(owner_type)
        } else {
            ids.iter().map(|id| owner_type.key(*id)).collect()
        };

        let names: Vec<&str> = if names.is_empty() {
            registered.iter().map(String::as_str).collect()
        } else {
            names.to_vec()
        };

        self.ledger.sum_across_owners(&owners, &names)
    }

    /// Sum over an explicit list of owners, which must share one type
    pub fn sum_over(&self, owners: &[OwnerKey], names: &[&str]) -> Result<QuotaSums> {
        self.ledger.sum_across_owners(owners, names)
    }

    // ---- provisioning ----

    pub fn validate(&self, owner: OwnerKey, deltas: QuotaDeltas) -> Result<Commitment> {
        self.validator
            .validate(&ResourceAllocation::from_deltas(owner, deltas))
    }

    pub fn validate_allocation(&self, allocation: &ResourceAllocation) -> Result<Commitment> {
        self.validator.validate(allocation)
    }

    pub fn validate_resize(&self, owner: OwnerKey, request: &ResizeRequest) -> Result<Commitment> {
        self.validator.validate_resize(owner, request)
    }

    pub fn release(&self, commitment: Commitment) -> Result<()> {
        self.validator.release(commitment)
    }

    /// Return the usage of a deleted resource
    pub fn resource_deleted(&self, allocation: ResourceAllocation) -> Result<()> {
        self.events
            .publish(&StructureEvent::ResourceDeleted { allocation })
    }

    // ---- sync ----

    /// Start tracking a customer's cloud account
    pub fn register_cloud(&self, id: u64) -> SyncState {
        self.sync.track(SyncEntity::cloud(id))
    }

    pub fn remove_cloud(&self, id: u64) -> Result<SyncRecord> {
        let entity = SyncEntity::cloud(id);
        self.sync
            .untrack(&entity)
            .ok_or(Error::SyncEntityNotFound { entity })
    }

    pub fn sync_state(&self, entity: &SyncEntity) -> Result<SyncState> {
        self.sync.state(entity)
    }

    pub fn apply_sync_event(&self, entity: &SyncEntity, event: SyncEvent) -> Result<SyncState> {
        self.sync.apply(entity, event)
    }

    pub fn begin_syncing(&self, entity: &SyncEntity) -> Result<SyncState> {
        self.sync.begin_syncing(entity)
    }

    pub fn schedule_syncing(&self, entity: &SyncEntity) -> Result<SyncState> {
        self.sync.schedule_syncing(entity)
    }

    pub fn set_in_sync(&self, entity: &SyncEntity) -> Result<SyncState> {
        self.sync.set_in_sync(entity)
    }

    pub fn set_erred(&self, entity: &SyncEntity) -> Result<SyncState> {
        self.sync.set_erred(entity)
    }

    pub fn reset(&self, entity: &SyncEntity) -> Result<SyncState> {
        self.sync.reset(entity)
    }

    // ---- persistence ----

    /// Capture the whole inventory
    pub fn snapshot(&self) -> StateSnapshot {
        let owners = self
            .hierarchy
            .entries()
            .into_iter()
            .map(|(owner, parent)| OwnerRecord::new(owner, parent))
            .collect();

        let quotas = self
            .ledger
            .owners()
            .into_iter()
            .filter_map(|owner| {
                self.ledger
                    .quota_state(&owner)
                    .ok()
                    .map(|quotas| (owner, quotas))
            })
            .flat_map(|(owner, quotas)| {
                quotas
                    .into_values()
                    .map(move |quota| QuotaRecord::new(owner, &quota))
            })
            .collect();

        let sync = self
            .sync
            .records()
            .into_iter()
            .map(|(entity, record)| SyncEntry::new(entity, record))
            .collect();

        StateSnapshot {
            owners,
            quotas,
            sync,
            ..StateSnapshot::default()
        }
    }

    /// Rebuild an inventory from a snapshot
    ///
    /// Owners are restored parents first. Quota rows and sync records that
    /// point at an unknown owner are skipped with a warning. No structure
    /// events are published.
    pub fn restore(
        registry: QuotaRegistry,
        defaults: DefaultLimits,
        snapshot: &StateSnapshot,
    ) -> Result<Self> {
        let inventory = Self::new(registry).with_defaults(defaults);

        let mut owners = snapshot.owners.clone();
        owners.sort_by_key(|record| record.owner());
        for record in &owners {
            inventory.hierarchy.add(record.owner(), record.parent())?;
        }

        let mut quotas: BTreeMap<OwnerKey, BTreeMap<String, Quota>> = BTreeMap::new();
        for record in &snapshot.quotas {
            let owner = record.owner();
            if !inventory.hierarchy.contains(&owner) {
                tracing::warn!(%owner, quota = %record.name, "Skipping quota of unknown owner");
                continue;
            }
            quotas
                .entry(owner)
                .or_default()
                .insert(record.name.clone(), record.to_quota());
        }
        for record in &owners {
            let owner = record.owner();
            let rows = quotas.remove(&owner).unwrap_or_default();
            inventory.ledger.insert_owner(owner, rows)?;
        }

        for entry in &snapshot.sync {
            let entity = entry.entity();
            let orphan = entry.kind == SyncEntityKind::CloudProjectMembership
                && !inventory.hierarchy.contains(&OwnerKey::membership(entity.id));
            if orphan {
                tracing::warn!(%entity, "Skipping sync record of unknown membership");
                continue;
            }
            inventory.sync.restore(entity, entry.record());
        }

        Ok(inventory)
    }

    fn drop_owner_records(&self, owner: &OwnerKey) {
        self.ledger.remove_owner(owner);
        if let Some(entity) = SyncEntity::for_owner(owner) {
            self.sync.untrack(&entity);
        }
    }

    fn ensure_type(&self, owner: &OwnerKey, owner_type: OwnerType) -> Result<()> {
        if owner.owner_type != owner_type {
            return Err(Error::invalid_request(format!(
                "expected a {} owner, got {}",
                owner_type, owner
            )));
        }
        if !self.hierarchy.contains(owner) {
            return Err(Error::OwnerNotFound { owner: *owner });
        }
        Ok(())
    }
}
