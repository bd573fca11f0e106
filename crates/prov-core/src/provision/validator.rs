//! Provisioning validator
//!
//! Admits a resource change only if the owner may currently be mutated
//! and every quota delta fits.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use prov_meta::OwnerKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::allocation::{ResizeRequest, ResourceAllocation};
use crate::quota::{QuotaDeltas, QuotaLedger};
use crate::sync::{SyncEntity, SyncTracker};
use crate::{Error, Result};

/// Proof that a reservation was applied
///
/// The caller creates the resource record after receiving this. If that
/// fails, it must hand the commitment back to
/// [`ProvisioningValidator::release`], otherwise the reserved usage leaks.
#[must_use = "a commitment must be kept or released"]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub id: Uuid,
    pub owner: OwnerKey,
    pub deltas: QuotaDeltas,
    pub created_at: DateTime<Utc>,
}

/// Validates and reserves resource allocations
#[derive(Debug, Clone)]
pub struct ProvisioningValidator {
    ledger: Arc<QuotaLedger>,
    sync: Arc<SyncTracker>,
}

impl ProvisioningValidator {
    pub fn new(ledger: Arc<QuotaLedger>, sync: Arc<SyncTracker>) -> Self {
        Self { ledger, sync }
    }

    /// Check an allocation and reserve its usage
    ///
    /// # Errors
    ///
    /// - `OwnerNotSynced` if the owner's backend account is erred
    /// - `QuotaExceeded` listing every quota the allocation does not fit
    /// - `InvalidRequest` for an empty or non-finite allocation
    pub fn validate(&self, allocation: &ResourceAllocation) -> Result<Commitment> {
        if allocation.is_empty() {
            return Err(Error::invalid_request("allocation has no quota deltas"));
        }

        self.reserve_if_mutable(allocation)?;

        let commitment = Commitment {
            id: Uuid::new_v4(),
            owner: allocation.owner,
            deltas: allocation.deltas.clone(),
            created_at: Utc::now(),
        };
        tracing::debug!(owner = %commitment.owner, commitment = %commitment.id, "Allocation admitted");
        Ok(commitment)
    }

    /// Check and reserve the usage change of an instance resize
    ///
    /// The request is checked for disk/flavor exclusivity before the
    /// ledger is touched.
    pub fn validate_resize(&self, owner: OwnerKey, request: &ResizeRequest) -> Result<Commitment> {
        let deltas = request.to_deltas()?;
        self.validate(&ResourceAllocation::from_deltas(owner, deltas))
    }

    /// Compensating action for a commitment whose resource was not created
    pub fn release(&self, commitment: Commitment) -> Result<()> {
        tracing::debug!(owner = %commitment.owner, commitment = %commitment.id, "Releasing commitment");
        self.ledger.release(&commitment.owner, &commitment.deltas)
    }

    /// Reserve while the owner's sync record is held, so a concurrent
    /// `set_erred` lands either before the check or after the reservation
    fn reserve_if_mutable(&self, allocation: &ResourceAllocation) -> Result<()> {
        let owner = allocation.owner;
        let Some(entity) = SyncEntity::for_owner(&owner) else {
            return self.ledger.reserve(&owner, &allocation.deltas);
        };
        self.sync.with_record(&entity, |record| match record.map(|r| r.state) {
            Some(state) if !state.permits_mutation() => Err(Error::OwnerNotSynced { owner, state }),
            _ => self.ledger.reserve(&owner, &allocation.deltas),
        })
    }
}
