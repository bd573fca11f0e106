//! Quota accounting and sync state core for Provisioning Manager
//!
//! This crate implements:
//!
//! - **Quota ledger**: per-owner `(limit, usage)` records with atomic,
//!   all-or-nothing reservations
//! - **Ownership hierarchy**: the customer → project → membership
//!   containment tree used for roll-up reporting
//! - **Sync state machine**: guarded reconciliation-state transitions for
//!   clouds and memberships
//! - **Provisioning validator**: admits resource changes that fit every
//!   quota of an owner that is not erred
//! - **Structure events**: customer counters that follow project and user
//!   role changes
//! - **State store**: TOML snapshot of the whole inventory
//!
//! # Architecture
//!
//! ```text
//!                    prov-cli
//!                       |
//!                   Inventory
//!                       |
//!     +---------+-------+------+----------+
//!     |         |              |          |
//! hierarchy  validator ---> ledger     events
//!                 |                       |
//!               sync                   ledger
//! ```
//!
//! # Example
//!
//! ```
//! use prov_core::{Inventory, QuotaDeltas};
//! use prov_meta::{OwnerKey, QuotaRegistry};
//!
//! let inventory = Inventory::new(QuotaRegistry::with_builtins());
//! inventory.register_owner(OwnerKey::customer(1), None).unwrap();
//! inventory
//!     .register_owner(OwnerKey::project(1), Some(OwnerKey::customer(1)))
//!     .unwrap();
//! let membership = OwnerKey::membership(1);
//! inventory
//!     .register_owner(membership, Some(OwnerKey::project(1)))
//!     .unwrap();
//! inventory.set_limit(&membership, "storage", 100.0).unwrap();
//!
//! let deltas = QuotaDeltas::from([("storage".to_string(), 40.0)]);
//! let commitment = inventory.validate(membership, deltas).unwrap();
//! assert_eq!(inventory.get(&membership, "storage").unwrap().usage, 40.0);
//!
//! inventory.release(commitment).unwrap();
//! ```

pub mod error;
pub mod events;
pub mod inventory;
pub mod owner;
pub mod provision;
pub mod quota;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
pub use events::{EventDispatcher, EventHandler, QuotaEventHandler, StructureEvent};
pub use inventory::Inventory;
pub use owner::OwnershipHierarchy;
pub use prov_meta::DefaultLimits;
pub use provision::{
    Commitment, InstanceSpec, ProvisioningValidator, ResizeRequest, ResourceAllocation,
};
pub use quota::{
    Quota, QuotaDeltas, QuotaLedger, QuotaSum, QuotaSums, QuotaViolation, QuotaViolations,
};
pub use store::{OwnerRecord, QuotaRecord, STATE_VERSION, StateLock, StateSnapshot, SyncEntry};
pub use sync::{SyncEntity, SyncEntityKind, SyncEvent, SyncRecord, SyncState, SyncTracker};
