//! Sync state machine for entities reconciled against a cloud backend
//!
//! This module provides:
//! - **state**: the `SyncState`/`SyncEvent` enums and the transition table
//! - **tracker**: per-entity storage applying guarded transitions
//!
//! The reconciliation scheduler itself lives outside this crate. It calls
//! the tracker's transition operations as checkpoints around its own work.

mod state;
mod tracker;

pub use state::{SyncEvent, SyncState, next_state};
pub use tracker::{SyncEntity, SyncEntityKind, SyncRecord, SyncTracker};
