//! Provisioning validation
//!
//! Turns proposed resource changes into quota deltas and admits them
//! against the ledger and the owner's sync state.

mod allocation;
mod validator;

pub use allocation::{InstanceSpec, ResizeRequest, ResourceAllocation};
pub use validator::{Commitment, ProvisioningValidator};
