//! Structure events and the quota usage handler
//!
//! Components that change how many projects, users or resources an owner
//! has publish a [`StructureEvent`]. Handlers run synchronously, in
//! registration order, inside the publishing call.

use std::sync::Arc;

use prov_meta::{OwnerKey, names};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::provision::ResourceAllocation;
use crate::quota::{QuotaDeltas, QuotaLedger};

/// Something that changed an owner's resource counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StructureEvent {
    ProjectCreated { customer: OwnerKey, project: OwnerKey },
    ProjectDeleted { customer: OwnerKey, project: OwnerKey },
    /// A user received a role somewhere under the customer
    UserRoleGranted { customer: OwnerKey },
    UserRoleRevoked { customer: OwnerKey },
    /// A provisioned resource was deleted; its usage is returned
    ResourceDeleted { allocation: ResourceAllocation },
}

/// Receives structure events
pub trait EventHandler: Send + Sync {
    /// Handler name for logging
    fn name(&self) -> &str;

    /// Handle one event
    ///
    /// An error aborts the publishing operation.
    fn handle(&self, event: &StructureEvent) -> Result<()>;
}

/// Keeps customer counters and membership usage in step with the structure
///
/// Counters are updated after the fact and never rejected; a customer over
/// its project limit shows up as usage above limit.
pub struct QuotaEventHandler {
    ledger: Arc<QuotaLedger>,
}

impl QuotaEventHandler {
    pub fn new(ledger: Arc<QuotaLedger>) -> Self {
        Self { ledger }
    }

    fn counter(name: &str) -> QuotaDeltas {
        QuotaDeltas::from([(name.to_string(), 1.0)])
    }
}

impl EventHandler for QuotaEventHandler {
    fn name(&self) -> &str {
        "quota-usage"
    }

    fn handle(&self, event: &StructureEvent) -> Result<()> {
        match event {
            StructureEvent::ProjectCreated { customer, .. } => self
                .ledger
                .change_usage(customer, &Self::counter(names::NC_PROJECT_COUNT)),
            StructureEvent::ProjectDeleted { customer, .. } => self
                .ledger
                .release(customer, &Self::counter(names::NC_PROJECT_COUNT)),
            StructureEvent::UserRoleGranted { customer } => self
                .ledger
                .change_usage(customer, &Self::counter(names::NC_USER_COUNT)),
            StructureEvent::UserRoleRevoked { customer } => self
                .ledger
                .release(customer, &Self::counter(names::NC_USER_COUNT)),
            StructureEvent::ResourceDeleted { allocation } => {
                self.ledger.release(&allocation.owner, &allocation.deltas)
            }
        }
    }
}

/// Ordered list of handlers that every event is delivered to
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Deliver an event to every handler, stopping at the first error
    pub fn publish(&self, event: &StructureEvent) -> Result<()> {
        for handler in &self.handlers {
            tracing::debug!(handler = handler.name(), ?event, "Dispatching structure event");
            handler.handle(event)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}
