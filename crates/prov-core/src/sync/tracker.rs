//! Per-entity sync state storage with guarded transitions

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use prov_meta::{OwnerKey, OwnerType};
use serde::{Deserialize, Serialize};

use super::state::{SyncEvent, SyncState, next_state};
use crate::{Error, Result};

/// Kinds of entity reconciled against a cloud backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEntityKind {
    /// A customer's cloud account
    Cloud,
    /// A project's membership in a cloud
    CloudProjectMembership,
}

impl SyncEntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncEntityKind::Cloud => "cloud",
            SyncEntityKind::CloudProjectMembership => "cloud_project_membership",
        }
    }
}

/// Address of one synchronizable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SyncEntity {
    pub kind: SyncEntityKind,
    pub id: u64,
}

impl SyncEntity {
    pub fn cloud(id: u64) -> Self {
        Self {
            kind: SyncEntityKind::Cloud,
            id,
        }
    }

    pub fn membership(id: u64) -> Self {
        Self {
            kind: SyncEntityKind::CloudProjectMembership,
            id,
        }
    }

    /// The sync entity backing a quota owner, if the owner type is synchronizable
    pub fn for_owner(owner: &OwnerKey) -> Option<Self> {
        match owner.owner_type {
            OwnerType::CloudProjectMembership => Some(Self::membership(owner.id)),
            _ => None,
        }
    }
}

impl fmt::Display for SyncEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

/// Parses `cloud:<id>` or `membership:<id>`.
impl FromStr for SyncEntity {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || Error::invalid_request(format!("invalid sync entity '{}'", s));
        let (tag, id) = s.split_once(':').ok_or_else(invalid)?;
        let id: u64 = id.trim().parse().map_err(|_| invalid())?;
        match tag.trim().to_lowercase().replace('-', "_").as_str() {
            "cloud" => Ok(Self::cloud(id)),
            "membership" | "cloud_project_membership" => Ok(Self::membership(id)),
            _ => Err(invalid()),
        }
    }
}

/// Stored sync state of one entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub state: SyncState,
    /// Bumped on every successful transition
    pub version: u64,
    pub changed_at: DateTime<Utc>,
}

impl SyncRecord {
    fn new() -> Self {
        Self {
            state: SyncState::default(),
            version: 0,
            changed_at: Utc::now(),
        }
    }
}

/// Thread-safe sync state store
///
/// Each transition reads the current state, consults the transition table
/// and writes the next state while holding the entity's entry lock, so two
/// racing transitions that are mutually exclusive cannot both succeed.
#[derive(Debug, Default)]
pub struct SyncTracker {
    records: DashMap<SyncEntity, SyncRecord>,
}

impl SyncTracker {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Start tracking an entity in the initial `Scheduled` state
    ///
    /// Tracking an already tracked entity keeps its current record.
    pub fn track(&self, entity: SyncEntity) -> SyncState {
        self.records
            .entry(entity)
            .or_insert_with(|| {
                tracing::debug!(%entity, "Tracking sync state");
                SyncRecord::new()
            })
            .state
    }

    /// Restore a stored record verbatim
    pub fn restore(&self, entity: SyncEntity, record: SyncRecord) {
        self.records.insert(entity, record);
    }

    pub fn untrack(&self, entity: &SyncEntity) -> Option<SyncRecord> {
        self.records.remove(entity).map(|(_, record)| record)
    }

    pub fn is_tracked(&self, entity: &SyncEntity) -> bool {
        self.records.contains_key(entity)
    }

    pub fn record(&self, entity: &SyncEntity) -> Result<SyncRecord> {
        self.records
            .get(entity)
            .map(|r| *r.value())
            .ok_or(Error::SyncEntityNotFound { entity: *entity })
    }

    pub fn state(&self, entity: &SyncEntity) -> Result<SyncState> {
        self.record(entity).map(|r| r.state)
    }

    /// Run `f` on the entity's record while holding its entry lock
    ///
    /// Transitions of the entity wait until `f` returns. `f` receives `None`
    /// for an untracked entity. It must not call back into this tracker.
    pub fn with_record<T>(&self, entity: &SyncEntity, f: impl FnOnce(Option<&SyncRecord>) -> T) -> T {
        match self.records.get(entity) {
            Some(record) => f(Some(record.value())),
            None => f(None),
        }
    }

    /// Every tracked entity with its record, sorted by entity
    pub fn records(&self) -> Vec<(SyncEntity, SyncRecord)> {
        let mut records: Vec<_> = self.records.iter().map(|e| (*e.key(), *e.value())).collect();
        records.sort_by_key(|(entity, _)| *entity);
        records
    }

    /// Apply an event to an entity
    ///
    /// # Errors
    ///
    /// `InvalidTransition` if the event is not allowed from the current
    /// state; the state is left unchanged.
    pub fn apply(&self, entity: &SyncEntity, event: SyncEvent) -> Result<SyncState> {
        self.transition(entity, event, None)
    }

    /// Apply an event only if the record is still at `expected_version`
    ///
    /// Optimistic counterpart of [`apply`](Self::apply) for callers that
    /// read the record, did work, and must not overwrite a newer state.
    pub fn compare_and_apply(
        &self,
        entity: &SyncEntity,
        expected_version: u64,
        event: SyncEvent,
    ) -> Result<SyncState> {
        self.transition(entity, event, Some(expected_version))
    }

    pub fn begin_syncing(&self, entity: &SyncEntity) -> Result<SyncState> {
        self.apply(entity, SyncEvent::BeginSyncing)
    }

    pub fn schedule_syncing(&self, entity: &SyncEntity) -> Result<SyncState> {
        self.apply(entity, SyncEvent::ScheduleSyncing)
    }

    pub fn set_in_sync(&self, entity: &SyncEntity) -> Result<SyncState> {
        self.apply(entity, SyncEvent::SetInSync)
    }

    pub fn set_erred(&self, entity: &SyncEntity) -> Result<SyncState> {
        self.apply(entity, SyncEvent::SetErred)
    }

    /// Administrative reset of an erred entity back to `Scheduled`
    pub fn reset(&self, entity: &SyncEntity) -> Result<SyncState> {
        self.apply(entity, SyncEvent::Reset)
    }

    fn transition(
        &self,
        entity: &SyncEntity,
        event: SyncEvent,
        expected_version: Option<u64>,
    ) -> Result<SyncState> {
        let mut record = self
            .records
            .get_mut(entity)
            .ok_or(Error::SyncEntityNotFound { entity: *entity })?;

        match expected_version {
            Some(expected) if record.version != expected => {
                return Err(Error::StaleVersion {
                    entity: *entity,
                    expected,
                    actual: record.version,
                });
            }
            _ => {}
        }

        let from = record.state;
        let to = next_state(from, event).ok_or(Error::InvalidTransition {
            entity: *entity,
            from,
            event,
        })?;

        record.state = to;
        record.version += 1;
        record.changed_at = Utc::now();
        tracing::debug!(%entity, %event, %from, %to, "Sync state transition");
        Ok(to)
    }
}
