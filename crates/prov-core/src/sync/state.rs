//! Sync states, events and the transition table

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A local record's belief about whether it matches its cloud backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Waiting for the reconciliation scheduler to pick it up
    #[default]
    Scheduled,
    /// Reconciliation in progress
    Syncing,
    /// Local record matches the backend
    Synced,
    /// Reconciliation failed; left only by an administrative reset
    Erred,
}

impl SyncState {
    pub const ALL: [SyncState; 4] = [
        SyncState::Scheduled,
        SyncState::Syncing,
        SyncState::Synced,
        SyncState::Erred,
    ];

    /// `Synced` is the only stable state; every other state expects a
    /// further transition.
    pub fn is_stable(&self) -> bool {
        matches!(self, SyncState::Synced)
    }

    /// Whether quota-backed resources of the entity may be mutated
    pub fn permits_mutation(&self) -> bool {
        !matches!(self, SyncState::Erred)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Scheduled => "scheduled",
            SyncState::Syncing => "syncing",
            SyncState::Synced => "synced",
            SyncState::Erred => "erred",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checkpoints reported by the reconciliation scheduler or an administrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEvent {
    BeginSyncing,
    ScheduleSyncing,
    SetInSync,
    SetErred,
    /// Administrative recovery from `Erred`
    Reset,
}

impl SyncEvent {
    pub const ALL: [SyncEvent; 5] = [
        SyncEvent::BeginSyncing,
        SyncEvent::ScheduleSyncing,
        SyncEvent::SetInSync,
        SyncEvent::SetErred,
        SyncEvent::Reset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncEvent::BeginSyncing => "begin_syncing",
            SyncEvent::ScheduleSyncing => "schedule_syncing",
            SyncEvent::SetInSync => "set_in_sync",
            SyncEvent::SetErred => "set_erred",
            SyncEvent::Reset => "reset",
        }
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncEvent {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "begin" | "begin_syncing" => Ok(SyncEvent::BeginSyncing),
            "schedule" | "schedule_syncing" => Ok(SyncEvent::ScheduleSyncing),
            "in_sync" | "set_in_sync" => Ok(SyncEvent::SetInSync),
            "erred" | "set_erred" => Ok(SyncEvent::SetErred),
            "reset" => Ok(SyncEvent::Reset),
            _ => Err(Error::invalid_request(format!("unknown sync event '{}'", s))),
        }
    }
}

/// `(source, event, target)`; a `None` source matches every state.
const TRANSITIONS: &[(Option<SyncState>, SyncEvent, SyncState)] = &[
    (Some(SyncState::Scheduled), SyncEvent::BeginSyncing, SyncState::Syncing),
    (Some(SyncState::Synced), SyncEvent::ScheduleSyncing, SyncState::Scheduled),
    (Some(SyncState::Syncing), SyncEvent::SetInSync, SyncState::Synced),
    (None, SyncEvent::SetErred, SyncState::Erred),
    (Some(SyncState::Erred), SyncEvent::Reset, SyncState::Scheduled),
];

/// Next state for `event` applied in `state`, or `None` if not allowed
pub fn next_state(state: SyncState, event: SyncEvent) -> Option<SyncState> {
    TRANSITIONS
        .iter()
        .find(|(source, ev, _)| *ev == event && source.is_none_or(|s| s == state))
        .map(|(_, _, target)| *target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = SyncState::default();
        assert_eq!(state, SyncState::Scheduled);

        state = next_state(state, SyncEvent::BeginSyncing).unwrap();
        assert_eq!(state, SyncState::Syncing);
        state = next_state(state, SyncEvent::SetInSync).unwrap();
        assert_eq!(state, SyncState::Synced);
        state = next_state(state, SyncEvent::ScheduleSyncing).unwrap();
        assert_eq!(state, SyncState::Scheduled);
    }

    #[test]
    fn test_set_erred_from_every_state() {
        for state in SyncState::ALL {
            assert_eq!(next_state(state, SyncEvent::SetErred), Some(SyncState::Erred));
        }
    }

    #[test]
    fn test_erred_only_left_by_reset() {
        for event in SyncEvent::ALL {
            let next = next_state(SyncState::Erred, event);
            match event {
                SyncEvent::Reset => assert_eq!(next, Some(SyncState::Scheduled)),
                SyncEvent::SetErred => assert_eq!(next, Some(SyncState::Erred)),
                _ => assert_eq!(next, None, "{} must not leave erred", event),
            }
        }
    }

    #[test]
    fn test_stability() {
        assert!(SyncState::Synced.is_stable());
        assert!(!SyncState::Syncing.is_stable());
        assert!(SyncState::Syncing.permits_mutation());
        assert!(!SyncState::Erred.permits_mutation());
    }

    #[test]
    fn test_event_from_str() {
        assert_eq!("begin".parse::<SyncEvent>().unwrap(), SyncEvent::BeginSyncing);
        assert_eq!("in-sync".parse::<SyncEvent>().unwrap(), SyncEvent::SetInSync);
        assert_eq!("set_erred".parse::<SyncEvent>().unwrap(), SyncEvent::SetErred);
        assert!("explode".parse::<SyncEvent>().is_err());
    }
}
