//! Tests for the sync state machine

use std::sync::{Arc, Barrier};
use std::thread;

use prov_core::sync::next_state;
use prov_core::{Error, SyncEntity, SyncEvent, SyncRecord, SyncState, SyncTracker};
use rstest::rstest;

fn tracker_in(state: SyncState) -> (SyncTracker, SyncEntity) {
    let tracker = SyncTracker::new();
    let entity = SyncEntity::membership(1);
    tracker.restore(
        entity,
        SyncRecord {
            state,
            version: 0,
            changed_at: chrono::Utc::now(),
        },
    );
    (tracker, entity)
}

#[rstest]
#[case::begin(SyncState::Scheduled, SyncEvent::BeginSyncing, SyncState::Syncing)]
#[case::in_sync(SyncState::Syncing, SyncEvent::SetInSync, SyncState::Synced)]
#[case::reschedule(SyncState::Synced, SyncEvent::ScheduleSyncing, SyncState::Scheduled)]
#[case::erred_from_scheduled(SyncState::Scheduled, SyncEvent::SetErred, SyncState::Erred)]
#[case::erred_from_syncing(SyncState::Syncing, SyncEvent::SetErred, SyncState::Erred)]
#[case::erred_from_synced(SyncState::Synced, SyncEvent::SetErred, SyncState::Erred)]
#[case::erred_from_erred(SyncState::Erred, SyncEvent::SetErred, SyncState::Erred)]
#[case::reset(SyncState::Erred, SyncEvent::Reset, SyncState::Scheduled)]
fn test_allowed_transition(
    #[case] from: SyncState,
    #[case] event: SyncEvent,
    #[case] to: SyncState,
) {
    let (tracker, entity) = tracker_in(from);

    assert_eq!(tracker.apply(&entity, event).unwrap(), to);
    let record = tracker.record(&entity).unwrap();
    assert_eq!(record.state, to);
    assert_eq!(record.version, 1);
}

#[rstest]
#[case::begin_from_syncing(SyncState::Syncing, SyncEvent::BeginSyncing)]
#[case::begin_from_synced(SyncState::Synced, SyncEvent::BeginSyncing)]
#[case::begin_from_erred(SyncState::Erred, SyncEvent::BeginSyncing)]
#[case::schedule_from_scheduled(SyncState::Scheduled, SyncEvent::ScheduleSyncing)]
#[case::schedule_from_syncing(SyncState::Syncing, SyncEvent::ScheduleSyncing)]
#[case::schedule_from_erred(SyncState::Erred, SyncEvent::ScheduleSyncing)]
#[case::in_sync_from_scheduled(SyncState::Scheduled, SyncEvent::SetInSync)]
#[case::in_sync_from_synced(SyncState::Synced, SyncEvent::SetInSync)]
#[case::in_sync_from_erred(SyncState::Erred, SyncEvent::SetInSync)]
#[case::reset_from_scheduled(SyncState::Scheduled, SyncEvent::Reset)]
#[case::reset_from_syncing(SyncState::Syncing, SyncEvent::Reset)]
#[case::reset_from_synced(SyncState::Synced, SyncEvent::Reset)]
fn test_rejected_transition_leaves_state(#[case] from: SyncState, #[case] event: SyncEvent) {
    let (tracker, entity) = tracker_in(from);

    let err = tracker.apply(&entity, event).unwrap_err();

    assert!(matches!(err, Error::InvalidTransition { from: f, event: e, .. } if f == from && e == event));
    let record = tracker.record(&entity).unwrap();
    assert_eq!(record.state, from);
    assert_eq!(record.version, 0);
}

#[test]
fn test_table_covers_every_pair() {
    let allowed = SyncState::ALL
        .iter()
        .flat_map(|s| SyncEvent::ALL.iter().map(move |e| (*s, *e)))
        .filter(|(s, e)| next_state(*s, *e).is_some())
        .count();
    assert_eq!(allowed, 8);
}

#[test]
fn test_only_synced_is_stable() {
    let stable: Vec<_> = SyncState::ALL.into_iter().filter(SyncState::is_stable).collect();
    assert_eq!(stable, vec![SyncState::Synced]);
}

#[test]
fn racing_begin_syncing_admits_one() {
    let tracker = Arc::new(SyncTracker::new());
    let entity = SyncEntity::cloud(1);
    tracker.track(entity);

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tracker = tracker.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                tracker.begin_syncing(&entity).is_ok()
            })
        })
        .collect();

    let won = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(won, 1);
    assert_eq!(tracker.record(&entity).unwrap().version, 1);
}

#[test]
fn test_full_reconciliation_cycle() {
    let tracker = SyncTracker::new();
    let entity = SyncEntity::membership(3);
    tracker.track(entity);

    tracker.begin_syncing(&entity).unwrap();
    tracker.set_in_sync(&entity).unwrap();
    tracker.schedule_syncing(&entity).unwrap();
    tracker.begin_syncing(&entity).unwrap();
    tracker.set_erred(&entity).unwrap();
    assert!(tracker.begin_syncing(&entity).is_err());
    tracker.reset(&entity).unwrap();

    let record = tracker.record(&entity).unwrap();
    assert_eq!(record.state, SyncState::Scheduled);
    assert_eq!(record.version, 6);
}
