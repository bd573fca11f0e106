//! Quota ledger
//!
//! The ledger holds one `(limit, usage)` record per owner and quota name.
//! It knows nothing about what an owner is beyond its [`OwnerKey`].
//!
//! All usage mutation goes through [`QuotaLedger::reserve`],
//! [`QuotaLedger::release`], [`QuotaLedger::set_limit`] and
//! [`QuotaLedger::set_usage`]. A reservation checks and applies every delta
//! while holding the owner's entry lock, so two concurrent reservations for
//! the same owner cannot both pass a check that only one of them fits.

mod aggregate;
mod violation;

pub use aggregate::{QuotaSum, QuotaSums};
pub use violation::{QuotaViolation, QuotaViolations};

use std::collections::{BTreeMap, BTreeSet};

use dashmap::DashMap;
use prov_meta::{OwnerKey, OwnerType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Signed usage change per quota name
pub type QuotaDeltas = BTreeMap<String, f64>;

/// A named `(limit, usage)` pair scoped to one owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    pub uuid: Uuid,
    pub name: String,
    pub limit: f64,
    pub usage: f64,
}

impl Quota {
    /// Create a quota with zero usage
    pub fn new(name: impl Into<String>, limit: f64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            limit,
            usage: 0.0,
        }
    }

    /// Whether adding `delta` to the current usage would go over the limit
    pub fn is_exceeded(&self, delta: f64) -> bool {
        self.usage + delta > self.limit
    }

    /// Headroom left under the limit, never negative
    pub fn remaining(&self) -> f64 {
        (self.limit - self.usage).max(0.0)
    }
}

/// Thread-safe store of every owner's quotas
#[derive(Debug, Default)]
pub struct QuotaLedger {
    quotas: DashMap<OwnerKey, BTreeMap<String, Quota>>,
}

impl QuotaLedger {
    pub fn new() -> Self {
        Self {
            quotas: DashMap::new(),
        }
    }

    /// Create the quota rows for a new owner
    ///
    /// # Errors
    ///
    /// Returns `OwnerExists` if the owner already has quotas.
    pub fn create_owner<I>(&self, owner: OwnerKey, limits: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let quotas: BTreeMap<String, Quota> = limits
            .into_iter()
            .map(|(name, limit)| (name.clone(), Quota::new(name, limit)))
            .collect();
        self.insert_owner(owner, quotas)
    }

    /// Insert fully-formed quota rows, e.g. when restoring from a state file
    pub fn insert_owner(&self, owner: OwnerKey, quotas: BTreeMap<String, Quota>) -> Result<()> {
        match self.quotas.entry(owner) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Error::OwnerExists { owner }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                tracing::debug!(%owner, quotas = quotas.len(), "Created owner quotas");
                slot.insert(quotas);
                Ok(())
            }
        }
    }

    /// Drop every quota of an owner
    pub fn remove_owner(&self, owner: &OwnerKey) -> Option<BTreeMap<String, Quota>> {
        self.quotas.remove(owner).map(|(_, quotas)| quotas)
    }

    pub fn has_owner(&self, owner: &OwnerKey) -> bool {
        self.quotas.contains_key(owner)
    }

    /// Every owner with quotas, sorted
    pub fn owners(&self) -> Vec<OwnerKey> {
        let mut owners: Vec<OwnerKey> = self.quotas.iter().map(|e| *e.key()).collect();
        owners.sort();
        owners
    }

    /// Get one quota
    ///
    /// # Errors
    ///
    /// `OwnerNotFound` for an unknown owner, `QuotaNotFound` if the owner
    /// has no quota with this name.
    pub fn get(&self, owner: &OwnerKey, name: &str) -> Result<Quota> {
        let entry = self
            .quotas
            .get(owner)
            .ok_or(Error::OwnerNotFound { owner: *owner })?;
        entry.get(name).cloned().ok_or_else(|| Error::QuotaNotFound {
            owner: *owner,
            name: name.to_string(),
        })
    }

    /// All quotas of one owner, keyed by name
    pub fn quota_state(&self, owner: &OwnerKey) -> Result<BTreeMap<String, Quota>> {
        self.quotas
            .get(owner)
            .map(|entry| entry.value().clone())
            .ok_or(Error::OwnerNotFound { owner: *owner })
    }

    /// Administrative limit override
    ///
    /// Usage is not checked: a limit below current usage leaves the quota
    /// over its limit, and reservations on it fail until usage drops.
    pub fn set_limit(&self, owner: &OwnerKey, name: &str, limit: f64) -> Result<()> {
        ensure_finite_or_unbounded(name, limit)?;
        self.with_quota_mut(owner, name, |quota| {
            tracing::info!(%owner, quota = name, old = quota.limit, new = limit, "Quota limit changed");
            quota.limit = limit;
        })
    }

    /// Administrative usage override, used when reconciliation reports
    /// the backend's actual consumption
    pub fn set_usage(&self, owner: &OwnerKey, name: &str, usage: f64) -> Result<()> {
        if !usage.is_finite() || usage < 0.0 {
            return Err(Error::invalid_request(format!(
                "usage for '{}' must be a non-negative number, got {}",
                name, usage
            )));
        }
        self.with_quota_mut(owner, name, |quota| {
            tracing::info!(%owner, quota = name, old = quota.usage, new = usage, "Quota usage overridden");
            quota.usage = usage;
        })
    }

    /// Atomically check and apply usage deltas
    ///
    /// For every name, checks `usage + delta <= limit`. If all checks pass,
    /// every delta is applied; if any fails, none is and the error lists
    /// every violated quota.
    ///
    /// # Errors
    ///
    /// - `QuotaExceeded` when one or more deltas do not fit
    /// - `QuotaNotFound` / `OwnerNotFound` for unknown names or owners
    /// - `InvalidRequest` for non-finite deltas
    pub fn reserve(&self, owner: &OwnerKey, deltas: &QuotaDeltas) -> Result<()> {
        ensure_finite(deltas)?;

        let mut entry = self
            .quotas
            .get_mut(owner)
            .ok_or(Error::OwnerNotFound { owner: *owner })?;
        let quotas = entry.value_mut();

        ensure_known(owner, quotas, deltas)?;

        let violations: Vec<QuotaViolation> = deltas
            .iter()
            .filter_map(|(name, delta)| {
                let quota = &quotas[name];
                quota.is_exceeded(*delta).then(|| QuotaViolation {
                    owner: *owner,
                    name: name.clone(),
                    limit: quota.limit,
                    usage: quota.usage,
                    requested_total: quota.usage + delta,
                })
            })
            .collect();

        if !violations.is_empty() {
            tracing::debug!(%owner, exceeded = ?violations.iter().map(|v| &v.name).collect::<Vec<_>>(), "Reservation rejected");
            return Err(Error::QuotaExceeded(QuotaViolations::new(violations)));
        }

        for (name, delta) in deltas {
            if let Some(quota) = quotas.get_mut(name) {
                apply_delta(owner, quota, *delta);
            }
        }
        tracing::debug!(%owner, ?deltas, "Reservation applied");
        Ok(())
    }

    /// Apply usage deltas without checking limits
    ///
    /// Used for counters that follow structure changes which already
    /// happened. Usage is clamped at zero like [`release`](Self::release).
    pub fn change_usage(&self, owner: &OwnerKey, deltas: &QuotaDeltas) -> Result<()> {
        ensure_finite(deltas)?;

        let mut entry = self
            .quotas
            .get_mut(owner)
            .ok_or(Error::OwnerNotFound { owner: *owner })?;
        let quotas = entry.value_mut();

        ensure_known(owner, quotas, deltas)?;

        for (name, delta) in deltas {
            if let Some(quota) = quotas.get_mut(name) {
                apply_delta(owner, quota, *delta);
            }
        }
        tracing::debug!(%owner, ?deltas, "Usage changed");
        Ok(())
    }

    /// Inverse of [`reserve`](Self::reserve), used on deletion or rollback
    ///
    /// Never checks limits. Usage is clamped at zero; clamping is logged
    /// because it means usage was under-counted earlier.
    pub fn release(&self, owner: &OwnerKey, deltas: &QuotaDeltas) -> Result<()> {
        ensure_finite(deltas)?;

        let mut entry = self
            .quotas
            .get_mut(owner)
            .ok_or(Error::OwnerNotFound { owner: *owner })?;
        let quotas = entry.value_mut();

        ensure_known(owner, quotas, deltas)?;

        for (name, delta) in deltas {
            if let Some(quota) = quotas.get_mut(name) {
                apply_delta(owner, quota, -delta);
            }
        }
        tracing::debug!(%owner, ?deltas, "Reservation released");
        Ok(())
    }

    /// Sum limits and usage per quota name over owners of one type
    ///
    /// An empty `names` slice sums every quota the owners carry. Owners
    /// without quotas are skipped.
    ///
    /// # Errors
    ///
    /// `MixedOwnerType` unless every owner has the same type.
    pub fn sum_across_owners(&self, owners: &[OwnerKey], names: &[&str]) -> Result<QuotaSums> {
        let types: BTreeSet<OwnerType> = owners.iter().map(|o| o.owner_type).collect();
        if types.len() > 1 {
            return Err(Error::MixedOwnerType {
                found: types.into_iter().collect(),
            });
        }

        let mut sums = QuotaSums::new();
        for owner in owners {
            let Some(entry) = self.quotas.get(owner) else {
                continue;
            };
            for (name, quota) in entry.value() {
                if names.is_empty() || names.contains(&name.as_str()) {
                    sums.add(name, quota.limit, quota.usage);
                }
            }
        }
        Ok(sums)
    }

    fn with_quota_mut<F>(&self, owner: &OwnerKey, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Quota),
    {
        let mut entry = self
            .quotas
            .get_mut(owner)
            .ok_or(Error::OwnerNotFound { owner: *owner })?;
        let quota = entry.get_mut(name).ok_or_else(|| Error::QuotaNotFound {
            owner: *owner,
            name: name.to_string(),
        })?;
        f(quota);
        Ok(())
    }
}

fn apply_delta(owner: &OwnerKey, quota: &mut Quota, delta: f64) {
    let next = quota.usage + delta;
    if next < 0.0 {
        tracing::warn!(
            %owner,
            quota = %quota.name,
            usage = quota.usage,
            delta,
            "Quota usage would drop below zero, clamping to 0"
        );
        quota.usage = 0.0;
    } else {
        quota.usage = next;
    }
}

fn ensure_finite(deltas: &QuotaDeltas) -> Result<()> {
    match deltas.iter().find(|(_, delta)| !delta.is_finite()) {
        Some((name, delta)) => Err(Error::invalid_request(format!(
            "delta for '{}' must be a finite number, got {}",
            name, delta
        ))),
        None => Ok(()),
    }
}

fn ensure_finite_or_unbounded(name: &str, limit: f64) -> Result<()> {
    if limit.is_nan() || limit == f64::NEG_INFINITY {
        return Err(Error::invalid_request(format!(
            "limit for '{}' must be a number, got {}",
            name, limit
        )));
    }
    Ok(())
}

fn ensure_known(owner: &OwnerKey, quotas: &BTreeMap<String, Quota>, deltas: &QuotaDeltas) -> Result<()> {
    match deltas.keys().find(|name| !quotas.contains_key(*name)) {
        Some(name) => Err(Error::QuotaNotFound {
            owner: *owner,
            name: name.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deltas(pairs: &[(&str, f64)]) -> QuotaDeltas {
        pairs.iter().map(|(n, d)| (n.to_string(), *d)).collect()
    }

    fn ledger_with(owner: OwnerKey, quotas: &[(&str, f64, f64)]) -> QuotaLedger {
        let ledger = QuotaLedger::new();
        ledger
            .create_owner(owner, quotas.iter().map(|(n, l, _)| (n.to_string(), *l)))
            .unwrap();
        for (name, _, usage) in quotas {
            ledger.set_usage(&owner, name, *usage).unwrap();
        }
        ledger
    }

    #[test]
    fn test_quota_is_exceeded() {
        let mut quota = Quota::new("vcpu", 8.0);
        quota.usage = 6.0;
        assert!(!quota.is_exceeded(2.0));
        assert!(quota.is_exceeded(2.5));
        assert_eq!(quota.remaining(), 2.0);
    }

    #[test]
    fn test_create_owner_twice_fails() {
        let owner = OwnerKey::membership(1);
        let ledger = ledger_with(owner, &[("vcpu", 8.0, 0.0)]);
        let err = ledger
            .create_owner(owner, vec![("vcpu".to_string(), 1.0)])
            .unwrap_err();
        assert!(matches!(err, Error::OwnerExists { .. }));
    }

    #[test]
    fn test_get_unknown_quota_name() {
        let owner = OwnerKey::membership(1);
        let ledger = ledger_with(owner, &[("vcpu", 8.0, 0.0)]);
        assert!(matches!(
            ledger.get(&owner, "gpu"),
            Err(Error::QuotaNotFound { .. })
        ));
        assert!(matches!(
            ledger.get(&OwnerKey::membership(2), "vcpu"),
            Err(Error::OwnerNotFound { .. })
        ));
    }

    #[test]
    fn test_reserve_applies_all_deltas() {
        let owner = OwnerKey::membership(1);
        let ledger = ledger_with(owner, &[("storage", 100.0, 50.0), ("vcpu", 8.0, 4.0)]);

        ledger
            .reserve(&owner, &deltas(&[("storage", 40.0), ("vcpu", 2.0)]))
            .unwrap();

        assert_eq!(ledger.get(&owner, "storage").unwrap().usage, 90.0);
        assert_eq!(ledger.get(&owner, "vcpu").unwrap().usage, 6.0);
    }

    #[test]
    fn test_reserve_is_all_or_nothing() {
        let owner = OwnerKey::membership(1);
        let ledger = ledger_with(owner, &[("storage", 100.0, 0.0), ("vcpu", 8.0, 0.0)]);

        let err = ledger
            .reserve(&owner, &deltas(&[("storage", 10.0), ("vcpu", 1_000_000.0)]))
            .unwrap_err();

        match err {
            Error::QuotaExceeded(violations) => assert_eq!(violations.names(), vec!["vcpu"]),
            other => panic!("expected QuotaExceeded, got {:?}", other),
        }
        assert_eq!(ledger.get(&owner, "storage").unwrap().usage, 0.0);
        assert_eq!(ledger.get(&owner, "vcpu").unwrap().usage, 0.0);
    }

    #[test]
    fn test_reserve_reports_every_violation() {
        let owner = OwnerKey::membership(1);
        let ledger = ledger_with(owner, &[("ram", 1024.0, 1000.0), ("vcpu", 2.0, 2.0)]);

        let err = ledger
            .reserve(&owner, &deltas(&[("ram", 512.0), ("vcpu", 1.0)]))
            .unwrap_err();

        let Error::QuotaExceeded(violations) = err else {
            panic!("expected QuotaExceeded");
        };
        assert_eq!(violations.len(), 2);
        assert_eq!(violations.get("ram").unwrap().requested_total, 1512.0);
        assert_eq!(violations.get("vcpu").unwrap().requested_total, 3.0);
    }

    #[test]
    fn test_reserve_unknown_name_mutates_nothing() {
        let owner = OwnerKey::membership(1);
        let ledger = ledger_with(owner, &[("vcpu", 8.0, 0.0)]);

        let err = ledger
            .reserve(&owner, &deltas(&[("vcpu", 1.0), ("gpu", 1.0)]))
            .unwrap_err();

        assert!(matches!(err, Error::QuotaNotFound { ref name, .. } if name == "gpu"));
        assert_eq!(ledger.get(&owner, "vcpu").unwrap().usage, 0.0);
    }

    #[test]
    fn test_reserve_rejects_non_finite_delta() {
        let owner = OwnerKey::membership(1);
        let ledger = ledger_with(owner, &[("vcpu", 8.0, 0.0)]);
        assert!(matches!(
            ledger.reserve(&owner, &deltas(&[("vcpu", f64::NAN)])),
            Err(Error::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_set_limit_below_usage_blocks_reservations() {
        let owner = OwnerKey::membership(1);
        let ledger = ledger_with(owner, &[("storage", 100.0, 80.0)]);

        ledger.set_limit(&owner, "storage", 50.0).unwrap();
        let quota = ledger.get(&owner, "storage").unwrap();
        assert_eq!(quota.usage, 80.0);
        assert_eq!(quota.limit, 50.0);

        assert!(ledger.reserve(&owner, &deltas(&[("storage", 1.0)])).is_err());

        ledger.release(&owner, &deltas(&[("storage", 40.0)])).unwrap();
        ledger.reserve(&owner, &deltas(&[("storage", 1.0)])).unwrap();
        assert_eq!(ledger.get(&owner, "storage").unwrap().usage, 41.0);
    }

    #[test]
    fn test_release_clamps_at_zero() {
        let owner = OwnerKey::membership(1);
        let ledger = ledger_with(owner, &[("ram", 1024.0, 100.0)]);

        ledger.release(&owner, &deltas(&[("ram", 300.0)])).unwrap();
        assert_eq!(ledger.get(&owner, "ram").unwrap().usage, 0.0);
    }

    #[test]
    fn test_set_usage_rejects_negative() {
        let owner = OwnerKey::membership(1);
        let ledger = ledger_with(owner, &[("ram", 1024.0, 0.0)]);
        assert!(matches!(
            ledger.set_usage(&owner, "ram", -1.0),
            Err(Error::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_sum_across_owners() {
        let a = OwnerKey::project(1);
        let b = OwnerKey::project(2);
        let ledger = QuotaLedger::new();
        ledger.create_owner(a, vec![("x".to_string(), 10.0)]).unwrap();
        ledger.create_owner(b, vec![("x".to_string(), 20.0)]).unwrap();
        ledger.set_usage(&a, "x", 3.0).unwrap();
        ledger.set_usage(&b, "x", 5.0).unwrap();

        let sums = ledger.sum_across_owners(&[a, b], &["x"]).unwrap();
        let flat = sums.to_flat_map();
        assert_eq!(flat["x"], 30.0);
        assert_eq!(flat["x_usage"], 8.0);
    }

    #[test]
    fn test_sum_across_mixed_owner_types_fails() {
        let ledger = QuotaLedger::new();
        let err = ledger
            .sum_across_owners(&[OwnerKey::project(1), OwnerKey::customer(1)], &[])
            .unwrap_err();
        assert!(matches!(err, Error::MixedOwnerType { ref found } if found.len() == 2));
    }
}
