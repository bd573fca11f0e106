//! Ownership hierarchy
//!
//! Tracks which owner contains which: customers contain projects and
//! project groups, projects contain cloud memberships. The hierarchy only
//! answers structural questions and never touches quota data.

use std::collections::BTreeSet;

use dashmap::DashMap;
use prov_meta::{OwnerKey, OwnerType, QuotaRegistry};

use crate::{Error, Result};

/// Containment tree of registered owners
///
/// A parent must be registered before its children and must have the
/// parent type the registry declares, so the tree cannot contain cycles.
#[derive(Debug)]
pub struct OwnershipHierarchy {
    registry: QuotaRegistry,
    parents: DashMap<OwnerKey, Option<OwnerKey>>,
}

impl OwnershipHierarchy {
    pub fn new(registry: QuotaRegistry) -> Self {
        Self {
            registry,
            parents: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &QuotaRegistry {
        &self.registry
    }

    /// Quota names recognized for an owner type
    pub fn quota_names_for(&self, owner_type: OwnerType) -> Result<&BTreeSet<String>> {
        Ok(self.registry.quota_names_for(owner_type)?)
    }

    /// Register an owner under its parent
    ///
    /// # Errors
    ///
    /// - `UnknownOwnerType` if the registry has no entry for the owner type
    /// - `OwnerExists` if the owner is already registered
    /// - `InvalidParent` if the parent is missing, unregistered, or of the
    ///   wrong type
    pub fn add(&self, owner: OwnerKey, parent: Option<OwnerKey>) -> Result<()> {
        let expected = self.registry.parent_type(owner.owner_type)?;

        match (expected, parent) {
            (None, None) => {}
            (Some(expected), Some(parent)) if parent.owner_type == expected => {
                if !self.contains(&parent) {
                    return Err(Error::InvalidParent {
                        owner,
                        reason: format!("parent {} is not registered", parent),
                    });
                }
            }
            (Some(expected), _) => {
                return Err(Error::InvalidParent {
                    owner,
                    reason: format!("expected a {} parent", expected),
                });
            }
            (None, Some(parent)) => {
                return Err(Error::InvalidParent {
                    owner,
                    reason: format!("{} is a root owner type, got parent {}", owner.owner_type, parent),
                });
            }
        }

        match self.parents.entry(owner) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Error::OwnerExists { owner }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(parent);
                Ok(())
            }
        }
    }

    /// Remove an owner and everything it contains
    ///
    /// Returns the removed owners, descendants before their ancestors.
    pub fn remove(&self, owner: &OwnerKey) -> Result<Vec<OwnerKey>> {
        if !self.contains(owner) {
            return Err(Error::OwnerNotFound { owner: *owner });
        }

        let mut removed = Vec::new();
        self.collect_subtree(*owner, &mut removed);
        for key in &removed {
            self.parents.remove(key);
        }
        Ok(removed)
    }

    pub fn contains(&self, owner: &OwnerKey) -> bool {
        self.parents.contains_key(owner)
    }

    /// Containing owner, `None` at the hierarchy root
    pub fn parent_of(&self, owner: &OwnerKey) -> Result<Option<OwnerKey>> {
        self.parents
            .get(owner)
            .map(|parent| *parent.value())
            .ok_or(Error::OwnerNotFound { owner: *owner })
    }

    /// The owner followed by its ancestors, nearest first
    pub fn resolve_owner_chain(&self, owner: &OwnerKey) -> Result<Vec<OwnerKey>> {
        let mut chain = vec![*owner];
        let mut current = self.parent_of(owner)?;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.parent_of(&parent)?;
        }
        Ok(chain)
    }

    /// Direct children of an owner, sorted
    pub fn children_of(&self, owner: &OwnerKey) -> Vec<OwnerKey> {
        let mut children: Vec<OwnerKey> = self
            .parents
            .iter()
            .filter(|entry| entry.value().as_ref() == Some(owner))
            .map(|entry| *entry.key())
            .collect();
        children.sort();
        children
    }

    /// Every registered owner of one type, sorted by id
    pub fn owners_of_type(&self, owner_type: OwnerType) -> Vec<OwnerKey> {
        let mut owners: Vec<OwnerKey> = self
            .parents
            .iter()
            .map(|entry| *entry.key())
            .filter(|key| key.owner_type == owner_type)
            .collect();
        owners.sort();
        owners
    }

    /// Every registered owner with its parent, parents before children
    pub fn entries(&self) -> Vec<(OwnerKey, Option<OwnerKey>)> {
        let mut entries: Vec<_> = self
            .parents
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        entries.sort_by_key(|(owner, _)| *owner);
        entries
    }

    fn collect_subtree(&self, owner: OwnerKey, out: &mut Vec<OwnerKey>) {
        for child in self.children_of(&owner) {
            self.collect_subtree(child, out);
        }
        out.push(owner);
    }
}
