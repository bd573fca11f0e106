//! Quota registry for owner types
//!
//! This module maps each owner type to the set of quota names it carries
//! and to the owner type that contains it in the ownership tree.

use std::collections::{BTreeSet, HashMap};

use crate::error::{Error, Result};
use crate::owner::OwnerType;

/// Well-known quota names.
pub mod names {
    pub const STORAGE: &str = "storage";
    pub const VCPU: &str = "vcpu";
    pub const RAM: &str = "ram";
    pub const MAX_INSTANCES: &str = "max_instances";
    pub const FLOATING_IP_COUNT: &str = "floating_ip_count";
    pub const NC_PROJECT_COUNT: &str = "nc_project_count";
    pub const NC_USER_COUNT: &str = "nc_user_count";
}

/// What the registry knows about one owner type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerTypeSpec {
    /// Quota names created for every owner of this type
    pub quota_names: BTreeSet<String>,
    /// Owner type of the containing owner, `None` at the root
    pub parent: Option<OwnerType>,
}

/// Registry mapping owner types to their quota names and parent type.
///
/// # Example
///
/// ```
/// use prov_meta::{OwnerType, QuotaRegistry};
///
/// let registry = QuotaRegistry::with_builtins();
/// let names = registry.quota_names_for(OwnerType::CloudProjectMembership).unwrap();
/// assert!(names.contains("vcpu"));
/// assert_eq!(registry.parent_type(OwnerType::Project).unwrap(), Some(OwnerType::Customer));
/// ```
#[derive(Debug, Clone, Default)]
pub struct QuotaRegistry {
    specs: HashMap<OwnerType, OwnerTypeSpec>,
}

impl QuotaRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            specs: HashMap::new(),
        }
    }

    /// Create a registry with the built-in owner types registered.
    ///
    /// - `customer`: `nc_project_count`, `nc_user_count`
    /// - `project_group` (under customer): no quotas
    /// - `project` (under customer): `vcpu`, `ram`, `storage`, `max_instances`
    /// - `cloud_project_membership` (under project): `vcpu`, `ram`, `storage`,
    ///   `max_instances`, `floating_ip_count`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            OwnerType::Customer,
            None,
            [names::NC_PROJECT_COUNT, names::NC_USER_COUNT],
        );
        registry.register(
            OwnerType::ProjectGroup,
            Some(OwnerType::Customer),
            std::iter::empty::<&str>(),
        );
        registry.register(
            OwnerType::Project,
            Some(OwnerType::Customer),
            [names::VCPU, names::RAM, names::STORAGE, names::MAX_INSTANCES],
        );
        registry.register(
            OwnerType::CloudProjectMembership,
            Some(OwnerType::Project),
            [
                names::VCPU,
                names::RAM,
                names::STORAGE,
                names::MAX_INSTANCES,
                names::FLOATING_IP_COUNT,
            ],
        );
        registry
    }

    /// Register an owner type.
    ///
    /// If the owner type was already registered, its spec is replaced.
    pub fn register<I, S>(&mut self, owner_type: OwnerType, parent: Option<OwnerType>, quota_names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = OwnerTypeSpec {
            quota_names: quota_names.into_iter().map(Into::into).collect(),
            parent,
        };
        self.specs.insert(owner_type, spec);
    }

    /// Full spec of an owner type.
    pub fn spec(&self, owner_type: OwnerType) -> Result<&OwnerTypeSpec> {
        self.specs
            .get(&owner_type)
            .ok_or_else(|| Error::UnknownOwnerType {
                owner_type: owner_type.to_string(),
            })
    }

    /// Quota names recognized for an owner type.
    pub fn quota_names_for(&self, owner_type: OwnerType) -> Result<&BTreeSet<String>> {
        self.spec(owner_type).map(|spec| &spec.quota_names)
    }

    /// Quota names for an owner type given by its string tag.
    pub fn quota_names_for_tag(&self, tag: &str) -> Result<&BTreeSet<String>> {
        let owner_type: OwnerType = tag.parse()?;
        self.quota_names_for(owner_type)
    }

    /// Owner type that contains owners of `owner_type`.
    pub fn parent_type(&self, owner_type: OwnerType) -> Result<Option<OwnerType>> {
        self.spec(owner_type).map(|spec| spec.parent)
    }

    /// Check whether an owner type carries a quota of this name.
    pub fn recognizes(&self, owner_type: OwnerType, quota_name: &str) -> bool {
        self.specs
            .get(&owner_type)
            .is_some_and(|spec| spec.quota_names.contains(quota_name))
    }

    /// Check if an owner type is registered.
    pub fn is_registered(&self, owner_type: OwnerType) -> bool {
        self.specs.contains_key(&owner_type)
    }

    /// List registered owner types, root first.
    pub fn owner_types(&self) -> Vec<OwnerType> {
        let mut types: Vec<OwnerType> = self.specs.keys().copied().collect();
        types.sort();
        types
    }
}
