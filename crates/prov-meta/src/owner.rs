//! Owner type tags and owner keys
//!
//! Every quota belongs to exactly one owner, addressed by an [`OwnerKey`]:
//! a tagged owner type plus a numeric id. The tag replaces a generic
//! "content type" column, so no reflection is needed to find out what kind
//! of entity holds a quota.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The kinds of entity that can own quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerType {
    /// Top-level tenant. Root of the ownership tree.
    Customer,
    /// A grouping of projects inside one customer.
    ProjectGroup,
    /// A customer's project.
    Project,
    /// A project's membership in one cloud backend.
    ///
    /// Provisioned resources (instances, volumes, floating IPs) are
    /// accounted against memberships.
    CloudProjectMembership,
}

impl OwnerType {
    /// All owner types, root first.
    pub const ALL: [OwnerType; 4] = [
        OwnerType::Customer,
        OwnerType::ProjectGroup,
        OwnerType::Project,
        OwnerType::CloudProjectMembership,
    ];

    /// Stable tag used in config files, state files and owner references.
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerType::Customer => "customer",
            OwnerType::ProjectGroup => "project_group",
            OwnerType::Project => "project",
            OwnerType::CloudProjectMembership => "cloud_project_membership",
        }
    }

    /// Build an owner key of this type.
    pub fn key(self, id: u64) -> OwnerKey {
        OwnerKey::new(self, id)
    }
}

impl FromStr for OwnerType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "customer" => Ok(OwnerType::Customer),
            "project_group" | "group" => Ok(OwnerType::ProjectGroup),
            "project" => Ok(OwnerType::Project),
            "cloud_project_membership" | "membership" => Ok(OwnerType::CloudProjectMembership),
            _ => Err(Error::UnknownOwnerType {
                owner_type: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OwnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of one quota owner: `(owner type, owner id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerKey {
    pub owner_type: OwnerType,
    pub id: u64,
}

impl OwnerKey {
    pub fn new(owner_type: OwnerType, id: u64) -> Self {
        Self { owner_type, id }
    }

    pub fn customer(id: u64) -> Self {
        Self::new(OwnerType::Customer, id)
    }

    pub fn project_group(id: u64) -> Self {
        Self::new(OwnerType::ProjectGroup, id)
    }

    pub fn project(id: u64) -> Self {
        Self::new(OwnerType::Project, id)
    }

    pub fn membership(id: u64) -> Self {
        Self::new(OwnerType::CloudProjectMembership, id)
    }
}

/// Parses `<type>:<id>`, e.g. `project:3` or `membership:7`.
impl FromStr for OwnerKey {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || Error::InvalidOwnerKey {
            value: s.to_string(),
        };

        let (tag, id) = s.split_once(':').ok_or_else(invalid)?;
        let owner_type: OwnerType = tag.trim().parse()?;
        let id: u64 = id.trim().parse().map_err(|_| invalid())?;
        Ok(Self::new(owner_type, id))
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner_type, self.id)
    }
}
