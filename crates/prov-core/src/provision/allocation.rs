//! Resource allocations and the quota deltas they imply

use prov_meta::{OwnerKey, names};
use serde::{Deserialize, Serialize};

use crate::quota::QuotaDeltas;
use crate::{Error, Result};

/// A proposed usage change for one owner
///
/// Positive deltas grow usage (creation, upsizing), negative deltas shrink it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAllocation {
    pub owner: OwnerKey,
    pub deltas: QuotaDeltas,
}

impl ResourceAllocation {
    pub fn new(owner: OwnerKey) -> Self {
        Self {
            owner,
            deltas: QuotaDeltas::new(),
        }
    }

    pub fn from_deltas(owner: OwnerKey, deltas: QuotaDeltas) -> Self {
        Self { owner, deltas }
    }

    /// Add a delta, summing with any existing delta for the same name
    pub fn with(mut self, name: impl Into<String>, delta: f64) -> Self {
        *self.deltas.entry(name.into()).or_insert(0.0) += delta;
        self
    }

    /// Usage a new virtual machine consumes
    pub fn for_instance(owner: OwnerKey, spec: &InstanceSpec) -> Self {
        Self::new(owner)
            .with(names::STORAGE, spec.system_volume_size + spec.data_volume_size)
            .with(names::VCPU, spec.cores)
            .with(names::RAM, spec.ram)
            .with(names::MAX_INSTANCES, 1.0)
    }

    /// Usage one floating IP consumes
    pub fn for_floating_ip(owner: OwnerKey) -> Self {
        Self::new(owner).with(names::FLOATING_IP_COUNT, 1.0)
    }

    /// The same allocation with every delta negated
    pub fn inverse(&self) -> Self {
        Self {
            owner: self.owner,
            deltas: self.deltas.iter().map(|(n, d)| (n.clone(), -d)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

/// Sizing of a virtual machine, in the units its quotas are kept in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub cores: f64,
    /// RAM in MiB
    pub ram: f64,
    /// System volume size in MiB
    pub system_volume_size: f64,
    /// Data volume size in MiB
    pub data_volume_size: f64,
}

/// Resize of an existing instance
///
/// Disk and flavor (cores/RAM) are resized separately: exactly one of the
/// two groups may be present in one request.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResizeRequest {
    pub disk_size_delta: Option<f64>,
    pub vcpu_delta: Option<f64>,
    pub ram_delta: Option<f64>,
}

impl ResizeRequest {
    /// Data volume resize from `current` to `new`
    pub fn disk(current: f64, new: f64) -> Self {
        Self {
            disk_size_delta: Some(new - current),
            ..Self::default()
        }
    }

    /// Flavor change from `(cores, ram)` to `(new_cores, new_ram)`
    pub fn flavor(cores: f64, ram: f64, new_cores: f64, new_ram: f64) -> Self {
        Self {
            vcpu_delta: Some(new_cores - cores),
            ram_delta: Some(new_ram - ram),
            ..Self::default()
        }
    }

    /// Quota deltas for this resize
    ///
    /// # Errors
    ///
    /// `InvalidRequest` when both disk and flavor deltas are present, or
    /// neither is.
    pub fn to_deltas(&self) -> Result<QuotaDeltas> {
        let flavor_requested = self.vcpu_delta.is_some() || self.ram_delta.is_some();

        match (self.disk_size_delta, flavor_requested) {
            (Some(_), true) => Err(Error::invalid_request(
                "cannot resize both disk size and flavor simultaneously",
            )),
            (None, false) => Err(Error::invalid_request(
                "either a disk size or a flavor change is required",
            )),
            (Some(disk), false) => Ok(QuotaDeltas::from([(names::STORAGE.to_string(), disk)])),
            (None, true) => {
                let mut deltas = QuotaDeltas::new();
                if let Some(vcpu) = self.vcpu_delta {
                    deltas.insert(names::VCPU.to_string(), vcpu);
                }
                if let Some(ram) = self.ram_delta {
                    deltas.insert(names::RAM.to_string(), ram);
                }
                Ok(deltas)
            }
        }
    }
}
