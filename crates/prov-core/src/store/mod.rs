//! State file persistence
//!
//! The whole inventory (owners, quotas, sync records) is written to a
//! single TOML file, by default `.provisioning/state.toml`. Reads take a
//! shared lock and writes an exclusive one, and a write goes to a temp
//! file that is renamed over the target.
//!
//! A process that loads, mutates and saves the state holds a [`StateLock`]
//! on the sidecar `<state>.lock` file for the whole cycle.

use std::fs::{self, File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use prov_meta::{OwnerKey, OwnerType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;
use crate::quota::Quota;
use crate::sync::{SyncEntity, SyncEntityKind, SyncRecord, SyncState};

/// Current state file format version
pub const STATE_VERSION: &str = "1";

/// Serialized form of the inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub version: String,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub owners: Vec<OwnerRecord>,
    #[serde(default)]
    pub quotas: Vec<QuotaRecord>,
    #[serde(default)]
    pub sync: Vec<SyncEntry>,
}

/// One registered owner and its parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerRecord {
    pub owner_type: OwnerType,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<OwnerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
}

impl OwnerRecord {
    pub fn new(owner: OwnerKey, parent: Option<OwnerKey>) -> Self {
        Self {
            owner_type: owner.owner_type,
            id: owner.id,
            parent_type: parent.map(|p| p.owner_type),
            parent_id: parent.map(|p| p.id),
        }
    }

    pub fn owner(&self) -> OwnerKey {
        OwnerKey::new(self.owner_type, self.id)
    }

    /// Parent key, `None` for roots or a half-written parent reference
    pub fn parent(&self) -> Option<OwnerKey> {
        match (self.parent_type, self.parent_id) {
            (Some(owner_type), Some(id)) => Some(OwnerKey::new(owner_type, id)),
            _ => None,
        }
    }
}

/// One quota row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub owner_type: OwnerType,
    pub owner_id: u64,
    pub name: String,
    pub uuid: Uuid,
    pub limit: f64,
    pub usage: f64,
}

impl QuotaRecord {
    pub fn new(owner: OwnerKey, quota: &Quota) -> Self {
        Self {
            owner_type: owner.owner_type,
            owner_id: owner.id,
            name: quota.name.clone(),
            uuid: quota.uuid,
            limit: quota.limit,
            usage: quota.usage,
        }
    }

    pub fn owner(&self) -> OwnerKey {
        OwnerKey::new(self.owner_type, self.owner_id)
    }

    pub fn to_quota(&self) -> Quota {
        Quota {
            uuid: self.uuid,
            name: self.name.clone(),
            limit: self.limit,
            usage: self.usage,
        }
    }
}

/// One sync record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEntry {
    pub kind: SyncEntityKind,
    pub id: u64,
    pub state: SyncState,
    pub version: u64,
    pub changed_at: DateTime<Utc>,
}

impl SyncEntry {
    pub fn new(entity: SyncEntity, record: SyncRecord) -> Self {
        Self {
            kind: entity.kind,
            id: entity.id,
            state: record.state,
            version: record.version,
            changed_at: record.changed_at,
        }
    }

    pub fn entity(&self) -> SyncEntity {
        SyncEntity {
            kind: self.kind,
            id: self.id,
        }
    }

    pub fn record(&self) -> SyncRecord {
        SyncRecord {
            state: self.state,
            version: self.version,
            changed_at: self.changed_at,
        }
    }
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            saved_at: Utc::now(),
            owners: Vec::new(),
            quotas: Vec::new(),
            sync: Vec::new(),
        }
    }
}

impl StateSnapshot {
    /// Load a snapshot with a shared lock
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, locked, or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        file.lock_shared()?;

        let mut content = String::new();
        (&file).read_to_string(&mut content)?;
        let snapshot: StateSnapshot = toml::from_str(&content)?;

        if snapshot.version != STATE_VERSION {
            tracing::warn!(
                path = %path.display(),
                version = %snapshot.version,
                expected = STATE_VERSION,
                "State file version differs, loading anyway"
            );
        }
        Ok(snapshot)
    }

    /// Load a snapshot, or an empty one if the file does not exist yet
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No state file, starting empty");
            Ok(Self::default())
        }
    }

    /// Save the snapshot atomically with an exclusive lock
    ///
    /// The parent directory is created if missing.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        lock_file.lock_exclusive()?;

        let temp_path = path.with_extension("toml.tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        tracing::debug!(
            path = %path.display(),
            owners = self.owners.len(),
            quotas = self.quotas.len(),
            "State saved"
        );
        Ok(())
    }
}

/// Exclusive lock on the sidecar file next to a state file
///
/// Held from before the state is loaded until after it is saved, so two
/// processes cannot both mutate the same loaded state. Released on drop.
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
    file: File,
}

impl StateLock {
    /// Block until the lock for `state_path` is acquired
    pub fn acquire(state_path: &Path) -> Result<Self> {
        let path = Self::lock_path(state_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.lock_exclusive()?;

        tracing::debug!(path = %path.display(), "State lock acquired");
        Ok(Self { path, file })
    }

    /// Sidecar lock file of a state file
    pub fn lock_path(state_path: &Path) -> PathBuf {
        state_path.with_extension("lock")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            tracing::warn!(path = %self.path.display(), error = %err, "Failed to release state lock");
        }
    }
}
