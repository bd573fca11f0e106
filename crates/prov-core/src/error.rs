//! Error types for prov-core

use prov_meta::{OwnerKey, OwnerType};

use crate::quota::QuotaViolations;
use crate::sync::{SyncEntity, SyncEvent, SyncState};

/// Result type for prov-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in prov-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// One or more quotas would exceed their limit. Lists every violation.
    #[error("{0}")]
    QuotaExceeded(QuotaViolations),

    /// The owner's backend account cannot currently be reconciled
    #[error("{owner} is not in sync with its backend (state: {state})")]
    OwnerNotSynced { owner: OwnerKey, state: SyncState },

    /// Transition not allowed from the entity's current state
    #[error("Cannot apply {event} to {entity} in state {from}")]
    InvalidTransition {
        entity: SyncEntity,
        from: SyncState,
        event: SyncEvent,
    },

    /// Optimistic update lost against a concurrent writer
    #[error("Stale update for {entity}: expected version {expected}, found {actual}")]
    StaleVersion {
        entity: SyncEntity,
        expected: u64,
        actual: u64,
    },

    /// Malformed allocation request
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Aggregation over owners of different types
    #[error("All owners have to be of the same type, got: {}", join_types(.found))]
    MixedOwnerType { found: Vec<OwnerType> },

    /// Owner type with no registry entry
    #[error("Unknown owner type: {owner_type}")]
    UnknownOwnerType { owner_type: String },

    /// Owner has no quota with this name
    #[error("Quota '{name}' not found for {owner}")]
    QuotaNotFound { owner: OwnerKey, name: String },

    /// Owner is not registered
    #[error("Owner not found: {owner}")]
    OwnerNotFound { owner: OwnerKey },

    /// Synchronizable entity is not tracked
    #[error("Sync entity not found: {entity}")]
    SyncEntityNotFound { entity: SyncEntity },

    /// Owner registered twice
    #[error("Owner already registered: {owner}")]
    OwnerExists { owner: OwnerKey },

    /// Parent does not match the owner type's declared parent type
    #[error("Invalid parent for {owner}: {reason}")]
    InvalidParent { owner: OwnerKey, reason: String },

    /// Error from prov-meta
    #[error(transparent)]
    Meta(prov_meta::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    /// Create an invalid request error with the given message
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }
}

impl From<prov_meta::Error> for Error {
    fn from(err: prov_meta::Error) -> Self {
        match err {
            prov_meta::Error::UnknownOwnerType { owner_type } => {
                Error::UnknownOwnerType { owner_type }
            }
            other => Error::Meta(other),
        }
    }
}

fn join_types(types: &[OwnerType]) -> String {
    types
        .iter()
        .map(OwnerType::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
