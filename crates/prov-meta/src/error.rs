//! Error types for prov-meta

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration at {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    #[error("Unknown owner type: {owner_type}")]
    UnknownOwnerType { owner_type: String },

    #[error("Invalid owner reference '{value}', expected <type>:<id>")]
    InvalidOwnerKey { value: String },
}
