//! Metadata and configuration management for Provisioning Manager.
//!
//! This crate provides the owner type tags, the quota registry that maps
//! each owner type to its recognized quota names and parent type, and the
//! layered `.provisioning/config.toml` configuration.

pub mod config;
pub mod error;
pub mod owner;
pub mod registry;

pub use config::{ConfigResolver, DefaultLimits, Manifest, ResolvedConfig};
pub use error::{Error, Result};
pub use owner::{OwnerKey, OwnerType};
pub use registry::{OwnerTypeSpec, QuotaRegistry, names};
