//! Configuration resolution
//!
//! Configuration is loaded and merged from these sources (later sources override earlier):
//!
//! 1. **User defaults** - `<config_dir>/provisioning/config.toml`
//! 2. **Project config** - `.provisioning/config.toml`
//! 3. **Local overrides** - `.provisioning/config.local.toml`
//!
//! # Example
//!
//! ```toml
//! [core]
//! version = "1"
//!
//! [store]
//! state_file = "state.toml"
//!
//! [defaults.cloud_project_membership]
//! vcpu = 8
//! ram = 16384
//! storage = 102400
//! max_instances = 4
//! ```

mod manifest;
mod resolver;

pub use manifest::{CoreSection, Manifest, StoreSection};
pub use resolver::{CONFIG_DIR, ConfigResolver, DefaultLimits, ResolvedConfig, default_limit};
