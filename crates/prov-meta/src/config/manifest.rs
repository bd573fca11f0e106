//! Manifest parsing for config.toml files
//!
//! A manifest is the parsed content of a single config file. Manifests from
//! the user, project and local layers are merged into a `ResolvedConfig`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn default_version() -> String {
    "1".to_string()
}

/// Core configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreSection {
    /// Configuration schema version
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for CoreSection {
    fn default() -> Self {
        Self {
            version: default_version(),
        }
    }
}

/// Where the quota and sync state is persisted
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreSection {
    /// State file name, relative to `.provisioning/`
    #[serde(default)]
    pub state_file: Option<String>,
}

/// Provisioning configuration manifest parsed from config.toml
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub core: CoreSection,

    #[serde(default)]
    pub store: StoreSection,

    /// Default quota limits applied when an owner is registered,
    /// keyed by owner type tag then quota name.
    #[serde(default)]
    pub defaults: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Manifest {
    /// Parse a manifest from TOML content
    ///
    /// # Example
    ///
    /// ```
    /// use prov_meta::Manifest;
    ///
    /// let manifest = Manifest::parse(r#"
    /// [defaults.project]
    /// vcpu = 16
    /// "#).unwrap();
    ///
    /// assert_eq!(manifest.defaults["project"]["vcpu"], 16.0);
    /// ```
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Merge another manifest into this one
    ///
    /// `other` takes precedence. Default limits are merged per owner type
    /// and quota name, so a later layer can override a single limit without
    /// restating the rest.
    pub fn merge(&mut self, other: &Manifest) {
        if other.core.version != default_version() {
            self.core.version = other.core.version.clone();
        }

        if other.store.state_file.is_some() {
            self.store.state_file = other.store.state_file.clone();
        }

        for (owner_type, limits) in &other.defaults {
            let base = self.defaults.entry(owner_type.clone()).or_default();
            for (name, limit) in limits {
                base.insert(name.clone(), *limit);
            }
        }
    }
}
