//! Configuration resolution with hierarchical merge

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::owner::OwnerType;

use super::manifest::Manifest;

/// Project-level configuration directory name
pub const CONFIG_DIR: &str = ".provisioning";

const DEFAULT_STATE_FILE: &str = "state.toml";

/// Default limits per owner type and quota name
pub type DefaultLimits = BTreeMap<OwnerType, BTreeMap<String, f64>>;

/// Limit a new owner starts with for a quota, 0 when not configured
pub fn default_limit(defaults: &DefaultLimits, owner_type: OwnerType, quota_name: &str) -> f64 {
    defaults
        .get(&owner_type)
        .and_then(|limits| limits.get(quota_name))
        .copied()
        .unwrap_or(0.0)
}

/// The effective configuration after merging all layers
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub version: String,
    /// Absolute path of the state file
    pub state_path: PathBuf,
    /// Default limits per owner type and quota name
    pub defaults: DefaultLimits,
}

impl ResolvedConfig {
    /// Default limit for a quota, 0 when not configured.
    pub fn default_limit(&self, owner_type: OwnerType, quota_name: &str) -> f64 {
        default_limit(&self.defaults, owner_type, quota_name)
    }

    /// Build the resolved form of a merged manifest.
    ///
    /// Fails if a `[defaults.<type>]` table names an unknown owner type.
    pub fn from_manifest(root: &Path, manifest: Manifest) -> Result<Self> {
        let mut defaults = BTreeMap::new();
        for (tag, limits) in manifest.defaults {
            let owner_type: OwnerType = tag.parse()?;
            defaults.insert(owner_type, limits);
        }

        let state_file = manifest
            .store
            .state_file
            .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string());

        Ok(Self {
            version: manifest.core.version,
            state_path: root.join(CONFIG_DIR).join(state_file),
            defaults,
        })
    }
}

/// Resolves configuration by merging multiple sources
///
/// 1. User defaults (`<config_dir>/provisioning/config.toml`)
/// 2. Project config (`.provisioning/config.toml`)
/// 3. Local overrides (`.provisioning/config.local.toml`)
///
/// Later sources override earlier ones.
pub struct ConfigResolver {
    root: PathBuf,

    /// Override for the user config directory (used for testing).
    /// When `None`, `dirs::config_dir()` is used.
    user_config_dir_override: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create a resolver for the given project root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            user_config_dir_override: None,
        }
    }

    /// Create a resolver with a custom user config directory.
    pub fn with_user_config_dir(root: impl Into<PathBuf>, user_config_dir: PathBuf) -> Self {
        Self {
            root: root.into(),
            user_config_dir_override: Some(user_config_dir),
        }
    }

    fn user_config_dir(&self) -> Option<PathBuf> {
        if let Some(ref override_dir) = self.user_config_dir_override {
            return Some(override_dir.clone());
        }
        dirs::config_dir().map(|d| d.join("provisioning"))
    }

    /// Resolve the configuration by merging all layers
    ///
    /// Missing layers are skipped. Invalid TOML in any layer is an error.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let mut manifest = Manifest::default();

        if let Some(user_dir) = self.user_config_dir() {
            let user_config_path = user_dir.join("config.toml");
            if user_config_path.is_file() {
                tracing::debug!(?user_config_path, "Loading user config (layer 1)");
                manifest.merge(&load_manifest(&user_config_path)?);
            } else {
                tracing::debug!(?user_config_path, "No user config found (layer 1)");
            }
        }

        let project_config_path = self.config_path();
        if project_config_path.is_file() {
            tracing::debug!(?project_config_path, "Loading project config (layer 2)");
            manifest.merge(&load_manifest(&project_config_path)?);
        }

        let local_config_path = self.root.join(CONFIG_DIR).join("config.local.toml");
        if local_config_path.is_file() {
            tracing::debug!(?local_config_path, "Loading local config (layer 3)");
            manifest.merge(&load_manifest(&local_config_path)?);
        }

        ResolvedConfig::from_manifest(&self.root, manifest)
    }

    /// Project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the project config file
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_DIR).join("config.toml")
    }

    /// Check if a project configuration exists
    pub fn has_config(&self) -> bool {
        self.config_path().is_file()
    }
}

fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Manifest::parse(&content).map_err(|e| Error::InvalidConfig {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
