//! Project context
//!
//! Finds the project root from any directory below it and loads the
//! configuration and inventory state stored under `.provisioning/`.
//! An open context holds the project's state lock until it is dropped.

use std::path::{Path, PathBuf};

use prov_core::{Inventory, StateLock, StateSnapshot};
use prov_meta::config::CONFIG_DIR;
use prov_meta::{ConfigResolver, QuotaRegistry, ResolvedConfig};

use crate::error::{CliError, Result};

/// Walk up from `start` to the first directory containing `.provisioning/`
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Loaded configuration and inventory of one project
#[derive(Debug)]
pub struct ProjectContext {
    pub root: PathBuf,
    pub config: ResolvedConfig,
    pub inventory: Inventory,
    lock: StateLock,
}

impl ProjectContext {
    /// Load the project at `root`, or the nearest project above the
    /// current directory when `root` is `None`
    pub fn open(root: Option<&Path>) -> Result<Self> {
        let root = match root {
            Some(root) => root.to_path_buf(),
            None => {
                let cwd = std::env::current_dir()?;
                find_project_root(&cwd).ok_or_else(|| {
                    CliError::user(format!(
                        "No {} directory found. Run 'prov init' first.",
                        CONFIG_DIR
                    ))
                })?
            }
        };

        let config = ConfigResolver::new(&root).resolve()?;
        let lock = StateLock::acquire(&config.state_path)?;
        let snapshot = StateSnapshot::load_or_default(&config.state_path)?;
        let inventory = Inventory::restore(
            QuotaRegistry::with_builtins(),
            config.defaults.clone(),
            &snapshot,
        )?;

        tracing::debug!(root = %root.display(), owners = snapshot.owners.len(), "Loaded project");
        Ok(Self {
            root,
            config,
            inventory,
            lock,
        })
    }

    /// Write the inventory back to the state file
    pub fn save(&self) -> Result<()> {
        tracing::debug!(root = %self.root.display(), lock = %self.lock.path().display(), "Saving state");
        self.inventory.snapshot().save(&self.config.state_path)?;
        Ok(())
    }
}
