//! Init command implementation
//!
//! Creates `.provisioning/config.toml` and an empty state file.

use std::path::Path;

use colored::Colorize;
use prov_core::StateSnapshot;
use prov_meta::ConfigResolver;
use prov_meta::config::CONFIG_DIR;

use crate::error::{CliError, Result};

/// Run the init command
pub fn run_init(path: &Path, force: bool) -> Result<()> {
    println!(
        "{} Initializing {} in {}...",
        "=>".blue().bold(),
        CONFIG_DIR.cyan(),
        path.display()
    );

    init_project(path, force)?;

    println!("{} Project initialized!", "OK".green().bold());
    Ok(())
}

/// Write the config template and an empty state file
///
/// Refuses to overwrite an existing config unless `force` is set. An
/// existing state file is never touched.
pub fn init_project(path: &Path, force: bool) -> Result<()> {
    let resolver = ConfigResolver::new(path);
    if resolver.has_config() && !force {
        return Err(CliError::user(format!(
            "{} already exists. Use --force to overwrite.",
            resolver.config_path().display()
        )));
    }

    std::fs::create_dir_all(path.join(CONFIG_DIR))?;
    std::fs::write(resolver.config_path(), generate_config())?;

    let config = resolver.resolve()?;
    if !config.state_path.exists() {
        StateSnapshot::default().save(&config.state_path)?;
    }
    Ok(())
}

/// Config template with the default limits new owners start with
pub fn generate_config() -> String {
    let mut config = String::new();

    config.push_str("[core]\n");
    config.push_str("version = \"1\"\n");

    config.push_str("\n[store]\n");
    config.push_str("state_file = \"state.toml\"\n");

    config.push_str("\n[defaults.customer]\n");
    config.push_str("nc_project_count = 10.0\n");
    config.push_str("nc_user_count = 50.0\n");

    config.push_str("\n[defaults.cloud_project_membership]\n");
    config.push_str("storage = 1048576.0\n");
    config.push_str("vcpu = 20.0\n");
    config.push_str("ram = 51200.0\n");
    config.push_str("max_instances = 10.0\n");
    config.push_str("floating_ip_count = 5.0\n");

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use prov_meta::{Manifest, OwnerType};
    use tempfile::TempDir;

    #[test]
    fn test_generated_config_parses() {
        let manifest = Manifest::parse(&generate_config()).unwrap();
        assert_eq!(manifest.defaults["cloud_project_membership"]["vcpu"], 20.0);
    }

    #[test]
    fn test_init_writes_config_and_state() {
        let temp = TempDir::new().unwrap();
        init_project(temp.path(), false).unwrap();

        assert!(temp.path().join(".provisioning/config.toml").is_file());
        assert!(temp.path().join(".provisioning/state.toml").is_file());

        let config = ConfigResolver::new(temp.path()).resolve().unwrap();
        assert_eq!(config.default_limit(OwnerType::Customer, "nc_user_count"), 50.0);
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        init_project(temp.path(), false).unwrap();

        assert!(matches!(
            init_project(temp.path(), false),
            Err(CliError::User { .. })
        ));
        init_project(temp.path(), true).unwrap();
    }
}
