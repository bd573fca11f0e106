//! [`TestProject`] builder for provisioning-manager test scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory with helpers for writing `.provisioning/` files
///
/// # Example
///
/// ```rust,no_run
/// use prov_test_utils::TestProject;
///
/// let project = TestProject::new();
/// project.write_config(&[("cloud_project_membership", "storage", 100.0)]);
/// project.assert_file_exists(".provisioning/config.toml");
/// ```
pub struct TestProject {
    temp_dir: TempDir,
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProject {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root().join(".provisioning")
    }

    pub fn state_path(&self) -> PathBuf {
        self.config_dir().join("state.toml")
    }

    /// Write `.provisioning/config.toml` with the given default limits
    ///
    /// Each entry is `(owner_type, quota_name, limit)`.
    pub fn write_config(&self, defaults: &[(&str, &str, f64)]) {
        fs::create_dir_all(self.config_dir()).unwrap();

        let mut config = String::from("[core]\nversion = \"1\"\n");
        let mut owner_types: Vec<&str> = defaults.iter().map(|(t, _, _)| *t).collect();
        owner_types.sort_unstable();
        owner_types.dedup();
        for owner_type in owner_types {
            config.push_str(&format!("\n[defaults.{owner_type}]\n"));
            for (_, name, limit) in defaults.iter().filter(|(t, _, _)| *t == owner_type) {
                config.push_str(&format!("{name} = {limit:?}\n"));
            }
        }

        fs::write(self.config_dir().join("config.toml"), config).unwrap();
    }

    /// Assert that `path` (relative to the root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the file at `path` (relative to root) contains `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or does not contain `content`.
    pub fn assert_file_contains(&self, path: &str, content: &str) {
        let full_path = self.root().join(path);
        let file_content = fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()));
        assert!(
            file_content.contains(content),
            "File {} does not contain expected content.\nExpected: {}\nActual: {}",
            full_path.display(),
            content,
            file_content
        );
    }
}
