//! Testing utilities for configuration declarations
//!
//! Isolated temp directories for YAML files and scoped process-environment
//! changes that are undone on drop. Tests touching the process environment
//! should be marked `#[serial(process_env)]`.

use super::source::Environment;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test environment helper
///
/// Owns a temporary directory and remembers every environment variable it
/// changes so the original state can be restored.
pub struct TestEnv {
	temp_dir: TempDir,
	original_env: HashMap<String, Option<String>>,
	modified_keys: Vec<String>,
}

impl TestEnv {
	/// Create a new test environment
	///
	/// # Examples
	///
	/// ```
	/// use stratum_conf::config::testing::TestEnv;
	///
	/// let test_env = TestEnv::new().unwrap();
	/// assert!(test_env.path().exists());
	/// ```
	pub fn new() -> std::io::Result<Self> {
		Ok(Self {
			temp_dir: TempDir::new()?,
			original_env: HashMap::new(),
			modified_keys: Vec::new(),
		})
	}

	pub fn path(&self) -> &Path {
		self.temp_dir.path()
	}

	fn remember(&mut self, key: &str) {
		if !self.original_env.contains_key(key) {
			self.original_env.insert(key.to_string(), env::var(key).ok());
		}
		if !self.modified_keys.iter().any(|k| k == key) {
			self.modified_keys.push(key.to_string());
		}
	}

	/// Set a process environment variable until this helper is dropped.
	pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
		let key = key.into();
		self.remember(&key);

		// SAFETY: Setting environment variables is unsafe in multi-threaded programs.
		// TestEnv is designed for use in tests with #[serial] to ensure exclusive access.
		unsafe {
			env::set_var(&key, value.into());
		}
	}

	/// Remove a process environment variable until this helper is dropped.
	pub fn remove_var(&mut self, key: impl Into<String>) {
		let key = key.into();
		self.remember(&key);

		// SAFETY: Removing environment variables is unsafe in multi-threaded programs.
		// TestEnv is designed for use in tests with #[serial] to ensure exclusive access.
		unsafe {
			env::remove_var(&key);
		}
	}

	/// Write a YAML file into the temporary directory.
	///
	/// # Examples
	///
	/// ```
	/// use stratum_conf::config::testing::TestEnv;
	///
	/// let test_env = TestEnv::new().unwrap();
	/// let path = test_env.create_yaml_file("app.yaml", "PORT: 8080\n").unwrap();
	/// assert!(path.exists());
	/// ```
	pub fn create_yaml_file(&self, filename: &str, content: &str) -> std::io::Result<PathBuf> {
		let path = self.temp_dir.path().join(filename);
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&path, content)?;
		Ok(path)
	}

	/// Snapshot the process environment as it is now.
	pub fn environment(&self) -> Environment {
		Environment::from_process()
	}
}

impl Drop for TestEnv {
	fn drop(&mut self) {
		for key in &self.modified_keys {
			if let Some(original) = self.original_env.get(key) {
				// SAFETY: Restoring environment variables is unsafe in multi-threaded programs.
				// TestEnv is designed for use in tests with #[serial] to ensure exclusive access.
				unsafe {
					match original {
						Some(val) => env::set_var(key, val),
						None => env::remove_var(key),
					}
				}
			}
		}
	}
}

impl Default for TestEnv {
	fn default() -> Self {
		Self::new().expect("Failed to create test environment")
	}
}

/// Builder for a [`TestEnv`] preloaded with variables and YAML files.
///
/// # Examples
///
/// ```
/// use stratum_conf::config::testing::TestConfigBuilder;
///
/// let test_env = TestConfigBuilder::new()
///     .yaml("app.yaml", "HOST: localhost\n")
///     .build();
/// assert!(test_env.path().join("app.yaml").exists());
/// ```
#[derive(Default)]
pub struct TestConfigBuilder {
	env_vars: Vec<(String, String)>,
	yaml_files: Vec<(String, String)>,
}

impl TestConfigBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.env_vars.push((key.into(), value.into()));
		self
	}

	pub fn yaml(mut self, filename: impl Into<String>, content: impl Into<String>) -> Self {
		self.yaml_files.push((filename.into(), content.into()));
		self
	}

	pub fn build(self) -> TestEnv {
		let mut test_env = TestEnv::default();

		for (key, value) in self.env_vars {
			test_env.set_var(key, value);
		}

		for (filename, content) in &self.yaml_files {
			test_env
				.create_yaml_file(filename, content)
				.expect("Failed to write YAML file");
		}

		test_env
	}
}
