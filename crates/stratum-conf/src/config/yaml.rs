//! YAML file source
//!
//! Loads one or more YAML documents into a flat key/value mapping. Later files
//! update keys from earlier ones. A missing file contributes nothing.

use super::source::SourceError;
use indexmap::IndexMap;
use serde_json::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Loader for the YAML files attached to a configuration declaration.
#[derive(Debug, Clone, Default)]
pub struct YamlLoader {
	paths: Vec<PathBuf>,
}

impl YamlLoader {
	/// Create a loader for a single file.
	///
	/// # Examples
	///
	/// ```
	/// use stratum_conf::config::yaml::YamlLoader;
	///
	/// let values = YamlLoader::new("does/not/exist.yaml").load().unwrap();
	/// assert!(values.is_empty());
	/// ```
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			paths: vec![path.into()],
		}
	}

	pub fn with_paths<I, P>(paths: I) -> Self
	where
		I: IntoIterator<Item = P>,
		P: Into<PathBuf>,
	{
		Self {
			paths: paths.into_iter().map(Into::into).collect(),
		}
	}

	pub fn paths(&self) -> &[PathBuf] {
		&self.paths
	}

	/// Read every file in order and merge the top-level mappings.
	///
	/// Empty documents yield nothing. A document whose root is not a mapping
	/// is a [`SourceError::Yaml`].
	pub fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		let mut merged = IndexMap::new();

		for path in &self.paths {
			if !path.exists() {
				tracing::warn!(path = %path.display(), "YAML file not found, skipping");
				continue;
			}

			let content = fs::read_to_string(path).map_err(|source| SourceError::Io {
				path: path.clone(),
				source,
			})?;
			let document: Option<IndexMap<String, Value>> =
				serde_yaml::from_str(&content).map_err(|source| SourceError::Yaml {
					path: path.clone(),
					source,
				})?;

			if let Some(document) = document {
				tracing::trace!(path = %path.display(), keys = document.len(), "loaded YAML file");
				merged.extend(document);
			}
		}

		Ok(merged)
	}
}

/// Resolve `path` against `base_dir`.
///
/// Absolute paths are returned unchanged. Leading `..` components walk up
/// from `base_dir`; the rest is joined onto the result.
pub fn join_relative(path: impl AsRef<Path>, base_dir: impl AsRef<Path>) -> PathBuf {
	let path = path.as_ref();
	if path.is_absolute() {
		return path.to_path_buf();
	}

	let mut resolved = base_dir.as_ref().to_path_buf();
	let mut components = path.components().peekable();
	while let Some(component) = components.peek() {
		match component {
			Component::ParentDir => {
				resolved.pop();
			}
			Component::CurDir => {}
			_ => break,
		}
		components.next();
	}
	resolved.extend(components);
	resolved
}
