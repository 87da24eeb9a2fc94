//! Configuration sources and their priority
//!
//! A value may come from four places: an instance-level override, the body of
//! a configuration declaration, a YAML file, or the process environment. When
//! several of them supply the same field, the [`SourcePriority`] order decides
//! which one wins (instance > class body > YAML > environment by default).

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Error type for configuration sources
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
	#[error("IO error reading {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("YAML error in {path}: {source}")]
	Yaml {
		path: PathBuf,
		#[source]
		source: serde_yaml::Error,
	},

	#[error("Invalid source priority: {0}")]
	InvalidPriority(String),
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
	/// Override applied to an already-resolved configuration.
	Instance,
	/// Attribute declared in the configuration body.
	Class,
	/// Entry of the configuration's YAML file.
	Yaml,
	/// Process environment variable.
	Environ,
}

impl SourceKind {
	pub const ALL: [SourceKind; 4] = [
		SourceKind::Instance,
		SourceKind::Class,
		SourceKind::Yaml,
		SourceKind::Environ,
	];

	pub fn names() -> Vec<&'static str> {
		Self::ALL.iter().map(SourceKind::name).collect()
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::Instance => "CONFIG_INSTANCE",
			Self::Class => "CONFIG_CLASS",
			Self::Yaml => "CONFIG_YAML",
			Self::Environ => "OS_ENVIRON",
		}
	}
}

impl fmt::Display for SourceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Total order of sources, highest priority first.
///
/// Lower index means higher priority. Every [`SourceKind`] appears exactly
/// once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePriority {
	order: Vec<SourceKind>,
}

impl SourcePriority {
	/// Create a custom order.
	///
	/// # Examples
	///
	/// ```
	/// use stratum_conf::config::source::{SourceKind, SourcePriority};
	///
	/// let order = SourcePriority::new(vec![
	///     SourceKind::Instance,
	///     SourceKind::Environ,
	///     SourceKind::Class,
	///     SourceKind::Yaml,
	/// ])
	/// .unwrap();
	/// assert_eq!(order.index_of(SourceKind::Environ), 1);
	/// ```
	pub fn new(order: Vec<SourceKind>) -> Result<Self, SourceError> {
		for kind in SourceKind::ALL {
			let count = order.iter().filter(|k| **k == kind).count();
			if count != 1 {
				return Err(SourceError::InvalidPriority(format!(
					"{} must appear exactly once (found {} times)",
					kind, count
				)));
			}
		}
		if order.len() != SourceKind::ALL.len() {
			return Err(SourceError::InvalidPriority(format!(
				"expected {} sources, got {}",
				SourceKind::ALL.len(),
				order.len()
			)));
		}
		Ok(Self { order })
	}

	pub fn index_of(&self, kind: SourceKind) -> usize {
		self.order
			.iter()
			.position(|k| *k == kind)
			.unwrap_or(self.order.len())
	}

	/// Sources from lowest to highest priority, the order in which candidates
	/// are folded so that higher priorities are compared last.
	pub fn iter_lowest_first(&self) -> impl Iterator<Item = SourceKind> + '_ {
		self.order.iter().rev().copied()
	}
}

impl Default for SourcePriority {
	fn default() -> Self {
		Self {
			order: SourceKind::ALL.to_vec(),
		}
	}
}

/// Read-only snapshot of environment variables.
///
/// The snapshot is taken once; later changes to the process environment are
/// not observed.
#[derive(Debug, Clone, Default)]
pub struct Environment {
	prefix: Option<String>,
	vars: IndexMap<String, String>,
}

impl Environment {
	/// Snapshot the current process environment.
	pub fn from_process() -> Self {
		Self::from_pairs(std::env::vars())
	}

	/// Build a snapshot from explicit pairs.
	///
	/// # Examples
	///
	/// ```
	/// use stratum_conf::config::source::Environment;
	///
	/// let env = Environment::from_pairs([("APP_PORT", "8080")]).with_prefix("APP_");
	/// assert_eq!(env.get("PORT"), Some("8080"));
	/// ```
	pub fn from_pairs<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			prefix: None,
			vars: pairs
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		}
	}

	/// Look variables up as `{prefix}{name}`.
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}

	fn key_name(&self, name: &str) -> String {
		match &self.prefix {
			Some(prefix) => format!("{}{}", prefix, name),
			None => name.to_string(),
		}
	}

	pub fn get(&self, name: &str) -> Option<&str> {
		self.vars.get(&self.key_name(name)).map(String::as_str)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.vars.contains_key(&self.key_name(name))
	}

	pub fn len(&self) -> usize {
		self.vars.len()
	}

	pub fn is_empty(&self) -> bool {
		self.vars.is_empty()
	}
}
