//! Configuration declarations
//!
//! A [`ConfigDeclaration`] collects what a configuration says about itself:
//! body attributes, YAML files and lock options. [`declare_fields`] turns
//! those into field descriptors, and [`resolve_with`] runs the resolution
//! engine to produce a [`ResolvedConfig`].
//!
//! Body attributes whose names are not valid variable names (lower-case
//! helpers, for instance) are not configuration variables and are ignored.
//!
//! [`declare_fields`]: ConfigDeclaration::declare_fields
//! [`resolve_with`]: ConfigDeclaration::resolve_with

use super::field::{ConfigField, is_valid_var_name};
use super::keyword::{is_metadata_str, parse_keyword_str, parse_metadata_str};
use super::resolve::{Candidates, ResolveResult, ResolvedConfig, resolve};
use super::source::{Environment, SourceKind, SourcePriority};
use super::yaml::{YamlLoader, join_relative};
use indexmap::IndexMap;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// A body attribute of a configuration declaration.
#[derive(Debug, Clone)]
pub enum ClassAttr {
	/// Plain value: declares a field with this default and supplies it as the
	/// class-body candidate.
	Value(Value),
	/// Value followed by flags: `"locked"`, `"required"`,
	/// `"metadata={k=v, ..}"` or any `"attr=value"` keyword string.
	Tuple(Value, Vec<String>),
	/// Fully built field descriptor. Its default is used, but it supplies no
	/// class-body candidate.
	Field(ConfigField),
	/// Mapping of field attributes (`datatype`, `default`, `locked`, ...).
	Spec(IndexMap<String, Value>),
}

impl From<Value> for ClassAttr {
	fn from(value: Value) -> Self {
		Self::Value(value)
	}
}

impl From<ConfigField> for ClassAttr {
	fn from(field: ConfigField) -> Self {
		Self::Field(field)
	}
}

impl From<IndexMap<String, Value>> for ClassAttr {
	fn from(spec: IndexMap<String, Value>) -> Self {
		Self::Spec(spec)
	}
}

/// Options of a declaration.
#[derive(Debug, Clone)]
pub struct DeclarationOptions {
	/// Reject fields added after resolution.
	pub lock_attrs: bool,
	/// Reject value changes once the configuration is initialized.
	pub lock_values: bool,
	/// Directory relative YAML paths are resolved against.
	pub yaml_base_dir: Option<PathBuf>,
}

impl Default for DeclarationOptions {
	fn default() -> Self {
		Self {
			lock_attrs: true,
			lock_values: true,
			yaml_base_dir: None,
		}
	}
}

/// Fields and class-body candidates produced by the declaration phase.
#[derive(Debug, Clone, Default)]
struct Declared {
	fields: IndexMap<String, Arc<ConfigField>>,
	class_values: IndexMap<String, Value>,
}

impl Declared {
	fn declare(&mut self, field: ConfigField) {
		self.fields.insert(field.name().to_string(), Arc::new(field));
	}
}

/// Builder for a configuration.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use stratum_conf::config::declaration::{ClassAttr, ConfigDeclaration};
/// use stratum_conf::config::source::{Environment, SourcePriority};
///
/// let base = ConfigDeclaration::new("BaseConfig")
///     .value("HOST", "localhost")
///     .attr("API_KEY", ClassAttr::Tuple(json!("dev-key"), vec!["locked".into()]))
///     .resolve_with(&Environment::default(), None, &SourcePriority::default())
///     .unwrap();
///
/// let child = ConfigDeclaration::new("ChildConfig")
///     .value("HOST", "example.com")
///     .value("API_KEY", "prod-key")
///     .resolve_with(&Environment::default(), Some(&base), &SourcePriority::default())
///     .unwrap();
///
/// assert_eq!(child.get("host"), Some(&json!("example.com")));
/// assert_eq!(child.get("api_key"), Some(&json!("dev-key")));
/// ```
#[derive(Debug, Clone)]
pub struct ConfigDeclaration {
	name: String,
	attrs: IndexMap<String, ClassAttr>,
	yaml_paths: Vec<PathBuf>,
	options: DeclarationOptions,
}

impl ConfigDeclaration {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			attrs: IndexMap::new(),
			yaml_paths: Vec::new(),
			options: DeclarationOptions::default(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Add a body attribute. A later attribute with the same name replaces
	/// the earlier one.
	pub fn attr(mut self, name: impl Into<String>, attr: impl Into<ClassAttr>) -> Self {
		self.attrs.insert(name.into(), attr.into());
		self
	}

	/// Shorthand for [`ClassAttr::Value`].
	pub fn value(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attr(name, ClassAttr::Value(value.into()))
	}

	/// Attach a YAML file. Files are read in the order they are attached.
	pub fn yaml(mut self, path: impl Into<PathBuf>) -> Self {
		self.yaml_paths.push(path.into());
		self
	}

	pub fn options(mut self, options: DeclarationOptions) -> Self {
		self.options = options;
		self
	}

	pub fn lock_attrs(mut self, lock: bool) -> Self {
		self.options.lock_attrs = lock;
		self
	}

	pub fn lock_values(mut self, lock: bool) -> Self {
		self.options.lock_values = lock;
		self
	}

	pub fn yaml_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.options.yaml_base_dir = Some(dir.into());
		self
	}

	/// YAML paths with relative entries joined onto the base directory.
	pub fn yaml_paths(&self) -> Vec<PathBuf> {
		match &self.options.yaml_base_dir {
			Some(base) => self
				.yaml_paths
				.iter()
				.map(|path| join_relative(path, base))
				.collect(),
			None => self.yaml_paths.clone(),
		}
	}

	/// Run the declaration phase alone.
	pub fn declare_fields(&self) -> ResolveResult<Vec<(String, Arc<ConfigField>)>> {
		let yaml = self.load_yaml()?;
		let declared = self.declare(&yaml)?;
		Ok(declared.fields.into_iter().collect())
	}

	/// Declare and resolve against `env`, on top of `parent` when given.
	pub fn resolve_with(
		&self,
		env: &Environment,
		parent: Option<&ResolvedConfig>,
		order: &SourcePriority,
	) -> ResolveResult<ResolvedConfig> {
		let yaml = self.load_yaml()?;
		let declared = self.declare(&yaml)?;

		let environ: IndexMap<String, Value> = declared
			.fields
			.keys()
			.filter_map(|name| {
				env.get(name)
					.map(|value| (name.clone(), Value::String(value.to_string())))
			})
			.collect();
		tracing::trace!(config = %self.name, matched = environ.len(), "environment scanned");

		let candidates = Candidates::new(&self.name)
			.with_source(SourceKind::Environ, environ)
			.with_source(SourceKind::Yaml, yaml)
			.with_source(SourceKind::Class, declared.class_values);

		let fields: Vec<Arc<ConfigField>> = declared.fields.into_values().collect();
		let values = resolve(
			&fields,
			&candidates,
			parent.map(ResolvedConfig::values),
			order,
		)?;

		ResolvedConfig::build(
			&self.name,
			parent,
			values,
			order.clone(),
			self.options.lock_attrs,
			self.options.lock_values,
		)
	}

	/// [`resolve_with`](Self::resolve_with) against the current process
	/// environment and the default source order.
	pub fn resolve_from_process(&self, parent: Option<&ResolvedConfig>) -> ResolveResult<ResolvedConfig> {
		self.resolve_with(&Environment::from_process(), parent, &SourcePriority::default())
	}

	fn load_yaml(&self) -> ResolveResult<IndexMap<String, Value>> {
		if self.yaml_paths.is_empty() {
			return Ok(IndexMap::new());
		}
		Ok(YamlLoader::with_paths(self.yaml_paths()).load()?)
	}

	fn declare(&self, yaml: &IndexMap<String, Value>) -> ResolveResult<Declared> {
		let mut declared = Declared::default();

		for (key, value) in yaml {
			let field = match value {
				Value::Null => ConfigField::new(key)?,
				Value::Object(spec) => spec
					.iter()
					.filter(|(attr, _)| attr.as_str() != "name")
					.try_fold(ConfigField::builder(key), |builder, (attr, value)| {
						builder.attr(attr, value.clone())
					})?
					.build()?,
				scalar => ConfigField::builder(key)
					.default_value(scalar.clone())
					.build()?,
			};
			declared.declare(field);
		}

		for (name, attr) in &self.attrs {
			if !is_valid_var_name(name) {
				tracing::trace!(config = %self.name, attr = %name, "not a configuration attribute");
				continue;
			}

			match attr {
				ClassAttr::Value(Value::Null) => {
					if !declared.fields.contains_key(name) {
						declared.declare(ConfigField::new(name)?);
					}
				}
				ClassAttr::Value(value) => {
					let described = matches!(yaml.get(name), Some(Value::Object(_) | Value::Null));
					if !described {
						declared.declare(
							ConfigField::builder(name)
								.default_value(value.clone())
								.build()?,
						);
					}
					declared.class_values.insert(name.clone(), value.clone());
				}
				ClassAttr::Field(field) => {
					let mut field = field.clone();
					if field.name() != name.as_str() {
						field.set("name", Value::String(name.clone()))?;
					}
					declared.declare(field);
				}
				ClassAttr::Tuple(value, flags) => match tuple_field(name, value, flags) {
					Ok(field) => {
						declared.declare(field);
						if !value.is_null() {
							declared.class_values.insert(name.clone(), value.clone());
						}
					}
					Err(err) => {
						tracing::warn!(config = %self.name, attr = %name, error = %err, "skipping malformed attribute");
					}
				},
				ClassAttr::Spec(spec) => match spec_field(name, spec) {
					Ok(field) => declared.declare(field),
					Err(err) => {
						tracing::warn!(config = %self.name, attr = %name, error = %err, "skipping malformed attribute");
					}
				},
			}
		}

		Ok(declared)
	}
}

fn tuple_field(name: &str, value: &Value, flags: &[String]) -> ResolveResult<ConfigField> {
	let mut builder = ConfigField::builder(name);
	if !value.is_null() {
		builder = builder.default_value(value.clone());
	}

	// Flags are case-insensitive; items without a delimiter are ignored.
	for flag in flags {
		let item = flag.trim();
		builder = match item.to_ascii_lowercase().as_str() {
			"locked" => builder.locked(true),
			"required" => builder.required(true),
			_ if is_metadata_str(item) => parse_metadata_str(item)?
				.into_iter()
				.fold(builder, |builder, (key, value)| builder.metadata(key, value)),
			_ if item.contains(['=', ':']) => {
				let (attr, value) = parse_keyword_str(item)?;
				builder.attr(&attr, value)?
			}
			_ => {
				tracing::trace!(attr = %name, flag = %item, "ignoring tuple flag");
				builder
			}
		};
	}

	Ok(builder.build()?)
}

fn spec_field(name: &str, spec: &IndexMap<String, Value>) -> ResolveResult<ConfigField> {
	let builder = spec
		.iter()
		.filter(|(attr, _)| attr.as_str() != "name")
		.try_fold(ConfigField::builder(name), |builder, (attr, value)| {
			builder.attr(attr, value.clone())
		})?;
	Ok(builder.build()?)
}
