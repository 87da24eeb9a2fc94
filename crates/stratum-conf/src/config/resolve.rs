//! Resolution engine
//!
//! [`resolve`] turns a list of declared fields and the raw candidates supplied
//! by each source into one winning [`ConfigValue`] per field, then folds every
//! winner against the parent configuration's winner for the same field. The
//! result is wrapped in a [`ResolvedConfig`], which also carries the
//! configuration's runtime flags in a shared [`NestedRecord`] tree.

use super::field::{ConfigField, FieldError};
use super::keyword::KeywordError;
use super::kind::{DataType, FieldKind, type_name};
use super::source::{SourceError, SourceKind, SourcePriority};
use super::value::{CompareError, ConfigValue, ValueError};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use stratum_utils::{NestedRecord, RecordError};

/// Winning value per declared field name.
pub type ResolvedMap = IndexMap<String, ConfigValue>;

/// Result type for declaration and resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors raised while declaring, resolving or mutating a configuration.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
	#[error(transparent)]
	Field(#[from] FieldError),

	#[error(transparent)]
	Value(#[from] ValueError),

	#[error(transparent)]
	Compare(#[from] CompareError),

	#[error(transparent)]
	Source(#[from] SourceError),

	#[error(transparent)]
	Keyword(#[from] KeywordError),

	#[error(transparent)]
	Record(#[from] RecordError),

	#[error("Config `{config}` - attributes are locked. Cannot add `{key}`.")]
	AttrsLocked { config: String, key: String },

	#[error("Config `{config}` - values are locked. Cannot change `{key}`.")]
	ValuesLocked { config: String, key: String },

	#[error("Config `{config}` - no field named `{key}`.")]
	UnknownField { config: String, key: String },
}

/// Raw candidate values per source, keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct Candidates {
	source_name: String,
	sources: HashMap<SourceKind, IndexMap<String, Value>>,
}

impl Candidates {
	/// `source_name` labels every value produced from these candidates,
	/// usually the name of the declaring configuration.
	pub fn new(source_name: impl Into<String>) -> Self {
		Self {
			source_name: source_name.into(),
			sources: HashMap::new(),
		}
	}

	pub fn source_name(&self) -> &str {
		&self.source_name
	}

	/// Replace every candidate of `kind`.
	pub fn with_source(mut self, kind: SourceKind, values: IndexMap<String, Value>) -> Self {
		self.sources.insert(kind, values);
		self
	}

	pub fn insert(&mut self, kind: SourceKind, name: impl Into<String>, value: impl Into<Value>) {
		self.sources
			.entry(kind)
			.or_default()
			.insert(name.into(), value.into());
	}

	pub fn get(&self, kind: SourceKind, name: &str) -> Option<&Value> {
		self.sources.get(&kind).and_then(|values| values.get(name))
	}
}

/// Resolve `fields` against `candidates` and an optional parent mapping.
///
/// Per field, candidates are folded from the lowest to the highest priority
/// source with [`ConfigValue::compare`]. YAML mappings and nulls describe a
/// field rather than supply a value and are skipped. Environment strings are
/// coerced to the field's datatype first, falling back to reading them as
/// JSON (so `[1, 2]` can fill a list field). When no source supplies a value the
/// field default stands in as a class-body value. The winner is then folded
/// against the parent's winner, the parent acting as the existing value.
///
/// Parent entries for fields not listed in `fields` are inherited unchanged.
/// A field without any value is left out unless it is required, which is an
/// error.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use std::sync::Arc;
/// use stratum_conf::config::field::ConfigField;
/// use stratum_conf::config::resolve::{Candidates, resolve};
/// use stratum_conf::config::source::{SourceKind, SourcePriority};
///
/// let fields = vec![Arc::new(ConfigField::builder("PORT").default_value(80).build().unwrap())];
/// let mut candidates = Candidates::new("Server");
/// candidates.insert(SourceKind::Environ, "PORT", "8080");
///
/// let resolved = resolve(&fields, &candidates, None, &SourcePriority::default()).unwrap();
/// assert_eq!(resolved["PORT"].value(), Some(&json!(8080)));
/// assert_eq!(resolved["PORT"].source(), SourceKind::Environ);
/// ```
pub fn resolve(
	fields: &[Arc<ConfigField>],
	candidates: &Candidates,
	parent: Option<&ResolvedMap>,
	order: &SourcePriority,
) -> ResolveResult<ResolvedMap> {
	let mut resolved = parent.cloned().unwrap_or_default();

	for field in fields {
		let winner = resolve_field(field, candidates, order)?;
		let merged = match (resolved.get(field.name()), winner) {
			(Some(inherited), Some(winner)) => fold(inherited.clone(), winner, order)?,
			(Some(inherited), None) => inherited.clone(),
			(None, Some(winner)) => winner,
			(None, None) if field.required() => {
				return Err(ValueError::RequiredValue {
					field: field.name().to_string(),
				}
				.into());
			}
			(None, None) => {
				tracing::trace!(field = field.name(), "no value resolved");
				continue;
			}
		};
		resolved.insert(field.name().to_string(), merged);
	}

	Ok(resolved)
}

fn resolve_field(
	field: &Arc<ConfigField>,
	candidates: &Candidates,
	order: &SourcePriority,
) -> ResolveResult<Option<ConfigValue>> {
	let mut winner: Option<ConfigValue> = None;

	for kind in order.iter_lowest_first() {
		let Some(raw) = candidates.get(kind, field.name()) else {
			continue;
		};
		let raw = match (kind, raw) {
			(SourceKind::Yaml, Value::Object(_) | Value::Null) => continue,
			(SourceKind::Environ, Value::String(text)) => {
				field
					.cast_value(raw, None)
					.or_else(|| {
						serde_json::from_str::<Value>(text)
							.ok()
							.and_then(|parsed| field.cast_value(&parsed, None))
					})
					.ok_or_else(|| ValueError::BadValue {
						field: field.name().to_string(),
						expected: field.datatype().clone(),
						value: raw.clone(),
						actual: type_name(raw),
					})?
			}
			_ => raw.clone(),
		};

		tracing::trace!(field = field.name(), source = %kind, "candidate found");
		let mut candidate =
			ConfigValue::new(Arc::clone(field), kind).with_source_name(candidates.source_name());
		candidate.set_value(raw)?;

		winner = Some(match winner {
			Some(current) => fold(current, candidate, order)?,
			None => candidate,
		});
	}

	if winner.is_none()
		&& let Some(default) = field.default()
		&& !default.is_null()
	{
		winner = Some(
			ConfigValue::with_value(Arc::clone(field), default.clone(), SourceKind::Class)
				.with_source_name(candidates.source_name()),
		);
	}

	Ok(winner)
}

fn fold(
	current: ConfigValue,
	candidate: ConfigValue,
	order: &SourcePriority,
) -> Result<ConfigValue, CompareError> {
	let kept = std::ptr::eq(current.compare(&candidate, order)?, &current);
	if kept {
		if candidate.value_set() {
			tracing::debug!(
				field = current.field().name(),
				kept = %current.source(),
				ignored = %candidate.source(),
				locked = current.is_locked(),
				"candidate ignored"
			);
		}
		Ok(current)
	} else {
		tracing::debug!(
			field = current.field().name(),
			replaced = %current.source(),
			by = %candidate.source(),
			"value displaced"
		);
		Ok(candidate)
	}
}

const LOCK_ATTRS: &str = "lock_attrs";
const LOCK_VALUES: &str = "lock_values";
const CLASS_BUILT: &str = "class_built";
const INITIALIZED: &str = "initialized";
const SUBCLASSED: &str = "subclassed";
const TOP_PARENT: &str = "top_parent";

fn metadata_fields() -> IndexMap<String, Value> {
	[
		(LOCK_ATTRS, true),
		(LOCK_VALUES, true),
		(CLASS_BUILT, false),
		(INITIALIZED, false),
		(SUBCLASSED, false),
		(TOP_PARENT, false),
	]
	.into_iter()
	.map(|(name, default)| (name.to_string(), Value::Bool(default)))
	.collect()
}

/// A resolved configuration.
///
/// Values are exposed under their external keys (`alt_name` if present,
/// else the declared name, lower-cased). Configurations derived from one
/// another share a metadata tree whose root is the top-most parent.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
	name: String,
	lineage: Vec<String>,
	values: ResolvedMap,
	order: SourcePriority,
	metadata: Arc<RwLock<NestedRecord>>,
}

impl ResolvedConfig {
	/// Wrap resolved values and register this configuration in the metadata
	/// tree (below `parent`'s record when given).
	pub fn build(
		name: impl Into<String>,
		parent: Option<&ResolvedConfig>,
		values: ResolvedMap,
		order: SourcePriority,
		lock_attrs: bool,
		lock_values: bool,
	) -> ResolveResult<Self> {
		let name = name.into();
		let (lineage, metadata) = match parent {
			Some(parent) => {
				let mut lineage = parent.lineage.clone();
				lineage.push(name.clone());
				(lineage, Arc::clone(&parent.metadata))
			}
			None => (
				vec![name.clone()],
				Arc::new(RwLock::new(NestedRecord::new(name.clone(), metadata_fields()))),
			),
		};

		{
			let mut root = metadata.write();
			let record = match lineage.split_last() {
				Some((_, [])) | None => {
					root.set(TOP_PARENT, Value::Bool(true))?;
					&mut *root
				}
				Some((own, [_, ancestors @ ..])) => {
					let parent_record = if ancestors.is_empty() {
						&mut *root
					} else {
						let path: Vec<&str> = ancestors.iter().map(String::as_str).collect();
						root.get_child_mut(&path, true)?
					};
					parent_record.set(SUBCLASSED, Value::Bool(true))?;
					parent_record.add_child(own, true)?
				}
			};
			record.set(LOCK_ATTRS, Value::Bool(lock_attrs))?;
			record.set(LOCK_VALUES, Value::Bool(lock_values))?;
			record.set(CLASS_BUILT, Value::Bool(true))?;
		}

		tracing::debug!(config = %name, fields = values.len(), "configuration resolved");
		Ok(Self {
			name,
			lineage,
			values,
			order,
			metadata,
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Names from the top-most parent down to this configuration.
	pub fn lineage(&self) -> &[String] {
		&self.lineage
	}

	/// Resolved value under its external key. The lookup is case-insensitive.
	pub fn get(&self, key: &str) -> Option<&Value> {
		let key = key.to_lowercase();
		self.values
			.values()
			.find(|value| value.field().external_name() == key)
			.and_then(ConfigValue::value)
	}

	/// Winning holder for a declared field name (case-insensitive).
	pub fn value_of(&self, field_name: &str) -> Option<&ConfigValue> {
		self.values.get(field_name).or_else(|| {
			self.values
				.iter()
				.find(|(name, _)| name.eq_ignore_ascii_case(field_name))
				.map(|(_, value)| value)
		})
	}

	pub fn values(&self) -> &ResolvedMap {
		&self.values
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// External key to resolved value.
	pub fn as_map(&self) -> IndexMap<String, Value> {
		self.values
			.values()
			.filter_map(|holder| {
				holder
					.value()
					.map(|value| (holder.field().external_name(), value.clone()))
			})
			.collect()
	}

	pub fn to_json(&self) -> Value {
		Value::Object(self.as_map().into_iter().collect::<Map<_, _>>())
	}

	/// Derive a configuration with instance-level overrides applied.
	///
	/// Overrides go through the usual precedence rule, so a locked value
	/// survives them. Unknown keys are rejected.
	pub fn instance<I, K>(&self, overrides: I) -> ResolveResult<ResolvedConfig>
	where
		I: IntoIterator<Item = (K, Value)>,
		K: AsRef<str>,
	{
		let mut derived = self.clone();
		for (key, value) in overrides {
			let name = derived.field_name(key.as_ref())?;
			let current = derived.values[&name].clone();

			let mut candidate = ConfigValue::new(Arc::clone(current.field()), SourceKind::Instance)
				.with_source_name(&self.name);
			candidate.set_value(value)?;

			let merged = fold(current, candidate, &self.order)?;
			derived.values.insert(name, merged);
		}
		Ok(derived)
	}

	/// Assign a value after resolution.
	///
	/// Unknown keys declare a new field unless attributes are locked. Known
	/// keys fail once values are locked and the configuration is initialized,
	/// and always fail for a locked field whose value is set.
	pub fn set(&mut self, key: &str, value: impl Into<Value>) -> ResolveResult<()> {
		let value = value.into();
		match self.field_name(key) {
			Ok(name) => {
				if self.values_locked() && self.is_initialized() {
					return Err(ResolveError::ValuesLocked {
						config: self.name.clone(),
						key: key.to_string(),
					});
				}
				if let Some(holder) = self.values.get_mut(&name) {
					holder.set_value(value)?;
				}
				Ok(())
			}
			Err(_) if self.attrs_locked() => Err(ResolveError::AttrsLocked {
				config: self.name.clone(),
				key: key.to_string(),
			}),
			Err(_) => {
				let name = key.to_uppercase();
				let datatype = FieldKind::of(&value).map(DataType::from).unwrap_or_default();
				let field = Arc::new(ConfigField::builder(&name).datatype(datatype).build()?);
				let mut holder =
					ConfigValue::new(field, SourceKind::Instance).with_source_name(&self.name);
				holder.set_value(value)?;
				tracing::debug!(config = %self.name, field = %name, "field added after resolution");
				self.values.insert(name, holder);
				Ok(())
			}
		}
	}

	/// Mark this configuration as initialized.
	pub fn initialize(&self) -> ResolveResult<()> {
		self.with_record(|record| record.set(INITIALIZED, Value::Bool(true)))
	}

	pub fn is_initialized(&self) -> bool {
		self.flag(INITIALIZED)
	}

	pub fn attrs_locked(&self) -> bool {
		self.flag(LOCK_ATTRS)
	}

	pub fn values_locked(&self) -> bool {
		self.flag(LOCK_VALUES)
	}

	pub fn is_subclassed(&self) -> bool {
		self.flag(SUBCLASSED)
	}

	/// Snapshot of this configuration's metadata record (children included).
	pub fn metadata(&self) -> ResolveResult<NestedRecord> {
		let root = self.metadata.read();
		match self.lineage.get(1..) {
			Some(path) if !path.is_empty() => {
				let path: Vec<&str> = path.iter().map(String::as_str).collect();
				Ok(root.get_child(&path)?.clone())
			}
			_ => Ok(root.clone()),
		}
	}

	/// The whole metadata tree, rooted at the top-most parent.
	pub fn metadata_tree(&self) -> Value {
		self.metadata.read().as_dict()
	}

	fn flag(&self, name: &str) -> bool {
		let root = self.metadata.read();
		let record = match self.lineage.get(1..) {
			Some(path) if !path.is_empty() => {
				let path: Vec<&str> = path.iter().map(String::as_str).collect();
				root.get_child(&path).ok()
			}
			_ => Some(&*root),
		};
		record.and_then(|record| record.flag(name)).unwrap_or(false)
	}

	fn with_record<R>(
		&self,
		f: impl FnOnce(&mut NestedRecord) -> Result<R, RecordError>,
	) -> ResolveResult<R> {
		let mut root = self.metadata.write();
		let record = match self.lineage.get(1..) {
			Some(path) if !path.is_empty() => {
				let path: Vec<&str> = path.iter().map(String::as_str).collect();
				root.get_child_mut(&path, false)?
			}
			_ => &mut *root,
		};
		Ok(f(record)?)
	}

	/// Declared field name for `key`, matched against declared names and
	/// external keys.
	fn field_name(&self, key: &str) -> ResolveResult<String> {
		let lowered = key.to_lowercase();
		self.values
			.iter()
			.find(|(name, holder)| {
				name.eq_ignore_ascii_case(key) || holder.field().external_name() == lowered
			})
			.map(|(name, _)| name.clone())
			.ok_or_else(|| ResolveError::UnknownField {
				config: self.name.clone(),
				key: key.to_string(),
			})
	}
}
