//! Configuration field declarations
//!
//! A [`ConfigField`] is the declaration of one configuration variable: its
//! name, the kinds of value it accepts, an optional default and the
//! `required` / `locked` flags. Fields are validated when built and again on
//! every mutation, so a field that exists is always well formed.

use super::kind::{DataType, FieldKind, UnknownDatatype, type_name};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// Minimum length of a field name.
pub const MIN_NAME_LENGTH: usize = 3;

/// Errors raised while declaring or mutating a field.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
	#[error("Config field - `{attr}` must be at least 3 characters in length. Got '{value}'.")]
	NameLength { attr: &'static str, value: String },

	#[error("Config field - `{attr}` cannot begin with a digit. Got '{value}'.")]
	NameStartsWithDigit { attr: &'static str, value: String },

	#[error("Config field - `{attr}` cannot contain illegal characters: {chars}. Got '{value}'.")]
	NameIllegalChars {
		attr: &'static str,
		chars: String,
		value: String,
	},

	#[error(
		"Config field - `{field}` attribute `{attr}` must be of type `{expected}`. Got {value} ({actual}) instead."
	)]
	TypeMismatch {
		field: String,
		attr: String,
		expected: &'static str,
		value: Value,
		actual: &'static str,
	},

	#[error(
		"Config field - `{field}` is of type `{datatype}` but has an inappropriate default value of `{value}` ({actual})."
	)]
	BadDefault {
		field: String,
		datatype: DataType,
		value: Value,
		actual: &'static str,
	},

	#[error("Config field - `{field}` has an invalid datatype: {source}")]
	InvalidDatatype {
		field: String,
		#[source]
		source: UnknownDatatype,
	},

	#[error("Config field - no attribute named '{0}'.")]
	UnknownAttribute(String),
}

/// Check a variable name against the naming rule.
///
/// Names need at least three characters, must not start with a digit and may
/// only contain `A-Z`, `0-9` and `_`. The checks run in that order.
pub fn validate_name(attr: &'static str, name: &str) -> Result<(), FieldError> {
	if name.chars().count() < MIN_NAME_LENGTH {
		return Err(FieldError::NameLength {
			attr,
			value: name.to_string(),
		});
	}

	if name.starts_with(|c: char| c.is_ascii_digit()) {
		return Err(FieldError::NameStartsWithDigit {
			attr,
			value: name.to_string(),
		});
	}

	let illegal: BTreeSet<char> = name
		.chars()
		.filter(|c| !(c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '_'))
		.collect();
	if !illegal.is_empty() {
		let chars: Vec<String> = illegal.iter().map(char::to_string).collect();
		return Err(FieldError::NameIllegalChars {
			attr,
			chars: chars.join(", "),
			value: name.to_string(),
		});
	}

	Ok(())
}

pub fn is_valid_var_name(name: &str) -> bool {
	validate_name("name", name).is_ok()
}

/// Declaration of a configuration variable.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigField {
	name: String,
	alt_name: Option<String>,
	datatype: DataType,
	required: bool,
	default: Option<Value>,
	locked: bool,
	metadata: IndexMap<String, Value>,
}

impl ConfigField {
	/// Declare a field with no default. Its datatype is `str`.
	///
	/// # Examples
	///
	/// ```
	/// use stratum_conf::config::field::ConfigField;
	///
	/// let field = ConfigField::new("DATABASE_URL").unwrap();
	/// assert_eq!(field.external_name(), "database_url");
	/// assert!(ConfigField::new("db").is_err());
	/// ```
	pub fn new(name: impl Into<String>) -> Result<Self, FieldError> {
		Self::builder(name).build()
	}

	pub fn builder(name: impl Into<String>) -> ConfigFieldBuilder {
		ConfigFieldBuilder::new(name)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn alt_name(&self) -> Option<&str> {
		self.alt_name.as_deref()
	}

	pub fn datatype(&self) -> &DataType {
		&self.datatype
	}

	pub fn required(&self) -> bool {
		self.required
	}

	pub fn default(&self) -> Option<&Value> {
		self.default.as_ref()
	}

	pub fn locked(&self) -> bool {
		self.locked
	}

	pub fn metadata(&self) -> &IndexMap<String, Value> {
		&self.metadata
	}

	/// Key under which resolved values are exposed: the alternate name if
	/// present, else the declared name, lower-cased.
	pub fn external_name(&self) -> String {
		self.alt_name.as_deref().unwrap_or(&self.name).to_lowercase()
	}

	/// Whether `value` has one of the kinds this field accepts.
	pub fn validate_value(&self, value: &Value) -> bool {
		self.datatype.matches(value)
	}

	/// Coerce `value` into `as_type`, or into this field's datatype when no
	/// type is given. `None` signals that no accepted kind could be built.
	pub fn cast_value(&self, value: &Value, as_type: Option<&DataType>) -> Option<Value> {
		as_type.unwrap_or(&self.datatype).cast(value)
	}

	/// Re-run the declaration checks.
	pub fn validate(&self) -> Result<(), FieldError> {
		validate_name("name", &self.name)?;
		if let Some(alt_name) = &self.alt_name {
			validate_name("alt_name", alt_name)?;
		}
		if let Some(default) = &self.default
			&& !self.datatype.matches(default)
		{
			return Err(FieldError::BadDefault {
				field: self.name.clone(),
				datatype: self.datatype.clone(),
				value: default.clone(),
				actual: type_name(default),
			});
		}
		Ok(())
	}

	pub fn is_valid(&self) -> bool {
		self.validate().is_ok()
	}

	/// Update one attribute by name and re-validate the whole field. On
	/// failure the field is left unchanged.
	///
	/// `datatype` accepts the same shorthand as declarations (`"int"`,
	/// `["int", "bool"]`).
	///
	/// # Examples
	///
	/// ```
	/// use serde_json::json;
	/// use stratum_conf::config::field::ConfigField;
	///
	/// let mut field = ConfigField::new("PORT").unwrap();
	/// field.set("datatype", json!("int")).unwrap();
	/// field.set("default", json!(8080)).unwrap();
	/// assert!(field.set("default", json!("8080")).is_err());
	/// assert!(field.set("colour", json!("red")).is_err());
	/// ```
	pub fn set(&mut self, attr: &str, value: Value) -> Result<(), FieldError> {
		let updated = self.to_builder().attr(attr, value)?.build()?;
		*self = updated;
		Ok(())
	}

	/// Copy of this field with `locked` cleared.
	pub fn unlocked(&self) -> Self {
		Self {
			locked: false,
			..self.clone()
		}
	}

	fn to_builder(&self) -> ConfigFieldBuilder {
		ConfigFieldBuilder {
			name: self.name.clone(),
			alt_name: self.alt_name.clone(),
			datatype: Some(self.datatype.clone()),
			required: self.required,
			default: self.default.clone(),
			locked: self.locked,
			metadata: self.metadata.clone(),
		}
	}
}

impl PartialEq for ConfigField {
	fn eq(&self, other: &Self) -> bool {
		self.name.eq_ignore_ascii_case(&other.name)
	}
}

impl Eq for ConfigField {}

impl Hash for ConfigField {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.name.to_ascii_lowercase().hash(state);
	}
}

/// Builder for [`ConfigField`]. Validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ConfigFieldBuilder {
	name: String,
	alt_name: Option<String>,
	datatype: Option<DataType>,
	required: bool,
	default: Option<Value>,
	locked: bool,
	metadata: IndexMap<String, Value>,
}

impl ConfigFieldBuilder {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			alt_name: None,
			datatype: None,
			required: false,
			default: None,
			locked: false,
			metadata: IndexMap::new(),
		}
	}

	pub fn datatype(mut self, datatype: impl Into<DataType>) -> Self {
		self.datatype = Some(datatype.into());
		self
	}

	pub fn alt_name(mut self, alt_name: impl Into<String>) -> Self {
		self.alt_name = Some(alt_name.into());
		self
	}

	pub fn required(mut self, required: bool) -> Self {
		self.required = required;
		self
	}

	pub fn default_value(mut self, default: impl Into<Value>) -> Self {
		self.default = Some(default.into());
		self
	}

	pub fn locked(mut self, locked: bool) -> Self {
		self.locked = locked;
		self
	}

	pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.metadata.insert(key.into(), value.into());
		self
	}

	/// Set an attribute from a raw value, checking its shape.
	pub fn attr(mut self, attr: &str, value: Value) -> Result<Self, FieldError> {
		match attr {
			"name" => self.name = self.expect_str(attr, value)?,
			"alt_name" => {
				self.alt_name = match value {
					Value::Null => None,
					other => {
						let alt_name = self.expect_str(attr, other)?;
						(!alt_name.is_empty()).then_some(alt_name)
					}
				}
			}
			"datatype" => {
				let datatype =
					DataType::parse_spec(&value).map_err(|source| FieldError::InvalidDatatype {
						field: self.name.clone(),
						source,
					})?;
				self.datatype = Some(datatype);
			}
			"required" => self.required = self.expect_bool(attr, value)?,
			"default" => self.default = (!value.is_null()).then_some(value),
			"locked" => self.locked = self.expect_bool(attr, value)?,
			"metadata" => match value {
				Value::Object(map) => self.metadata = map.into_iter().collect(),
				other => return Err(self.mismatch(attr, "mapping", other)),
			},
			_ => return Err(FieldError::UnknownAttribute(attr.to_string())),
		}
		Ok(self)
	}

	/// Validate and produce the field.
	///
	/// Without an explicit datatype, the datatype is inferred from the
	/// default, falling back to `str`.
	pub fn build(self) -> Result<ConfigField, FieldError> {
		let datatype = match (self.datatype, &self.default) {
			(Some(datatype), _) => datatype,
			(None, Some(default)) => match FieldKind::of(default) {
				Some(kind) => DataType::Single(kind),
				None => {
					return Err(FieldError::BadDefault {
						field: self.name,
						datatype: DataType::default(),
						value: default.clone(),
						actual: type_name(default),
					});
				}
			},
			(None, None) => DataType::default(),
		};

		let field = ConfigField {
			name: self.name,
			alt_name: self.alt_name,
			datatype,
			required: self.required,
			default: self.default,
			locked: self.locked,
			metadata: self.metadata,
		};
		field.validate()?;
		Ok(field)
	}

	fn expect_str(&self, attr: &str, value: Value) -> Result<String, FieldError> {
		match value {
			Value::String(s) => Ok(s),
			other => Err(self.mismatch(attr, "str", other)),
		}
	}

	fn expect_bool(&self, attr: &str, value: Value) -> Result<bool, FieldError> {
		match value {
			Value::Bool(b) => Ok(b),
			other => Err(self.mismatch(attr, "bool", other)),
		}
	}

	fn mismatch(&self, attr: &str, expected: &'static str, value: Value) -> FieldError {
		FieldError::TypeMismatch {
			field: self.name.clone(),
			attr: attr.to_string(),
			expected,
			actual: type_name(&value),
			value,
		}
	}
}
