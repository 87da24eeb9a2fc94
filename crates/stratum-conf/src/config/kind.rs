//! Value kinds accepted by configuration fields
//!
//! Configuration values are carried as [`serde_json::Value`]. A field declares
//! which kinds of value it accepts through a [`DataType`]: one primitive
//! [`FieldKind`], or an allow-list of [`KindSpec`]s which may include
//! "list of T" entries.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Error returned when a datatype specification cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported datatype specification '{0}' (expected int, str, bool, list[..] or a non-empty list of those)")]
pub struct UnknownDatatype(pub String);

/// Primitive kinds a configuration value may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
	Int,
	Str,
	Bool,
}

impl FieldKind {
	pub const ALL: [FieldKind; 3] = [FieldKind::Int, FieldKind::Str, FieldKind::Bool];

	/// Kind of a raw value, or `None` for floats, nulls, lists and mappings.
	pub fn of(value: &Value) -> Option<Self> {
		match value {
			Value::Number(n) if n.is_i64() => Some(Self::Int),
			Value::String(_) => Some(Self::Str),
			Value::Bool(_) => Some(Self::Bool),
			_ => None,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::Int => "int",
			Self::Str => "str",
			Self::Bool => "bool",
		}
	}

	pub fn matches(&self, value: &Value) -> bool {
		Self::of(value) == Some(*self)
	}

	/// Coerce `value` into this kind.
	pub fn cast(&self, value: &Value) -> Option<Value> {
		match (self, value) {
			(Self::Int, Value::Number(n)) => n
				.as_i64()
				.or_else(|| n.as_f64().and_then(integral_f64))
				.map(Value::from),
			(Self::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
			(Self::Int, Value::Bool(b)) => Some(Value::from(i64::from(*b))),
			(Self::Str, Value::String(_)) => Some(value.clone()),
			(Self::Str, Value::Number(n)) => Some(Value::String(n.to_string())),
			(Self::Str, Value::Bool(b)) => Some(Value::String(b.to_string())),
			(Self::Bool, Value::Bool(_)) => Some(value.clone()),
			(Self::Bool, Value::Number(n)) => n.as_i64().map(|i| Value::Bool(i != 0)),
			(Self::Bool, Value::String(s)) => parse_bool_literal(s).map(Value::Bool),
			_ => None,
		}
	}
}

/// Integral floats inside the `i64` range; `i64::MAX as f64` rounds up to 2^63.
fn integral_f64(f: f64) -> Option<i64> {
	(f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

impl fmt::Display for FieldKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for FieldKind {
	type Err = UnknownDatatype;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"int" | "integer" => Ok(Self::Int),
			"str" | "string" => Ok(Self::Str),
			"bool" | "boolean" => Ok(Self::Bool),
			_ => Err(UnknownDatatype(s.to_string())),
		}
	}
}

/// One entry of an allow-list: a primitive kind or a list whose elements
/// each match one of the given kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindSpec {
	Kind(FieldKind),
	ListOf(Vec<FieldKind>),
}

impl KindSpec {
	pub fn matches(&self, value: &Value) -> bool {
		match self {
			Self::Kind(kind) => kind.matches(value),
			Self::ListOf(kinds) => value.as_array().is_some_and(|items| {
				items
					.iter()
					.all(|item| kinds.iter().any(|kind| kind.matches(item)))
			}),
		}
	}

	pub fn cast(&self, value: &Value) -> Option<Value> {
		match self {
			Self::Kind(kind) => kind.cast(value),
			Self::ListOf(kinds) => {
				let items = value.as_array()?;
				items
					.iter()
					.map(|item| kinds.iter().find_map(|kind| kind.cast(item)))
					.collect::<Option<Vec<_>>>()
					.map(Value::Array)
			}
		}
	}
}

impl From<FieldKind> for KindSpec {
	fn from(kind: FieldKind) -> Self {
		Self::Kind(kind)
	}
}

impl fmt::Display for KindSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Kind(kind) => write!(f, "{}", kind),
			Self::ListOf(kinds) => {
				let names: Vec<_> = kinds.iter().map(FieldKind::name).collect();
				write!(f, "list[{}]", names.join(", "))
			}
		}
	}
}

impl FromStr for KindSpec {
	type Err = UnknownDatatype;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();
		let lower = trimmed.to_lowercase();

		if let Some(inner) = lower
			.strip_prefix("list[")
			.and_then(|rest| rest.strip_suffix(']'))
		{
			let kinds = inner
				.split(',')
				.map(str::parse::<FieldKind>)
				.collect::<Result<Vec<_>, _>>()
				.map_err(|_| UnknownDatatype(s.to_string()))?;
			return Ok(Self::ListOf(kinds));
		}

		trimmed.parse().map(Self::Kind)
	}
}

/// The kinds a field accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
	Single(FieldKind),
	OneOf(Vec<KindSpec>),
}

impl DataType {
	/// Build an allow-list. Fails on an empty list.
	pub fn one_of<I, S>(specs: I) -> Result<Self, UnknownDatatype>
	where
		I: IntoIterator<Item = S>,
		S: Into<KindSpec>,
	{
		let specs: Vec<KindSpec> = specs.into_iter().map(Into::into).collect();
		if specs.is_empty() {
			return Err(UnknownDatatype("[]".to_string()));
		}
		Ok(Self::OneOf(specs))
	}

	/// Interpret the shorthand forms accepted at declaration time: a kind
	/// name (`"int"`) or `list[..]` spec, or a non-empty array of kind names and `list[..]`
	/// specs.
	pub fn parse_spec(spec: &Value) -> Result<Self, UnknownDatatype> {
		match spec {
			Value::String(s) => s.parse::<DataType>(),
			Value::Array(items) => {
				let specs = items
					.iter()
					.map(|item| match item {
						Value::String(s) => s.parse::<KindSpec>(),
						other => Err(UnknownDatatype(other.to_string())),
					})
					.collect::<Result<Vec<_>, _>>()?;
				Self::one_of(specs)
			}
			other => Err(UnknownDatatype(other.to_string())),
		}
	}

	pub fn matches(&self, value: &Value) -> bool {
		match self {
			Self::Single(kind) => kind.matches(value),
			Self::OneOf(specs) => specs.iter().any(|spec| spec.matches(value)),
		}
	}

	/// Try each accepted kind in declaration order and return the first
	/// successful coercion.
	pub fn cast(&self, value: &Value) -> Option<Value> {
		match self {
			Self::Single(kind) => kind.cast(value),
			Self::OneOf(specs) => specs.iter().find_map(|spec| spec.cast(value)),
		}
	}
}

impl Default for DataType {
	fn default() -> Self {
		Self::Single(FieldKind::Str)
	}
}

impl From<FieldKind> for DataType {
	fn from(kind: FieldKind) -> Self {
		Self::Single(kind)
	}
}

impl FromStr for DataType {
	type Err = UnknownDatatype;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.parse::<KindSpec>()? {
			KindSpec::Kind(kind) => Ok(Self::Single(kind)),
			list => Ok(Self::OneOf(vec![list])),
		}
	}
}

impl fmt::Display for DataType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Single(kind) => write!(f, "{}", kind),
			Self::OneOf(specs) => {
				let names: Vec<_> = specs.iter().map(ToString::to_string).collect();
				write!(f, "[{}]", names.join(", "))
			}
		}
	}
}

impl Serialize for DataType {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

/// Name of a raw value's type, used in error messages.
pub fn type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "bool",
		Value::Number(n) if n.is_f64() => "float",
		Value::Number(_) => "int",
		Value::String(_) => "str",
		Value::Array(_) => "list",
		Value::Object(_) => "mapping",
	}
}

/// Parse the boolean vocabulary used by environment variables.
pub fn parse_bool_literal(s: &str) -> Option<bool> {
	match s.trim().to_lowercase().as_str() {
		"true" | "1" | "yes" | "on" => Some(true),
		"false" | "0" | "no" | "off" => Some(false),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case("int", FieldKind::Int)]
	#[case("INT", FieldKind::Int)]
	#[case("Str", FieldKind::Str)]
	#[case("string", FieldKind::Str)]
	#[case("bool", FieldKind::Bool)]
	fn test_kind_from_str(#[case] input: &str, #[case] expected: FieldKind) {
		assert_eq!(input.parse::<FieldKind>().unwrap(), expected);
	}

	#[rstest]
	fn test_kind_of_rejects_non_primitives() {
		assert_eq!(FieldKind::of(&json!(1.5)), None);
		assert_eq!(FieldKind::of(&json!(null)), None);
		assert_eq!(FieldKind::of(&json!([1])), None);
		assert_eq!(FieldKind::of(&json!({"a": 1})), None);
		assert_eq!(FieldKind::of(&json!(7)), Some(FieldKind::Int));
	}

	#[rstest]
	fn test_one_of_matches_any_listed_kind() {
		// Arrange
		let datatype = DataType::one_of([FieldKind::Int, FieldKind::Bool]).unwrap();

		// Assert
		assert!(datatype.matches(&json!(9)));
		assert!(datatype.matches(&json!(true)));
		assert!(!datatype.matches(&json!("True")));
		assert!(!datatype.matches(&json!([9, true])));
	}

	#[rstest]
	fn test_list_spec_matches_homogeneous_sequences() {
		// Arrange
		let datatype = DataType::parse_spec(&json!(["str", "list[int]"])).unwrap();

		// Assert
		assert!(datatype.matches(&json!("x")));
		assert!(datatype.matches(&json!([1, 2, 3])));
		assert!(datatype.matches(&json!([])));
		assert!(!datatype.matches(&json!([1, "2"])));
		assert!(!datatype.matches(&json!(3)));
	}

	#[rstest]
	#[case(json!("float"))]
	#[case(json!([]))]
	#[case(json!(["int", ["bool"]]))]
	#[case(json!(5))]
	fn test_parse_spec_rejects_invalid_forms(#[case] spec: Value) {
		assert!(DataType::parse_spec(&spec).is_err());
	}

	#[rstest]
	fn test_cast_follows_declaration_order() {
		// Arrange
		let int_first = DataType::one_of([FieldKind::Int, FieldKind::Str]).unwrap();
		let str_first = DataType::one_of([FieldKind::Str, FieldKind::Int]).unwrap();

		// Act & Assert
		assert_eq!(int_first.cast(&json!("42")), Some(json!(42)));
		assert_eq!(str_first.cast(&json!("42")), Some(json!("42")));
		assert_eq!(int_first.cast(&json!("abc")), Some(json!("abc")));
	}

	#[rstest]
	#[case(json!(1e20))]
	#[case(json!(18446744073709551615u64))]
	#[case(json!(-1e19))]
	fn test_int_cast_rejects_out_of_range_numbers(#[case] value: Value) {
		assert_eq!(FieldKind::Int.cast(&value), None);
		assert!(!FieldKind::Int.matches(&value));
	}

	#[rstest]
	fn test_int_cast_accepts_integral_floats() {
		assert_eq!(FieldKind::Int.cast(&json!(42.0)), Some(json!(42)));
		assert_eq!(FieldKind::Int.cast(&json!(-1e18)), Some(json!(-1_000_000_000_000_000_000i64)));
	}

	#[rstest]
	fn test_cast_failures_yield_none() {
		assert_eq!(FieldKind::Int.cast(&json!("4.2")), None);
		assert_eq!(FieldKind::Bool.cast(&json!("maybe")), None);
		assert_eq!(FieldKind::Str.cast(&json!(null)), None);
		assert_eq!(
			KindSpec::ListOf(vec![FieldKind::Int]).cast(&json!(["1", "x"])),
			None
		);
	}

	#[rstest]
	fn test_display_formats_specs() {
		let datatype: DataType = "list[int, bool]".parse().unwrap();
		assert_eq!(datatype.to_string(), "[list[int, bool]]");
		assert_eq!(DataType::default().to_string(), "str");
	}
}
