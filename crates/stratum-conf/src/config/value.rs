//! Configuration values
//!
//! A [`ConfigValue`] binds a raw value to a [`ConfigField`] and records which
//! source supplied it. Values bound to the same field are ordered by source
//! priority, and [`ConfigValue::compare`] decides which of two candidates
//! survives a merge.
//!
//! A value is either *set* (explicitly assigned) or *unset* (reading back the
//! field default). Locking only applies to set values: once a value of a
//! locked field has been set it can neither be edited nor displaced.

use super::field::ConfigField;
use super::kind::{DataType, type_name};
use super::source::{SourceKind, SourcePriority};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// Errors raised when reading, writing or validating a value.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
	#[error("Config value - locked. Cannot edit field `{field}`.")]
	Locked { field: String },

	#[error("Config value - `{field}` must be of type(s) {expected}. Got {value} ({actual}) instead.")]
	BadValue {
		field: String,
		expected: DataType,
		value: Value,
		actual: &'static str,
	},

	#[error("Config value - `{field}` has no value and no default value was defined.")]
	Unresolved { field: String },

	#[error("Config value - field `{field}` value is required and no default value was defined.")]
	RequiredValue { field: String },
}

/// Raised when two values bound to different fields are compared.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Config value - cannot compare `{left}` with `{right}`: values belong to different fields.")]
pub struct CompareError {
	pub left: String,
	pub right: String,
}

/// A value bound to a field and tagged with its source.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue {
	field: Arc<ConfigField>,
	value: Option<Value>,
	source: SourceKind,
	source_name: String,
}

impl ConfigValue {
	/// Create an unset value.
	///
	/// # Examples
	///
	/// ```
	/// use serde_json::json;
	/// use std::sync::Arc;
	/// use stratum_conf::config::field::ConfigField;
	/// use stratum_conf::config::source::SourceKind;
	/// use stratum_conf::config::value::ConfigValue;
	///
	/// let field = Arc::new(ConfigField::builder("TEST").default_value(5).build().unwrap());
	/// let mut value = ConfigValue::new(field, SourceKind::Class);
	/// assert_eq!(value.value(), Some(&json!(5)));
	/// assert!(!value.value_set());
	///
	/// value.set_value(json!(1)).unwrap();
	/// assert!(value.value_set());
	/// ```
	pub fn new(field: Arc<ConfigField>, source: SourceKind) -> Self {
		Self {
			field,
			value: None,
			source,
			source_name: String::new(),
		}
	}

	/// Create a value that is already set. The value is not validated here;
	/// use [`validate`](Self::validate) or [`is_valid`](Self::is_valid).
	pub fn with_value(field: Arc<ConfigField>, value: impl Into<Value>, source: SourceKind) -> Self {
		Self {
			field,
			value: Some(value.into()),
			source,
			source_name: String::new(),
		}
	}

	pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
		self.source_name = source_name.into();
		self
	}

	pub fn field(&self) -> &Arc<ConfigField> {
		&self.field
	}

	pub fn source(&self) -> SourceKind {
		self.source
	}

	pub fn source_name(&self) -> &str {
		&self.source_name
	}

	/// The explicit value, else the field default, else `None`.
	pub fn value(&self) -> Option<&Value> {
		self.value.as_ref().or_else(|| self.field.default())
	}

	pub fn value_set(&self) -> bool {
		self.value.is_some()
	}

	pub fn is_locked(&self) -> bool {
		self.field.locked()
	}

	/// Assign an explicit value.
	///
	/// Fails with [`ValueError::Locked`] when the field is locked and a value
	/// is already set, and with [`ValueError::BadValue`] when `value` does not
	/// match the field's datatype. The holder is unchanged on failure.
	pub fn set_value(&mut self, value: impl Into<Value>) -> Result<(), ValueError> {
		if self.value_set() && self.is_locked() {
			return Err(ValueError::Locked {
				field: self.field.name().to_string(),
			});
		}

		let value = value.into();
		if !self.field.validate_value(&value) {
			return Err(self.bad_value(&value));
		}

		self.value = Some(value);
		Ok(())
	}

	/// Check the effective value against the field.
	pub fn validate(&self) -> Result<(), ValueError> {
		match self.value() {
			Some(value) if self.field.validate_value(value) => Ok(()),
			Some(value) => Err(self.bad_value(value)),
			None if self.field.required() => Err(ValueError::RequiredValue {
				field: self.field.name().to_string(),
			}),
			None => Err(ValueError::Unresolved {
				field: self.field.name().to_string(),
			}),
		}
	}

	pub fn is_valid(&self) -> bool {
		self.validate().is_ok()
	}

	/// Index of this value's source in `order`; lower means higher priority.
	pub fn source_priority(&self, order: &SourcePriority) -> usize {
		order.index_of(self.source)
	}

	/// [`source_priority`](Self::source_priority) against the default order.
	pub fn priority(&self) -> usize {
		self.source_priority(&SourcePriority::default())
	}

	/// Whether both values are bound to the same field.
	pub fn common(&self, other: &ConfigValue) -> bool {
		*self.field == *other.field
	}

	/// Order two values of the same field by source priority. The value with
	/// the higher-priority source is `Greater`; use [`Ordering::is_gt`] and
	/// friends for the individual relations.
	pub fn try_cmp(&self, other: &ConfigValue, order: &SourcePriority) -> Result<Ordering, CompareError> {
		self.ensure_common(other)?;
		Ok(other
			.source_priority(order)
			.cmp(&self.source_priority(order)))
	}

	/// Pick the survivor of `self` (the existing value) and `other` (the
	/// incoming candidate).
	///
	/// `self` is kept when `other` is unset, when `self` is set and locked, or
	/// when `self` is set and its source strictly outranks `other`'s.
	/// Otherwise `other` wins.
	///
	/// # Examples
	///
	/// ```
	/// use serde_json::json;
	/// use std::sync::Arc;
	/// use stratum_conf::config::field::ConfigField;
	/// use stratum_conf::config::source::{SourceKind, SourcePriority};
	/// use stratum_conf::config::value::ConfigValue;
	///
	/// let field = Arc::new(ConfigField::new("TEST").unwrap());
	/// let yaml = ConfigValue::with_value(field.clone(), "from yaml", SourceKind::Yaml);
	/// let class = ConfigValue::with_value(field, "from class", SourceKind::Class);
	///
	/// let order = SourcePriority::default();
	/// let winner = yaml.compare(&class, &order).unwrap();
	/// assert_eq!(winner.value(), Some(&json!("from class")));
	/// ```
	pub fn compare<'a>(
		&'a self,
		other: &'a ConfigValue,
		order: &SourcePriority,
	) -> Result<&'a ConfigValue, CompareError> {
		self.ensure_common(other)?;
		if self.keeps_over(other, order) {
			Ok(self)
		} else {
			Ok(other)
		}
	}

	/// Owned variant of [`compare`](Self::compare).
	pub fn merge(self, other: ConfigValue, order: &SourcePriority) -> Result<ConfigValue, CompareError> {
		self.ensure_common(&other)?;
		if self.keeps_over(&other, order) {
			Ok(self)
		} else {
			Ok(other)
		}
	}

	/// Duplicate this value. With `unlocked`, the copy is bound to an
	/// unlocked clone of the field; the original field is untouched.
	pub fn copy(&self, unlocked: bool) -> ConfigValue {
		let field = if unlocked && self.field.locked() {
			Arc::new(self.field.unlocked())
		} else {
			Arc::clone(&self.field)
		};
		ConfigValue {
			field,
			value: self.value.clone(),
			source: self.source,
			source_name: self.source_name.clone(),
		}
	}

	fn keeps_over(&self, other: &ConfigValue, order: &SourcePriority) -> bool {
		!other.value_set()
			|| (self.value_set()
				&& (self.is_locked()
					|| self.source_priority(order) < other.source_priority(order)))
	}

	fn ensure_common(&self, other: &ConfigValue) -> Result<(), CompareError> {
		if self.common(other) {
			Ok(())
		} else {
			Err(CompareError {
				left: self.field.name().to_string(),
				right: other.field.name().to_string(),
			})
		}
	}

	fn bad_value(&self, value: &Value) -> ValueError {
		ValueError::BadValue {
			field: self.field.name().to_string(),
			expected: self.field.datatype().clone(),
			value: value.clone(),
			actual: type_name(value),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::kind::FieldKind;
	use proptest::prelude::*;
	use rstest::*;
	use serde_json::json;

	#[fixture]
	fn order() -> SourcePriority {
		SourcePriority::default()
	}

	fn field(name: &str) -> Arc<ConfigField> {
		Arc::new(ConfigField::new(name).unwrap())
	}

	fn int_field(default: Option<i64>, locked: bool) -> Arc<ConfigField> {
		let mut builder = ConfigField::builder("TEST")
			.datatype(FieldKind::Int)
			.locked(locked);
		if let Some(default) = default {
			builder = builder.default_value(default);
		}
		Arc::new(builder.build().unwrap())
	}

	#[rstest]
	fn test_unset_without_default_is_invalid() {
		// Arrange
		let value = ConfigValue::new(field("TEST"), SourceKind::Environ);

		// Assert
		assert!(!value.value_set());
		assert!(!value.is_valid());
		assert_eq!(value.value(), None);
		assert_eq!(
			value.validate().unwrap_err(),
			ValueError::Unresolved {
				field: "TEST".to_string()
			}
		);
	}

	#[rstest]
	fn test_assignment_marks_value_set() {
		// Arrange
		let mut value = ConfigValue::new(int_field(None, false), SourceKind::Environ);

		// Act
		value.set_value(1).unwrap();

		// Assert
		assert!(value.value_set());
		assert!(value.is_valid());
		assert_eq!(value.value(), Some(&json!(1)));
	}

	#[rstest]
	fn test_required_without_value() {
		let field = Arc::new(ConfigField::builder("TEST").required(true).build().unwrap());
		let value = ConfigValue::new(field, SourceKind::Class);

		assert_eq!(
			value.validate().unwrap_err(),
			ValueError::RequiredValue {
				field: "TEST".to_string()
			}
		);
	}

	#[rstest]
	fn test_default_reads_back_until_set() {
		// Arrange
		let mut value = ConfigValue::new(int_field(Some(5), false), SourceKind::Class);

		// Assert
		assert!(value.is_valid());
		assert!(!value.value_set());
		assert_eq!(value.value(), Some(&json!(5)));

		value.set_value(1).unwrap();
		assert_eq!(value.value(), Some(&json!(1)));
	}

	#[rstest]
	fn test_set_rejects_wrong_kind() {
		// Arrange
		let mut value = ConfigValue::with_value(int_field(None, false), 3, SourceKind::Yaml);

		// Act
		let result = value.set_value("three");

		// Assert
		assert!(matches!(
			result,
			Err(ValueError::BadValue { actual: "str", .. })
		));
		assert_eq!(value.value(), Some(&json!(3)));
	}

	#[rstest]
	fn test_locked_value_rejects_edit_once_set() {
		// Arrange
		let mut preset = ConfigValue::with_value(int_field(None, true), 1, SourceKind::Class);
		let mut unset = ConfigValue::new(int_field(None, true), SourceKind::Class);

		// Act & Assert
		assert_eq!(
			preset.set_value(2).unwrap_err(),
			ValueError::Locked {
				field: "TEST".to_string()
			}
		);
		unset.set_value(2).unwrap();
		assert!(unset.set_value(3).is_err());
		assert_eq!(unset.value(), Some(&json!(2)));
	}

	#[rstest]
	fn test_compare_keeps_existing_when_candidate_unset(order: SourcePriority) {
		// Arrange
		let field = int_field(Some(5), false);
		let mut existing = ConfigValue::new(field.clone(), SourceKind::Environ);
		existing.set_value(1).unwrap();
		let mut candidate = ConfigValue::new(field, SourceKind::Instance);

		// Act & Assert
		assert!(existing.common(&candidate));
		assert!(std::ptr::eq(
			existing.compare(&candidate, &order).unwrap(),
			&existing
		));

		candidate.set_value(4).unwrap();
		assert!(std::ptr::eq(
			existing.compare(&candidate, &order).unwrap(),
			&candidate
		));
	}

	#[rstest]
	#[case(SourceKind::Class, SourceKind::Yaml, "existing")]
	#[case(SourceKind::Yaml, SourceKind::Class, "candidate")]
	#[case(SourceKind::Yaml, SourceKind::Yaml, "candidate")]
	#[case(SourceKind::Instance, SourceKind::Environ, "existing")]
	#[case(SourceKind::Environ, SourceKind::Instance, "candidate")]
	fn test_compare_by_priority(
		order: SourcePriority,
		#[case] existing_source: SourceKind,
		#[case] candidate_source: SourceKind,
		#[case] expected: &str,
	) {
		// Arrange
		let field = field("TEST");
		let existing = ConfigValue::with_value(field.clone(), "existing", existing_source);
		let candidate = ConfigValue::with_value(field, "candidate", candidate_source);

		// Act
		let winner = existing.compare(&candidate, &order).unwrap();

		// Assert
		assert_eq!(winner.value(), Some(&json!(expected)));
	}

	#[rstest]
	fn test_compare_locked_existing_always_wins(order: SourcePriority) {
		let field = int_field(None, true);
		let existing = ConfigValue::with_value(field.clone(), 1, SourceKind::Environ);
		let candidate = ConfigValue::with_value(field, 2, SourceKind::Instance);

		let winner = existing.compare(&candidate, &order).unwrap();

		assert_eq!(winner.value(), Some(&json!(1)));
	}

	#[rstest]
	fn test_compare_locked_but_unset_yields(order: SourcePriority) {
		let field = int_field(Some(7), true);
		let existing = ConfigValue::new(field.clone(), SourceKind::Instance);
		let candidate = ConfigValue::with_value(field, 2, SourceKind::Environ);

		let winner = existing.compare(&candidate, &order).unwrap();

		assert_eq!(winner.value(), Some(&json!(2)));
	}

	#[rstest]
	fn test_compare_different_fields_fails(order: SourcePriority) {
		let a = ConfigValue::with_value(field("FIRST"), "a", SourceKind::Class);
		let b = ConfigValue::with_value(field("SECOND"), "b", SourceKind::Class);

		assert_eq!(
			a.compare(&b, &order).unwrap_err(),
			CompareError {
				left: "FIRST".to_string(),
				right: "SECOND".to_string()
			}
		);
		assert!(a.try_cmp(&b, &order).is_err());
		assert!(a.clone().merge(b, &order).is_err());
	}

	#[rstest]
	fn test_ordering_helpers(order: SourcePriority) {
		let field = field("TEST");
		let class = ConfigValue::with_value(field.clone(), "a", SourceKind::Class);
		let environ = ConfigValue::with_value(field.clone(), "b", SourceKind::Environ);
		let other_class = ConfigValue::new(field, SourceKind::Class);

		assert!(class.try_cmp(&environ, &order).unwrap().is_gt());
		assert!(environ.try_cmp(&class, &order).unwrap().is_lt());
		assert!(class.try_cmp(&other_class, &order).unwrap().is_eq());
		assert!(class.try_cmp(&other_class, &order).unwrap().is_ge());
		assert!(class.try_cmp(&other_class, &order).unwrap().is_le());
		assert_eq!(class.priority(), 1);
	}

	#[rstest]
	fn test_custom_priority_changes_winner() {
		// Arrange
		let order = SourcePriority::new(vec![
			SourceKind::Environ,
			SourceKind::Instance,
			SourceKind::Class,
			SourceKind::Yaml,
		])
		.unwrap();
		let field = field("TEST");
		let environ = ConfigValue::with_value(field.clone(), "env", SourceKind::Environ);
		let class = ConfigValue::with_value(field, "class", SourceKind::Class);

		// Act
		let winner = environ.compare(&class, &order).unwrap();

		// Assert
		assert_eq!(winner.source(), SourceKind::Environ);
	}

	#[rstest]
	fn test_copy_unlocked_leaves_original_field_locked() {
		// Arrange
		let original = ConfigValue::with_value(int_field(None, true), 1, SourceKind::Class)
			.with_source_name("BaseConfig");

		// Act
		let mut copy = original.copy(true);

		// Assert
		assert!(original.is_locked());
		assert!(!copy.is_locked());
		assert_eq!(copy.source_name(), "BaseConfig");
		copy.set_value(2).unwrap();
		assert_eq!(original.value(), Some(&json!(1)));

		let shared = original.copy(false);
		assert!(Arc::ptr_eq(shared.field(), original.field()));
	}

	fn source_strategy() -> impl Strategy<Value = SourceKind> {
		prop::sample::select(SourceKind::ALL.to_vec())
	}

	proptest! {
		#[test]
		fn prop_compare_precedence(
			existing_source in source_strategy(),
			candidate_source in source_strategy(),
			existing_set in any::<bool>(),
			candidate_set in any::<bool>(),
			locked in any::<bool>(),
		) {
			let order = SourcePriority::default();
			let field = int_field(None, locked);
			let existing = if existing_set {
				ConfigValue::with_value(field.clone(), 1, existing_source)
			} else {
				ConfigValue::new(field.clone(), existing_source)
			};
			let candidate = if candidate_set {
				ConfigValue::with_value(field, 2, candidate_source)
			} else {
				ConfigValue::new(field, candidate_source)
			};

			let winner = existing.compare(&candidate, &order).unwrap();
			let kept_existing = std::ptr::eq(winner, &existing);

			let expected_existing = !candidate_set
				|| (existing_set
					&& (locked
						|| order.index_of(existing_source) < order.index_of(candidate_source)));
			prop_assert_eq!(kept_existing, expected_existing);

			// Comparing twice gives the same answer.
			let again = existing.compare(&candidate, &order).unwrap();
			prop_assert!(std::ptr::eq(again, winner));
		}
	}
}
