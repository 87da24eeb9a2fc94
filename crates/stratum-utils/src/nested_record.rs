//! Nested typed records
//!
//! A [`NestedRecord`] is a named set of fields whose names and value types are
//! fixed when the record is created. Records can carry child records that are
//! created with the same field set, forming a tree that mirrors a hierarchy
//! (for example, a configuration and the configurations derived from it).
//!
//! ```
//! use indexmap::IndexMap;
//! use serde_json::{Value, json};
//! use stratum_utils::nested_record::NestedRecord;
//!
//! let mut fields = IndexMap::new();
//! fields.insert("built".to_string(), Value::Bool(false));
//!
//! let mut root = NestedRecord::new("Main", fields);
//! root.set("built", Value::Bool(true)).unwrap();
//! root.get_child_mut(&["Child"], true).unwrap();
//!
//! assert_eq!(root.as_dict(), json!({"built": true, "Child": {"built": false}}));
//! ```

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Result type for record operations.
pub type RecordResult<T> = Result<T, RecordError>;

/// Errors raised by [`NestedRecord`] operations.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
	#[error("Nested record - child `{0}` already exists.")]
	DuplicateChild(String),

	#[error("Nested record - child `{0}` not found.")]
	ChildNotFound(String),

	#[error("Nested record - field `{0}` not found.")]
	FieldNotFound(String),

	#[error("Nested record - field `{field}` must be of type {expected}. Got {actual} instead.")]
	TypeMismatch {
		field: String,
		expected: &'static str,
		actual: &'static str,
	},

	#[error("Nested record - at least one child name must be provided.")]
	MissingChild,
}

/// A tree node holding a fixed set of typed fields and named children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedRecord {
	name: String,
	#[serde(skip)]
	defaults: IndexMap<String, Value>,
	values: IndexMap<String, Value>,
	children: IndexMap<String, NestedRecord>,
}

impl NestedRecord {
	/// Create a record whose field set and defaults are `fields`.
	pub fn new(name: impl Into<String>, fields: IndexMap<String, Value>) -> Self {
		Self {
			name: name.into(),
			values: fields.clone(),
			defaults: fields,
			children: IndexMap::new(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Names of the direct children, in insertion order.
	pub fn children(&self) -> Vec<&str> {
		self.children.keys().map(String::as_str).collect()
	}

	pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.values.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Current value of `field`.
	pub fn get(&self, field: &str) -> RecordResult<&Value> {
		self.values
			.get(field)
			.ok_or_else(|| RecordError::FieldNotFound(field.to_string()))
	}

	/// Convenience accessor for boolean flags; `None` when the field is
	/// missing or not a boolean.
	pub fn flag(&self, field: &str) -> Option<bool> {
		self.values.get(field).and_then(Value::as_bool)
	}

	/// Update `field`. The field must exist and `value` must have the same
	/// JSON type as the field's default.
	pub fn set(&mut self, field: &str, value: Value) -> RecordResult<()> {
		let default = self
			.defaults
			.get(field)
			.ok_or_else(|| RecordError::FieldNotFound(field.to_string()))?;

		if std::mem::discriminant(default) != std::mem::discriminant(&value) {
			return Err(RecordError::TypeMismatch {
				field: field.to_string(),
				expected: json_type_name(default),
				actual: json_type_name(&value),
			});
		}

		self.values.insert(field.to_string(), value);
		Ok(())
	}

	/// Attach a child carrying this record's field defaults.
	///
	/// An existing child with the same name is replaced only when `force`
	/// is set.
	pub fn add_child(&mut self, name: &str, force: bool) -> RecordResult<&mut NestedRecord> {
		if self.children.contains_key(name) && !force {
			return Err(RecordError::DuplicateChild(name.to_string()));
		}

		let child = NestedRecord::new(name, self.defaults.clone());
		self.children.insert(name.to_string(), child);
		self.children
			.get_mut(name)
			.ok_or_else(|| RecordError::ChildNotFound(name.to_string()))
	}

	/// Walk `path` down the tree and return the final child.
	pub fn get_child(&self, path: &[&str]) -> RecordResult<&NestedRecord> {
		let (first, rest) = path.split_first().ok_or(RecordError::MissingChild)?;
		let child = self
			.children
			.get(*first)
			.ok_or_else(|| RecordError::ChildNotFound(first.to_string()))?;

		if rest.is_empty() {
			Ok(child)
		} else {
			child.get_child(rest)
		}
	}

	/// Mutable variant of [`get_child`](Self::get_child). Missing children
	/// along the path are created when `auto_create` is set.
	pub fn get_child_mut(
		&mut self,
		path: &[&str],
		auto_create: bool,
	) -> RecordResult<&mut NestedRecord> {
		let (first, rest) = path.split_first().ok_or(RecordError::MissingChild)?;

		if !self.children.contains_key(*first) {
			if !auto_create {
				return Err(RecordError::ChildNotFound(first.to_string()));
			}
			self.add_child(first, false)?;
		}

		let child = self
			.children
			.get_mut(*first)
			.ok_or_else(|| RecordError::ChildNotFound(first.to_string()))?;

		if rest.is_empty() {
			Ok(child)
		} else {
			child.get_child_mut(rest, auto_create)
		}
	}

	/// Remove a child and its whole subtree. Unknown names are ignored.
	pub fn delete_child(&mut self, name: &str) -> Option<NestedRecord> {
		self.children.shift_remove(name)
	}

	/// Restore every field to its default; with `cascade`, children too.
	pub fn reset(&mut self, cascade: bool) {
		self.values = self.defaults.clone();
		if cascade {
			for child in self.children.values_mut() {
				child.reset(true);
			}
		}
	}

	/// Export fields and children as a JSON object; children appear as
	/// nested objects under their names.
	pub fn as_dict(&self) -> Value {
		let mut map = Map::new();
		for (key, value) in &self.values {
			map.insert(key.clone(), value.clone());
		}
		for (name, child) in &self.children {
			map.insert(name.clone(), child.as_dict());
		}
		Value::Object(map)
	}
}

fn json_type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "bool",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::*;
	use serde_json::json;

	#[fixture]
	fn record() -> NestedRecord {
		let mut fields = IndexMap::new();
		fields.insert("metafield1".to_string(), json!(false));
		fields.insert("metafield2".to_string(), json!(false));
		fields.insert("label".to_string(), json!(""));
		NestedRecord::new("Main", fields)
	}

	#[rstest]
	fn test_set_rejects_unknown_field(mut record: NestedRecord) {
		// Act
		let result = record.set("missing", json!(true));

		// Assert
		assert_eq!(
			result.unwrap_err(),
			RecordError::FieldNotFound("missing".to_string())
		);
	}

	#[rstest]
	fn test_set_rejects_type_change(mut record: NestedRecord) {
		// Act
		let result = record.set("metafield1", json!("yes"));

		// Assert
		assert!(matches!(
			result,
			Err(RecordError::TypeMismatch {
				expected: "bool",
				actual: "string",
				..
			})
		));
		assert_eq!(record.flag("metafield1"), Some(false));
	}

	#[rstest]
	fn test_children_inherit_defaults_not_values(mut record: NestedRecord) {
		// Arrange
		record.set("metafield1", json!(true)).unwrap();

		// Act
		let child = record.add_child("child1", false).unwrap();

		// Assert
		assert_eq!(child.flag("metafield1"), Some(false));
		assert_eq!(child.name(), "child1");
	}

	#[rstest]
	fn test_duplicate_child_requires_force(mut record: NestedRecord) {
		// Arrange
		record
			.add_child("child1", false)
			.unwrap()
			.set("metafield2", json!(true))
			.unwrap();

		// Act
		let duplicate = record.add_child("child1", false).map(|_| ());
		record.add_child("child1", true).unwrap();

		// Assert
		assert_eq!(
			duplicate.unwrap_err(),
			RecordError::DuplicateChild("child1".to_string())
		);
		let replaced = record.get_child(&["child1"]).unwrap();
		assert_eq!(replaced.flag("metafield2"), Some(false));
	}

	#[rstest]
	fn test_get_child_walks_path(mut record: NestedRecord) {
		// Arrange
		record
			.get_child_mut(&["child2", "grandchild1"], true)
			.unwrap()
			.set("label", json!("deep"))
			.unwrap();

		// Act
		let grandchild = record.get_child(&["child2", "grandchild1"]).unwrap();

		// Assert
		assert_eq!(grandchild.get("label").unwrap(), &json!("deep"));
		assert_eq!(record.children(), vec!["child2"]);
	}

	#[rstest]
	fn test_get_child_errors(mut record: NestedRecord) {
		assert_eq!(record.get_child(&[]).unwrap_err(), RecordError::MissingChild);
		assert_eq!(
			record.get_child(&["child5"]).unwrap_err(),
			RecordError::ChildNotFound("child5".to_string())
		);
		assert_eq!(
			record.get_child_mut(&["child5"], false).map(|_| ()).unwrap_err(),
			RecordError::ChildNotFound("child5".to_string())
		);
	}

	#[rstest]
	fn test_reset_with_and_without_cascade(mut record: NestedRecord) {
		// Arrange
		record.set("metafield1", json!(true)).unwrap();
		record
			.add_child("child1", false)
			.unwrap()
			.set("metafield1", json!(true))
			.unwrap();

		// Act
		record.reset(false);

		// Assert
		assert_eq!(record.flag("metafield1"), Some(false));
		assert_eq!(
			record.get_child(&["child1"]).unwrap().flag("metafield1"),
			Some(true)
		);

		record.reset(true);
		assert_eq!(
			record.get_child(&["child1"]).unwrap().flag("metafield1"),
			Some(false)
		);
	}

	#[rstest]
	fn test_as_dict_nests_children(mut record: NestedRecord) {
		// Arrange
		record
			.add_child("child1", false)
			.unwrap()
			.set("metafield2", json!(true))
			.unwrap();
		record.add_child("child2", false).unwrap();
		record.delete_child("child2");

		// Act
		let dict = record.as_dict();

		// Assert
		assert_eq!(
			dict,
			json!({
				"metafield1": false,
				"metafield2": false,
				"label": "",
				"child1": {"metafield1": false, "metafield2": true, "label": ""}
			})
		);
	}
}
