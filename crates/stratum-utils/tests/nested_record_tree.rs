//! Integration tests for NestedRecord trees.

use indexmap::IndexMap;
use rstest::*;
use serde_json::{Value, json};
use stratum_utils::{NestedRecord, RecordError};

#[fixture]
fn flags() -> IndexMap<String, Value> {
	[("built", json!(false)), ("depth", json!(0))]
		.into_iter()
		.map(|(k, v)| (k.to_string(), v))
		.collect()
}

#[rstest]
fn test_serialize_skips_defaults(flags: IndexMap<String, Value>) {
	// Arrange
	let mut root = NestedRecord::new("Root", flags);
	root.set("built", json!(true)).unwrap();
	root.get_child_mut(&["Child"], true)
		.unwrap()
		.set("depth", json!(1))
		.unwrap();

	// Act
	let serialized = serde_json::to_value(&root).unwrap();

	// Assert
	assert_eq!(
		serialized,
		json!({
			"name": "Root",
			"values": {"built": true, "depth": 0},
			"children": {
				"Child": {
					"name": "Child",
					"values": {"built": false, "depth": 1},
					"children": {}
				}
			}
		})
	);
}

#[rstest]
fn test_deleted_subtree_is_gone(flags: IndexMap<String, Value>) {
	// Arrange
	let mut root = NestedRecord::new("Root", flags);
	root.get_child_mut(&["A", "B", "C"], true).unwrap();

	// Act
	let removed = root.get_child_mut(&["A"], false).unwrap().delete_child("B");

	// Assert
	assert_eq!(removed.map(|r| r.children().len()), Some(1));
	assert_eq!(
		root.get_child(&["A", "B"]).unwrap_err(),
		RecordError::ChildNotFound("B".to_string())
	);
	assert_eq!(root.fields().count(), 2);
}
