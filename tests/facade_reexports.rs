//! Smoke tests for the facade re-exports.

#![cfg(feature = "full")]

use rstest::rstest;
use serde_json::json;
use stratum::conf::prelude::*;
use stratum::utils::NestedRecord;

#[rstest]
fn test_facade_resolves_and_exposes_metadata() {
	// Arrange
	let declaration = stratum::ConfigDeclaration::new("Facade").value("NAME", "stratum");

	// Act
	let config = declaration
		.resolve_with(&Environment::default(), None, &SourcePriority::default())
		.unwrap();
	let record: NestedRecord = config.metadata().unwrap();

	// Assert
	assert_eq!(config.get("name"), Some(&json!("stratum")));
	assert_eq!(record.name(), "Facade");
	assert_eq!(record.flag("class_built"), Some(true));
}
