//! Prelude module for convenient imports
//!
//! Import this module to get access to the most commonly used types.

pub use super::declaration::{ClassAttr, ConfigDeclaration, DeclarationOptions};
pub use super::field::{ConfigField, ConfigFieldBuilder, FieldError};
pub use super::keyword::{KeywordError, parse_keyword_str};
pub use super::kind::{DataType, FieldKind, KindSpec, UnknownDatatype};
pub use super::profile::{Profile, UnknownProfile};
pub use super::resolve::{
	Candidates, ResolveError, ResolveResult, ResolvedConfig, ResolvedMap, resolve,
};
pub use super::source::{Environment, SourceError, SourceKind, SourcePriority};
pub use super::value::{CompareError, ConfigValue, ValueError};
pub use super::yaml::YamlLoader;
