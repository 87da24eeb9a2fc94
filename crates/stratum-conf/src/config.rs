//! Layered configuration
//!
//! Fields are declared once and then resolved from four sources: instance
//! overrides, the declaration body, YAML files and the process environment.
//! Derived configurations fold their values over their parent's.

pub mod declaration;
pub mod field;
pub mod keyword;
pub mod kind;
pub mod prelude;
pub mod profile;
pub mod resolve;
pub mod source;
pub mod testing;
pub mod value;
pub mod yaml;

pub use declaration::{ClassAttr, ConfigDeclaration, DeclarationOptions};
pub use field::{ConfigField, ConfigFieldBuilder, FieldError};
pub use kind::{DataType, FieldKind, KindSpec};
pub use resolve::{Candidates, ResolveError, ResolveResult, ResolvedConfig, ResolvedMap, resolve};
pub use source::{Environment, SourceKind, SourcePriority};
pub use value::{CompareError, ConfigValue, ValueError};
