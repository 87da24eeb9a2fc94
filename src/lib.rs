//! # Stratum
//!
//! Layered, typed configuration declarations for Rust.
//!
//! Stratum resolves each declared configuration variable from instance
//! overrides, the declaration body, YAML files and the process environment,
//! in that order of priority. Configurations derive from one another, and
//! locked values survive every override.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All modules
//! - `conf` - Declarations, sources and the resolution engine
//! - `utils` - Supporting data structures
//!
//! ## Quick Start
//!
//! ```rust
//! # #[cfg(feature = "conf")]
//! # {
//! use serde_json::json;
//! use stratum::conf::prelude::*;
//!
//! let base = ConfigDeclaration::new("BaseConfig")
//!     .attr("REGION", ClassAttr::Tuple(json!("eu"), vec!["locked".into()]))
//!     .value("DEBUG", false)
//!     .resolve_with(&Environment::default(), None, &SourcePriority::default())
//!     .unwrap();
//!
//! let local = ConfigDeclaration::new("LocalConfig")
//!     .value("REGION", "us")
//!     .value("DEBUG", true)
//!     .resolve_with(&Environment::default(), Some(&base), &SourcePriority::default())
//!     .unwrap();
//!
//! assert_eq!(local.get("region"), Some(&json!("eu")));
//! assert_eq!(local.get("debug"), Some(&json!(true)));
//! # }
//! ```

#[cfg(feature = "conf")]
pub mod conf;
#[cfg(feature = "utils")]
pub mod utils;

#[cfg(feature = "conf")]
pub use stratum_conf::config::{
	ClassAttr, ConfigDeclaration, ConfigField, ConfigValue, ResolveError, ResolvedConfig,
	SourceKind, SourcePriority,
};
