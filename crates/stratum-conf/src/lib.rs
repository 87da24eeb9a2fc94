//! # Stratum Configuration
//!
//! Layered, typed configuration declarations for Rust.
//!
//! A configuration declares its variables as typed fields. Each field is
//! resolved from up to four sources, ranked highest first:
//!
//! - **Instance**: overrides applied to an already-resolved configuration
//! - **Class**: values written in the declaration itself
//! - **YAML**: entries of the YAML files attached to the declaration
//! - **Environment**: process environment variables, coerced to the field type
//!
//! Derived configurations resolve on top of their parent. A locked value
//! that has been set can never be displaced, neither by a higher-ranked
//! source nor by a derived configuration.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use stratum_conf::config::prelude::*;
//!
//! let config = ConfigDeclaration::new("AppConfig")
//!     .value("HOST", "localhost")
//!     .value("PORT", 8080)
//!     .resolve_with(
//!         &Environment::from_pairs([("PORT", "9090")]),
//!         None,
//!         &SourcePriority::default(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(config.get("host"), Some(&json!("localhost")));
//! assert_eq!(config.get("port"), Some(&json!(8080)));
//! ```
//!
//! ## Module Organization
//!
//! - [`config`]: Field declarations, sources and the resolution engine

pub mod config;

// Re-export commonly used types at the crate root for convenience
pub use config::{ConfigDeclaration, ConfigField, ConfigValue, ResolvedConfig, SourceKind};
