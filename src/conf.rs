//! Configuration module.
//!
//! Re-exports the declaration types, sources and resolution engine.
//!
//! # Examples
//!
//! ```rust
//! # #[cfg(feature = "conf")]
//! use stratum::conf::prelude::{ConfigDeclaration, Environment, SourcePriority};
//! ```

#[cfg(feature = "conf")]
pub use stratum_conf::config::*;
