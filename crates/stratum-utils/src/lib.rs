//! # Stratum Utilities
//!
//! Supporting data structures shared by the Stratum crates.
//!
//! ## Module Organization
//!
//! - [`nested_record`]: Tree of typed records used to store per-configuration metadata

pub mod nested_record;

pub use nested_record::{NestedRecord, RecordError, RecordResult};
