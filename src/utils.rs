//! Utility data structures module.

#[cfg(feature = "utils")]
pub use stratum_utils::*;
