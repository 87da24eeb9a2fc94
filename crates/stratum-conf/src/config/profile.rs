//! Deployment profiles
//!
//! The profile names the environment a process runs in. It is usually read
//! from a single environment variable such as `APP_ENV`.

use super::source::Environment;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown profile '{0}' (expected one of: local, test, staging, uat, production)")]
pub struct UnknownProfile(pub String);

/// Environment a configuration is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
	#[default]
	Local,
	Test,
	Staging,
	Uat,
	Production,
}

impl Profile {
	pub const ALL: [Profile; 5] = [
		Profile::Local,
		Profile::Test,
		Profile::Staging,
		Profile::Uat,
		Profile::Production,
	];

	pub fn names() -> Vec<&'static str> {
		Self::ALL.iter().map(Profile::name).collect()
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::Local => "local",
			Self::Test => "test",
			Self::Staging => "staging",
			Self::Uat => "uat",
			Self::Production => "production",
		}
	}

	pub fn is_production(&self) -> bool {
		matches!(self, Self::Production)
	}

	/// Read the profile from `key` in `env`.
	///
	/// A missing variable yields `Ok(None)`; an unrecognised value is an
	/// error.
	///
	/// # Examples
	///
	/// ```
	/// use stratum_conf::config::profile::Profile;
	/// use stratum_conf::config::source::Environment;
	///
	/// let env = Environment::from_pairs([("APP_ENV", "Staging")]);
	/// assert_eq!(Profile::from_env(&env, "APP_ENV").unwrap(), Some(Profile::Staging));
	/// assert_eq!(Profile::from_env(&env, "OTHER").unwrap(), None);
	/// ```
	pub fn from_env(env: &Environment, key: &str) -> Result<Option<Self>, UnknownProfile> {
		env.get(key).map(str::parse).transpose()
	}
}

impl fmt::Display for Profile {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for Profile {
	type Err = UnknownProfile;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"local" | "dev" | "development" => Ok(Self::Local),
			"test" => Ok(Self::Test),
			"staging" => Ok(Self::Staging),
			"uat" => Ok(Self::Uat),
			"production" | "prod" => Ok(Self::Production),
			_ => Err(UnknownProfile(s.to_string())),
		}
	}
}
