//! Keyword-string parsing
//!
//! Declarations may annotate a value with strings such as `"alt_name=PORT"` or
//! `"metadata={owner=infra, tier:2}"`. These helpers turn such strings into
//! typed key/value pairs.

use indexmap::IndexMap;
use serde_json::{Number, Value};

const DELIMITERS: [char; 2] = ['=', ':'];
const QUOTES: [char; 2] = ['\'', '"'];
const METADATA_PREFIX: &str = "metadata={";

/// Errors raised by the keyword parsers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeywordError {
	#[error("bad keyword format: {0}")]
	BadFormat(String),
}

/// Parse `key=value` or `key:value`.
///
/// The first delimiter splits the string; it may be neither the first nor
/// the last character. The value is read as, in order of preference: a
/// quoted string (quotes stripped), a boolean literal, an integer, a float,
/// and finally the raw string.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use stratum_conf::config::keyword::parse_keyword_str;
///
/// assert_eq!(parse_keyword_str("retries=3").unwrap(), ("retries".to_string(), json!(3)));
/// assert_eq!(parse_keyword_str("debug:TRUE").unwrap(), ("debug".to_string(), json!(true)));
/// assert_eq!(parse_keyword_str("name='3'").unwrap(), ("name".to_string(), json!("3")));
/// assert!(parse_keyword_str("=value").is_err());
/// ```
pub fn parse_keyword_str(kw_str: &str) -> Result<(String, Value), KeywordError> {
	let sep = kw_str
		.find(DELIMITERS)
		.filter(|&sep| sep > 0 && sep + 1 < kw_str.len())
		.ok_or_else(|| KeywordError::BadFormat(kw_str.to_string()))?;

	let key = &kw_str[..sep];
	let raw = &kw_str[sep + 1..];
	Ok((key.to_string(), parse_keyword_value(raw)))
}

fn parse_keyword_value(raw: &str) -> Value {
	let mut chars = raw.chars();
	if let (Some(first), Some(last)) = (chars.next(), chars.next_back())
		&& first == last
		&& QUOTES.contains(&first)
	{
		return Value::String(raw[1..raw.len() - 1].to_string());
	}

	if raw.eq_ignore_ascii_case("true") {
		return Value::Bool(true);
	}
	if raw.eq_ignore_ascii_case("false") {
		return Value::Bool(false);
	}
	if let Ok(int) = raw.parse::<i64>() {
		return Value::from(int);
	}
	if let Some(float) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
		return Value::Number(float);
	}
	Value::String(raw.to_string())
}

/// Whether `item` has the `metadata={...}` form.
pub fn is_metadata_str(item: &str) -> bool {
	item.starts_with(METADATA_PREFIX) && item.ends_with('}')
}

/// Parse `metadata={k=v, k2:v2}` into an ordered mapping.
///
/// Each comma-separated entry goes through [`parse_keyword_str`]; empty
/// entries are ignored.
pub fn parse_metadata_str(item: &str) -> Result<IndexMap<String, Value>, KeywordError> {
	let inner = item
		.strip_prefix(METADATA_PREFIX)
		.and_then(|rest| rest.strip_suffix('}'))
		.ok_or_else(|| KeywordError::BadFormat(item.to_string()))?;

	inner
		.split(',')
		.map(str::trim)
		.filter(|entry| !entry.is_empty())
		.map(parse_keyword_str)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case("key=\"quoted value\"", "key", json!("quoted value"))]
	#[case("key='1'", "key", json!("1"))]
	#[case("flag=False", "flag", json!(false))]
	#[case("count=-12", "count", json!(-12))]
	#[case("ratio=0.25", "ratio", json!(0.25))]
	#[case("name=plain text", "name", json!("plain text"))]
	#[case("url=http://host", "url", json!("http://host"))]
	#[case("host:a=b", "host", json!("a=b"))]
	#[case("mixed='quote\"", "mixed", json!("'quote\""))]
	fn test_parse_keyword_str(#[case] input: &str, #[case] key: &str, #[case] expected: Value) {
		let (k, v) = parse_keyword_str(input).unwrap();
		assert_eq!(k, key);
		assert_eq!(v, expected);
	}

	#[rstest]
	#[case("no delimiter")]
	#[case("=leading")]
	#[case(":leading")]
	#[case("trailing=")]
	#[case("")]
	fn test_parse_keyword_str_rejects(#[case] input: &str) {
		assert_eq!(
			parse_keyword_str(input).unwrap_err(),
			KeywordError::BadFormat(input.to_string())
		);
	}

	#[rstest]
	fn test_parse_metadata_str() {
		// Arrange
		let item = "metadata={owner=infra, tier:2, , audited=true}";

		// Act
		let parsed = parse_metadata_str(item).unwrap();

		// Assert
		assert!(is_metadata_str(item));
		assert_eq!(parsed.len(), 3);
		assert_eq!(parsed["owner"], json!("infra"));
		assert_eq!(parsed["tier"], json!(2));
		assert_eq!(parsed["audited"], json!(true));
	}

	#[rstest]
	fn test_parse_metadata_str_rejects_bad_entries() {
		assert!(parse_metadata_str("metadata={owner}").is_err());
		assert!(parse_metadata_str("owner=infra").is_err());
		assert!(!is_metadata_str("metadata=owner"));
	}
}
