//! Value matchers for contract bodies
//!
//! A matcher carries an example value, served by mock servers, and a rule used
//! when checking a real value: exact equality, same JSON type, or a regular
//! expression that must match the whole string.

use crate::error::{ClientError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

/// Rule applied to a single JSON value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "lowercase")]
pub enum Matcher {
    /// Actual value must equal `value`
    Equality { value: Value },
    /// Actual value must have the same JSON type as `value`
    Type { value: Value },
    /// Actual value must be a string fully matched by `regex`
    Regex { regex: String, value: Value },
}

impl Matcher {
    /// Exact-value matcher
    pub fn equal(value: impl Into<Value>) -> Self {
        Self::Equality {
            value: value.into(),
        }
    }

    /// Type-only matcher
    pub fn like(example: impl Into<Value>) -> Self {
        Self::Type {
            value: example.into(),
        }
    }

    /// Regular-expression matcher with a string example
    pub fn regex(regex: impl Into<String>, example: impl Into<String>) -> Self {
        Self::Regex {
            regex: regex.into(),
            value: Value::String(example.into()),
        }
    }

    /// Example value served in place of a real one
    #[must_use]
    pub const fn example(&self) -> &Value {
        match self {
            Self::Equality { value } | Self::Type { value } | Self::Regex { value, .. } => value,
        }
    }

    /// Check that the matcher is usable and its example satisfies it
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidMatcher`] for a pattern that does not
    /// compile or an example it rejects.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Regex { regex, value } => {
                let compiled = anchored(regex)?;
                match value.as_str() {
                    Some(example) if compiled.is_match(example) => Ok(()),
                    _ => Err(ClientError::InvalidMatcher {
                        pattern: regex.clone(),
                        reason: format!("example {value} does not match"),
                    }),
                }
            }
            Self::Equality { .. } | Self::Type { .. } => Ok(()),
        }
    }

    /// Why `actual` fails this matcher, if it does
    #[must_use]
    pub fn mismatch(&self, actual: &Value) -> Option<String> {
        match self {
            Self::Equality { value } => {
                (value != actual).then(|| format!("expected {value} but was {actual}"))
            }
            Self::Type { value } => (json_type(value) != json_type(actual)).then(|| {
                format!(
                    "expected a value of type {} but was {actual}",
                    json_type(value)
                )
            }),
            Self::Regex { regex, .. } => {
                let Some(text) = actual.as_str() else {
                    return Some(format!("expected a string matching '{regex}' but was {actual}"));
                };
                match anchored(regex) {
                    Ok(compiled) if compiled.is_match(text) => None,
                    Ok(_) => Some(format!("'{text}' does not match '{regex}'")),
                    Err(err) => Some(err.to_string()),
                }
            }
        }
    }
}

/// Compile `pattern` so it has to match an entire value
///
/// Compiled patterns are kept for the life of the process, so matching a
/// request against a pact compiles each pattern once.
///
/// # Errors
///
/// Returns [`ClientError::InvalidMatcher`] when the pattern does not compile.
pub fn anchored(pattern: &str) -> Result<Regex> {
    if let Some(compiled) = compiled_patterns().get(pattern) {
        return Ok(compiled.clone());
    }

    let compiled =
        Regex::new(&format!("^(?:{pattern})$")).map_err(|e| ClientError::InvalidMatcher {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
    let _ = compiled_patterns().insert(pattern.to_string(), compiled.clone());
    Ok(compiled)
}

fn compiled_patterns() -> MutexGuard<'static, HashMap<String, Regex>> {
    static PATTERNS: OnceLock<Mutex<HashMap<String, Regex>>> = OnceLock::new();
    PATTERNS
        .get_or_init(Mutex::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A single rule violation, located by JSON path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Where the violation was found (`$.firstName`, `status`, `header:content-type`)
    pub path: String,
    /// What was wrong
    pub reason: String,
}

impl Mismatch {
    /// Create a mismatch
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Expected JSON object body, one matcher per field
///
/// Fields not declared here are allowed in actual bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonBody {
    fields: BTreeMap<String, Matcher>,
}

impl JsonBody {
    /// Empty object body
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// String field matched by a regular expression
    #[must_use]
    pub fn string_matcher(self, name: &str, regex: &str, example: &str) -> Self {
        self.field(name, Matcher::regex(regex, example))
    }

    /// String field matched by type only
    #[must_use]
    pub fn string_type(self, name: &str, example: &str) -> Self {
        self.field(name, Matcher::like(example))
    }

    /// Field that must equal `value`
    #[must_use]
    pub fn equal(self, name: &str, value: impl Into<Value>) -> Self {
        self.field(name, Matcher::equal(value))
    }

    /// Field with an arbitrary matcher
    #[must_use]
    pub fn field(mut self, name: &str, matcher: Matcher) -> Self {
        let _ = self.fields.insert(name.to_string(), matcher);
        self
    }

    /// Declared field matchers by name
    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, Matcher> {
        &self.fields
    }

    /// Validate every field matcher
    ///
    /// # Errors
    ///
    /// Returns the first [`ClientError::InvalidMatcher`] found.
    pub fn validate(&self) -> Result<()> {
        self.fields.values().try_for_each(Matcher::validate)
    }

    /// Object built from the field examples
    #[must_use]
    pub fn example(&self) -> Value {
        let object: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, matcher)| (name.clone(), matcher.example().clone()))
            .collect();
        Value::Object(object)
    }

    /// Every way `actual` violates this body
    #[must_use]
    pub fn check(&self, actual: &Value) -> Vec<Mismatch> {
        let Some(object) = actual.as_object() else {
            return vec![Mismatch::new("$", format!("expected a JSON object but was {actual}"))];
        };

        self.fields
            .iter()
            .filter_map(|(name, matcher)| {
                let path = format!("$.{name}");
                match object.get(name) {
                    None => Some(Mismatch::new(path, "missing field")),
                    Some(value) => matcher.mismatch(value).map(|reason| Mismatch::new(path, reason)),
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    const NAME: &str = r"[A-Z][\w\s]+";

    #[test]
    fn test_regex_matches_whole_value() {
        let matcher = Matcher::regex(NAME, "Test");
        assert_eq!(matcher.mismatch(&json!("Test")), None);
        assert_eq!(matcher.mismatch(&json!("Mary Ann")), None);
        assert!(matcher.mismatch(&json!("test")).is_some());
        assert!(matcher.mismatch(&json!("Test!")).is_some());
        assert!(matcher.mismatch(&json!("T")).is_some());
        assert!(matcher.mismatch(&json!(42)).is_some());
    }

    #[test]
    fn test_type_and_equality() {
        assert_eq!(Matcher::like("anything").mismatch(&json!("else")), None);
        assert!(Matcher::like("anything").mismatch(&json!(1)).is_some());
        assert_eq!(Matcher::equal(1234).mismatch(&json!(1234)), None);
        assert!(Matcher::equal(1234).mismatch(&json!(1235)).is_some());
    }

    #[test]
    fn test_validate_rejects_bad_patterns_and_examples() {
        assert!(Matcher::regex(NAME, "Test").validate().is_ok());
        assert!(matches!(
            Matcher::regex("[unclosed", "x").validate(),
            Err(ClientError::InvalidMatcher { .. })
        ));
        assert!(Matcher::regex(NAME, "lowercase").validate().is_err());
    }

    #[test]
    fn test_anchored_patterns_are_compiled_once() {
        let first = anchored(r"/orders/\d+").unwrap();
        assert!(compiled_patterns().contains_key(r"/orders/\d+"));

        let second = anchored(r"/orders/\d+").unwrap();
        assert_eq!(first.as_str(), second.as_str());
        assert!(second.is_match("/orders/12"));
        assert!(!second.is_match("/orders/12/items"));

        assert!(anchored("/orders/[").is_err());
        assert!(!compiled_patterns().contains_key("/orders/["));
    }

    #[test]
    fn test_body_example_and_check() {
        let body = JsonBody::new()
            .string_matcher("firstName", NAME, "Test")
            .string_matcher("lastName", NAME, "First");

        assert_eq!(body.example(), json!({"firstName": "Test", "lastName": "First"}));
        assert!(body.check(&json!({"firstName": "Jane", "lastName": "Doe", "id": 7})).is_empty());

        let mismatches = body.check(&json!({"firstName": "jane"}));
        assert_eq!(mismatches.len(), 2);
        assert_eq!(mismatches[0].path, "$.firstName");
        assert_eq!(mismatches[1], Mismatch::new("$.lastName", "missing field"));

        assert_eq!(body.check(&json!([1, 2])).len(), 1);
    }

    #[test]
    fn test_serialized_form_is_tagged() {
        let json = serde_json::to_value(Matcher::regex(r"\d+", "1")).unwrap();
        assert_eq!(json, json!({"match": "regex", "regex": r"\d+", "value": "1"}));
        let back: Matcher = serde_json::from_value(json).unwrap();
        assert_eq!(back, Matcher::regex(r"\d+", "1"));
    }
}
