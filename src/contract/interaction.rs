//! Request/response pairs describing one provider behaviour

use super::matcher::{anchored, JsonBody, Mismatch};
use crate::error::{ClientError, Result};
use crate::transport::TransportResponse;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a request path is matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "lowercase")]
pub enum PathMatcher {
    /// Path must equal `path`
    Exact { path: String },
    /// Path must be fully matched by `regex`; `example` is what consumers replay
    Regex { regex: String, example: String },
}

impl PathMatcher {
    /// Whether `path` satisfies this matcher
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact { path: expected } => expected == path,
            Self::Regex { regex, .. } => anchored(regex).is_ok_and(|re| re.is_match(path)),
        }
    }

    /// Concrete path to use when replaying the interaction
    #[must_use]
    pub fn example(&self) -> &str {
        match self {
            Self::Exact { path } => path,
            Self::Regex { example, .. } => example,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Self::Regex { regex, example } = self {
            if !anchored(regex)?.is_match(example) {
                return Err(ClientError::InvalidMatcher {
                    pattern: regex.clone(),
                    reason: format!("example path '{example}' does not match"),
                });
            }
        }
        Ok(())
    }
}

/// Header value comparison
///
/// Names are compared case-insensitively by the caller. Values match exactly,
/// except that an expected media type without parameters also accepts the
/// same media type with parameters (`application/json; charset=utf-8`).
#[must_use]
pub fn header_value_matches(expected: &str, actual: &str) -> bool {
    let expected = expected.trim();
    let actual = actual.trim();
    if expected.contains(';') {
        return expected.eq_ignore_ascii_case(actual);
    }
    actual
        .split(';')
        .next()
        .is_some_and(|media| media.trim().eq_ignore_ascii_case(expected))
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Expected shape of the consumer's request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMatcher {
    /// HTTP method, upper case
    pub method: String,
    /// Path rule
    pub path: PathMatcher,
    /// Headers that must be present, names lower-cased
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl RequestMatcher {
    /// Every way the given request differs from this matcher
    #[must_use]
    pub fn mismatches(&self, method: &str, path: &str, headers: &[(String, String)]) -> Vec<Mismatch> {
        let mut mismatches = Vec::new();
        if !self.method.eq_ignore_ascii_case(method) {
            mismatches.push(Mismatch::new(
                "method",
                format!("expected {} but was {method}", self.method),
            ));
        }
        if !self.path.matches(path) {
            mismatches.push(Mismatch::new(
                "path",
                format!("'{path}' does not match {:?}", self.path),
            ));
        }
        for (name, expected) in &self.headers {
            match find_header(headers, name) {
                Some(actual) if header_value_matches(expected, actual) => {}
                Some(actual) => mismatches.push(Mismatch::new(
                    format!("header:{name}"),
                    format!("expected '{expected}' but was '{actual}'"),
                )),
                None => mismatches.push(Mismatch::new(format!("header:{name}"), "missing")),
            }
        }
        mismatches
    }

    /// Headers to send when replaying the interaction
    #[must_use]
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// Response the provider must produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSpec {
    /// Exact status code
    pub status: u16,
    /// Headers that must be present, names lower-cased
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Body rules; `None` leaves the body unconstrained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<JsonBody>,
}

impl ResponseSpec {
    /// Every way `response` fails this specification
    #[must_use]
    pub fn check(&self, response: &TransportResponse) -> Vec<Mismatch> {
        let mut mismatches = Vec::new();
        if response.status != self.status {
            mismatches.push(Mismatch::new(
                "status",
                format!("expected {} but was {}", self.status, response.status),
            ));
        }
        for (name, expected) in &self.headers {
            match response.header(name) {
                Some(actual) if header_value_matches(expected, actual) => {}
                Some(actual) => mismatches.push(Mismatch::new(
                    format!("header:{name}"),
                    format!("expected '{expected}' but was '{actual}'"),
                )),
                None => mismatches.push(Mismatch::new(format!("header:{name}"), "missing")),
            }
        }
        if let Some(body) = &self.body {
            match serde_json::from_str(&response.body) {
                Ok(actual) => mismatches.extend(body.check(&actual)),
                Err(err) => mismatches.push(Mismatch::new("$", format!("body is not JSON: {err}"))),
            }
        }
        mismatches
    }
}

/// One named request/response pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    /// What the consumer is asking for
    pub description: String,
    /// State the provider must be in before the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_state: Option<String>,
    /// Request rules
    pub request: RequestMatcher,
    /// Response rules and examples
    pub response: ResponseSpec,
}

impl Interaction {
    /// Start an interaction requiring `state` on the provider
    pub fn given(state: impl Into<String>) -> InteractionBuilder {
        InteractionBuilder {
            provider_state: Some(state.into()),
            ..InteractionBuilder::default()
        }
    }

    /// Start an interaction with no provider state
    #[must_use]
    pub fn builder() -> InteractionBuilder {
        InteractionBuilder::default()
    }

    /// Check every matcher of the interaction
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidMatcher`] naming the interaction when a
    /// path or body pattern does not compile or rejects its own example.
    pub fn validate(&self) -> Result<()> {
        self.request.path.validate().and_then(|()| {
            self.response
                .body
                .as_ref()
                .map_or(Ok(()), JsonBody::validate)
        })
        .map_err(|err| match err {
            ClientError::InvalidMatcher { pattern, reason } => ClientError::InvalidMatcher {
                pattern,
                reason: format!("interaction '{}': {reason}", self.description),
            },
            other => other,
        })
    }
}

/// Fluent builder for [`Interaction`]
///
/// ```
/// use customer_contract::contract::{Interaction, JsonBody};
///
/// let interaction = Interaction::given("an existing customer with a valid id")
///     .upon_receiving("a request for an existing customer id")
///     .match_path(r"/customers/\d+", "/customers/1234")
///     .header("Accept", "application/json")
///     .will_respond_with(200)
///     .response_header("Content-Type", "application/json")
///     .body(JsonBody::new().string_type("firstName", "Test"))
///     .build()
///     .unwrap();
/// assert_eq!(interaction.request.path.example(), "/customers/1234");
/// ```
#[derive(Debug, Clone, Default)]
pub struct InteractionBuilder {
    description: String,
    provider_state: Option<String>,
    method: Option<String>,
    path: Option<PathMatcher>,
    request_headers: BTreeMap<String, String>,
    status: Option<u16>,
    response_headers: BTreeMap<String, String>,
    body: Option<JsonBody>,
}

impl InteractionBuilder {
    /// Describe the request
    #[must_use]
    pub fn upon_receiving(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Request method (GET when not set)
    #[must_use]
    pub fn method(mut self, method: &str) -> Self {
        self.method = Some(method.to_ascii_uppercase());
        self
    }

    /// Literal request path
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(PathMatcher::Exact { path: path.into() });
        self
    }

    /// Request path matched by a regular expression
    #[must_use]
    pub fn match_path(mut self, regex: impl Into<String>, example: impl Into<String>) -> Self {
        self.path = Some(PathMatcher::Regex {
            regex: regex.into(),
            example: example.into(),
        });
        self
    }

    /// Required request header
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let _ = self
            .request_headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Response status
    #[must_use]
    pub const fn will_respond_with(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Required response header
    #[must_use]
    pub fn response_header(mut self, name: &str, value: &str) -> Self {
        let _ = self
            .response_headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Response body rules
    #[must_use]
    pub fn body(mut self, body: JsonBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Finish the interaction
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidMatcher`] when the description, path or
    /// status is missing, or when a matcher rejects its own example.
    pub fn build(self) -> Result<Interaction> {
        if self.description.trim().is_empty() {
            return Err(invalid("description", "interaction needs a description"));
        }
        let path = self
            .path
            .ok_or_else(|| invalid("path", "interaction needs a request path"))?;
        path.validate()?;
        let status = self
            .status
            .ok_or_else(|| invalid("status", "interaction needs a response status"))?;
        if let Some(body) = &self.body {
            body.validate()?;
        }

        Ok(Interaction {
            description: self.description,
            provider_state: self.provider_state,
            request: RequestMatcher {
                method: self.method.unwrap_or_else(|| "GET".to_string()),
                path,
                headers: self.request_headers,
            },
            response: ResponseSpec {
                status,
                headers: self.response_headers,
                body: self.body,
            },
        })
    }
}

fn invalid(pattern: &str, reason: &str) -> ClientError {
    ClientError::InvalidMatcher {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}
