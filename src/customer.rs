//! Customer record as returned by the customer service

use serde::{Deserialize, Serialize};

/// A customer as seen by the client
///
/// Only exists when the service answered with a 2xx status and a body of the
/// shape `{"firstName": "...", "lastName": "..."}`. Extra fields such as the
/// provider's `id` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,
}

impl Customer {
    /// Create a customer from its two names
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Parse a response body into a customer
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the body is not an object with string
    /// `firstName` and `lastName` fields.
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    /// "First Last" for display
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
