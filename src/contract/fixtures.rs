//! Contract between the mobile client and the customer service

use super::interaction::Interaction;
use super::matcher::JsonBody;
use super::pact::Pact;
use crate::config::APPLICATION_JSON;
use crate::error::Result;

/// Consumer name used in the customer-service pact
pub const ANDROID_CLIENT: &str = "AndroidClient";

/// Provider name used in the customer-service pact
pub const CUSTOMER_SERVICE: &str = "CustomerService";

/// Provider state: customer 1234 exists as "Test First"
pub const EXISTING_CUSTOMER_STATE: &str = "an existing customer with a valid id";

/// Provider state: the requested customer does not exist
pub const NON_EXISTENT_CUSTOMER_STATE: &str = "a non-existent customer with an invalid id";

/// Description of the existing-customer interaction
pub const EXISTING_CUSTOMER_REQUEST: &str = "a request for an existing customer id";

/// Description of the missing-customer interaction
pub const NON_EXISTENT_CUSTOMER_REQUEST: &str = "a request for a non-existent customer id";

/// Path template shared by both interactions
pub const CUSTOMER_PATH: &str = r"/customers/\d+";

/// Rule customer names must satisfy
pub const NAME_PATTERN: &str = r"[A-Z][\w\s]+";

/// Id used by the existing-customer example request
pub const EXISTING_CUSTOMER_ID: i64 = 1234;

/// Id used by the missing-customer example request
pub const NON_EXISTENT_CUSTOMER_ID: i64 = 112_233;

/// GET of a known id answers 200 with both names
///
/// # Errors
///
/// Only fails if the constants above stop agreeing with each other.
pub fn existing_customer() -> Result<Interaction> {
    Interaction::given(EXISTING_CUSTOMER_STATE)
        .upon_receiving(EXISTING_CUSTOMER_REQUEST)
        .match_path(CUSTOMER_PATH, format!("/customers/{EXISTING_CUSTOMER_ID}"))
        .header("Accept", APPLICATION_JSON)
        .will_respond_with(200)
        .response_header("Content-Type", APPLICATION_JSON)
        .body(
            JsonBody::new()
                .string_matcher("firstName", NAME_PATTERN, "Test")
                .string_matcher("lastName", NAME_PATTERN, "First"),
        )
        .build()
}

/// GET of an unknown id answers 404 with no body
///
/// # Errors
///
/// Only fails if the constants above stop agreeing with each other.
pub fn non_existent_customer() -> Result<Interaction> {
    Interaction::given(NON_EXISTENT_CUSTOMER_STATE)
        .upon_receiving(NON_EXISTENT_CUSTOMER_REQUEST)
        .match_path(CUSTOMER_PATH, format!("/customers/{NON_EXISTENT_CUSTOMER_ID}"))
        .header("Accept", APPLICATION_JSON)
        .will_respond_with(404)
        .build()
}

/// Both interactions in one pact
///
/// # Errors
///
/// Only fails if an interaction fails to build.
pub fn customer_service_pact() -> Result<Pact> {
    Ok(Pact::new(ANDROID_CLIENT, CUSTOMER_SERVICE)
        .with_interaction(existing_customer()?)
        .with_interaction(non_existent_customer()?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fixtures_build() {
        let pact = customer_service_pact().unwrap();
        assert_eq!(pact.file_name(), "AndroidClient-CustomerService.json");
        assert_eq!(pact.interactions.len(), 2);

        let existing = &pact.interactions[0];
        assert_eq!(existing.request.path.example(), "/customers/1234");
        assert_eq!(
            existing.response.body.as_ref().unwrap().example(),
            json!({"firstName": "Test", "lastName": "First"})
        );

        let missing = &pact.interactions[1];
        assert_eq!(missing.response.status, 404);
        assert!(missing.response.body.is_none());
    }

    #[test]
    fn test_states_select_one_interaction() {
        let pact = customer_service_pact().unwrap();
        let existing = pact.for_state(EXISTING_CUSTOMER_STATE);
        assert_eq!(existing.interactions.len(), 1);
        assert_eq!(existing.interactions[0].description, EXISTING_CUSTOMER_REQUEST);
    }
}
