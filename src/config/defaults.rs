//! Default configuration values

/// Default customer service host
pub fn default_host() -> String {
    "localhost".to_string()
}

/// Default customer service port
pub const fn default_port() -> u16 {
    8080
}

/// Default request timeout in seconds
pub const fn default_timeout() -> u64 {
    30
}

/// Default connect timeout in seconds
pub const fn default_connect_timeout() -> u64 {
    10
}

/// Resource path segment for customer lookups
pub const CUSTOMERS_RESOURCE: &str = "customers";

/// Media type requested from and returned by the customer service
pub const APPLICATION_JSON: &str = "application/json";

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("customer-contract/", env!("CARGO_PKG_VERSION"));
