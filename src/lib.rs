#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

//! # Customer contract
//!
//! A customer lookup client together with the consumer-driven contract it is
//! tested against.
//!
//! ## Architecture
//!
//! - **[`error`]** - Error types and error handling
//! - **[`config`]** - Host/port/timeout configuration
//! - **[`customer`]** - The customer entity
//! - **[`transport`]** - Shared asynchronous HTTP GET executor
//! - **[`browser`]** - `find_by_id` and the deferred lookup handle
//! - **[`contract`]** - Matchers, pacts, mock server and provider verifier
//! - **[`service`]** - Reference customer service (the provider)
//!
//! ## Quick Start
//!
//! ```bash
//! customer-contract serve --seed &      # Run the provider
//! customer-contract find 1234           # Look a customer up
//! customer-contract pact --dir pacts    # Write the consumer pact
//! ```

pub mod browser;
pub mod cli;
pub mod config;
pub mod contract;
pub mod customer;
pub mod error;
pub mod server;
pub mod service;
pub mod transport;

/// Error type alias for convenience
pub use error::{ClientError, Result};

/// Configuration type alias for convenience
pub use config::ClientConfig;

pub use browser::{CancelOutcome, CustomerBrowser, CustomerLookup, DefaultCustomerBrowser};
pub use customer::Customer;
pub use transport::{HttpTransport, Transport, TransportResponse};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = "customer-contract";
