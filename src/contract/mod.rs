//! Consumer-driven contract tooling
//!
//! Interactions are declared with tagged matchers, bundled into a [`Pact`],
//! served to the consumer by a [`MockServer`], and replayed against the real
//! provider by a [`ProviderVerifier`].

pub mod fixtures;
pub mod interaction;
pub mod matcher;
pub mod mock_server;
pub mod pact;
pub mod verifier;

pub use interaction::{Interaction, InteractionBuilder, PathMatcher, RequestMatcher, ResponseSpec};
pub use matcher::{JsonBody, Matcher, Mismatch};
pub use mock_server::{MockServer, RecordedRequest};
pub use pact::{Pact, PactMetadata, Participant};
pub use verifier::{
    InteractionResult, NoProviderStates, ProviderStateHandler, ProviderVerifier,
    VerificationReport,
};
