//! Mock provider answering requests from a pact
//!
//! Each request is matched against the pact's interactions. An interaction
//! whose example path equals the request path wins over one that only matches
//! by regular expression, so a single server can serve several states. Matched
//! requests get the interaction's response with example bodies; anything else
//! gets a 500 with a diagnostic body and is recorded as unexpected.

use super::interaction::Interaction;
use super::matcher::Mismatch;
use super::pact::Pact;
use crate::error::{ClientError, Result};
use crate::server::BackgroundServer;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::fmt::Write as _;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Request received by the mock server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP method
    pub method: String,
    /// Request path, without query
    pub path: String,
    /// Headers as received
    pub headers: Vec<(String, String)>,
}

#[derive(Debug)]
struct MockState {
    pact: Pact,
    hits: Vec<AtomicUsize>,
    unexpected: Mutex<Vec<RecordedRequest>>,
}

impl MockState {
    fn find(&self, request: &RecordedRequest) -> Option<(usize, &Interaction)> {
        let candidates: Vec<(usize, &Interaction)> = self
            .pact
            .interactions
            .iter()
            .enumerate()
            .filter(|(_, interaction)| {
                interaction
                    .request
                    .mismatches(&request.method, &request.path, &request.headers)
                    .is_empty()
            })
            .collect();

        candidates
            .iter()
            .find(|(_, interaction)| interaction.request.path.example() == request.path)
            .or_else(|| candidates.first())
            .copied()
    }
}

/// Mock provider built from a [`Pact`]
#[derive(Debug)]
pub struct MockServer {
    server: BackgroundServer,
    state: Arc<MockState>,
}

impl MockServer {
    /// Serve `pact` on an ephemeral localhost port
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidMatcher`] for an unusable pact and
    /// [`ClientError::MockServer`] if no port can be bound.
    pub async fn start(pact: Pact) -> Result<Self> {
        Self::start_on(pact, SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).await
    }

    /// Serve `pact` on a specific address
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidMatcher`] if an interaction carries an
    /// unusable pattern, and [`ClientError::MockServer`] if the address cannot
    /// be bound.
    pub async fn start_on(pact: Pact, address: SocketAddr) -> Result<Self> {
        pact.validate()?;
        let hits = pact
            .interactions
            .iter()
            .map(|_| AtomicUsize::new(0))
            .collect();
        let state = Arc::new(MockState {
            pact,
            hits,
            unexpected: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .fallback(answer)
            .with_state(Arc::clone(&state));
        let server = BackgroundServer::start("mock-server", address, app).await?;

        debug!(
            url = %server.url(),
            interactions = state.pact.interactions.len(),
            "Mock server ready"
        );
        Ok(Self { server, state })
    }

    /// `http://127.0.0.1:port`
    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Bound address
    #[must_use]
    pub const fn address(&self) -> SocketAddr {
        self.server.address()
    }

    /// Bound IP as text, for clients configured by host and port
    #[must_use]
    pub fn host(&self) -> String {
        self.address().ip().to_string()
    }

    /// Bound port
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.server.address().port()
    }

    /// Pact being served
    #[must_use]
    pub fn pact(&self) -> &Pact {
        &self.state.pact
    }

    /// How many times each interaction was matched, by description
    #[must_use]
    pub fn hits(&self) -> Vec<(String, usize)> {
        self.state
            .pact
            .interactions
            .iter()
            .zip(&self.state.hits)
            .map(|(interaction, hits)| (interaction.description.clone(), hits.load(Ordering::SeqCst)))
            .collect()
    }

    /// Requests that matched no interaction
    pub async fn unexpected_requests(&self) -> Vec<RecordedRequest> {
        self.state.unexpected.lock().await.clone()
    }

    /// Check that every interaction was exercised and nothing else was requested
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::VerificationFailed`] listing missed interactions
    /// and unexpected requests.
    pub async fn verify(&self) -> Result<()> {
        let mut failures = 0;
        let mut summary = String::new();

        for (description, hits) in self.hits() {
            if hits == 0 {
                failures += 1;
                let _ = writeln!(summary, "  - interaction never requested: {description}");
            }
        }
        for request in self.unexpected_requests().await {
            failures += 1;
            let _ = writeln!(
                summary,
                "  - unexpected request: {} {}",
                request.method, request.path
            );
        }

        if failures == 0 {
            Ok(())
        } else {
            Err(ClientError::VerificationFailed { failures, summary })
        }
    }

    /// Stop the server
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MockServer`] if the server task failed.
    pub async fn shutdown(self) -> Result<()> {
        self.server.shutdown().await
    }
}

async fn answer(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let request = RecordedRequest {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        headers: headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect(),
    };

    if let Some((index, interaction)) = state.find(&request) {
        if let Some(hits) = state.hits.get(index) {
            let _ = hits.fetch_add(1, Ordering::SeqCst);
        }
        debug!(
            method = %request.method,
            path = %request.path,
            interaction = %interaction.description,
            "Matched interaction"
        );
        return respond(interaction);
    }

    let diagnostics = closest_mismatches(&state.pact, &request);
    warn!(method = %request.method, path = %request.path, "Unexpected request");
    state.unexpected.lock().await.push(request.clone());

    let body = serde_json::json!({
        "error": "Unexpected request",
        "method": request.method,
        "path": request.path,
        "mismatches": diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>(),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
}

fn closest_mismatches(pact: &Pact, request: &RecordedRequest) -> Vec<Mismatch> {
    pact.interactions
        .iter()
        .map(|interaction| {
            interaction
                .request
                .mismatches(&request.method, &request.path, &request.headers)
        })
        .min_by_key(Vec::len)
        .unwrap_or_default()
}

fn respond(interaction: &Interaction) -> Response {
    let spec = &interaction.response;
    let mut builder = axum::http::Response::builder().status(spec.status);
    for (name, value) in &spec.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let body = spec
        .body
        .as_ref()
        .map_or_else(Body::empty, |body| Body::from(body.example().to_string()));

    builder.body(body).unwrap_or_else(|err| {
        warn!(error = %err, "Invalid response in interaction");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::contract::{JsonBody, PathMatcher};
    use crate::transport::{HttpTransport, Transport};

    fn pact() -> Pact {
        Pact::new("Consumer", "Provider")
            .with_interaction(
                Interaction::given("present")
                    .upon_receiving("existing")
                    .match_path(r"/items/\d+", "/items/1")
                    .will_respond_with(200)
                    .response_header("Content-Type", "application/json")
                    .body(JsonBody::new().string_type("name", "widget"))
                    .build()
                    .unwrap(),
            )
            .with_interaction(
                Interaction::given("absent")
                    .upon_receiving("missing")
                    .match_path(r"/items/\d+", "/items/2")
                    .will_respond_with(404)
                    .build()
                    .unwrap(),
            )
    }

    #[tokio::test]
    async fn test_serves_examples_and_prefers_exact_example_path() {
        let server = MockServer::start(pact()).await.unwrap();
        let transport = HttpTransport::new().unwrap();

        let found = transport.get(&format!("{}/items/1", server.url()), &[]).await.unwrap();
        assert_eq!(found.status, 200);
        assert_eq!(found.header("content-type"), Some("application/json"));
        assert_eq!(found.body, r#"{"name":"widget"}"#);

        let missing = transport.get(&format!("{}/items/2", server.url()), &[]).await.unwrap();
        assert_eq!(missing.status, 404);
        assert!(missing.body.is_empty());

        // Matches both by regex; the first declared interaction answers.
        let other = transport.get(&format!("{}/items/77", server.url()), &[]).await.unwrap();
        assert_eq!(other.status, 200);

        assert_eq!(
            server.hits(),
            vec![("existing".to_string(), 2), ("missing".to_string(), 1)]
        );
        server.verify().await.unwrap();
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unexpected_requests_fail_verification() {
        let server = MockServer::start(pact().for_state("present")).await.unwrap();
        let transport = HttpTransport::new().unwrap();

        let response = transport
            .get(&format!("{}/other/1", server.url()), &[])
            .await
            .unwrap();
        assert_eq!(response.status, 500);
        assert!(response.body.contains("Unexpected request"));

        let unexpected = server.unexpected_requests().await;
        assert_eq!(unexpected.len(), 1);
        assert_eq!(unexpected[0].path, "/other/1");

        let err = server.verify().await.unwrap_err();
        assert!(matches!(err, ClientError::VerificationFailed { failures: 2, .. }));
    }

    #[tokio::test]
    async fn test_refuses_pact_with_unusable_path_regex() {
        let mut pact = pact();
        pact.interactions[1].request.path = PathMatcher::Regex {
            regex: "/items/[".to_string(),
            example: "/items/2".to_string(),
        };

        let err = MockServer::start(pact).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidMatcher { .. }));
    }

    #[tokio::test]
    async fn test_host_and_port() {
        let server = MockServer::start(pact()).await.unwrap();
        assert_eq!(server.host(), "127.0.0.1");
        assert_ne!(server.port(), 0);
        assert_eq!(server.url(), format!("http://127.0.0.1:{}", server.port()));
    }
}
