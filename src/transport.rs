//! HTTP transport used by the customer browser
//!
//! One shared client instance serves every lookup. The transport executes a
//! single GET and hands back status, headers and text body untouched; it
//! never retries and never follows redirects.

use crate::config::{defaults, ClientConfig};
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use reqwest::{redirect, Client, ClientBuilder};
use std::time::Duration;
use tracing::debug;

/// Raw response returned by a [`Transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers in arrival order, names lower-cased
    pub headers: Vec<(String, String)>,
    /// Response body decoded as text
    pub body: String,
}

impl TransportResponse {
    /// Whether the status is in the inclusive range 200-299
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }

    /// First value of a header, looked up case-insensitively
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Asynchronous GET executor
///
/// Implementations must be safe to share between concurrent lookups.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue exactly one GET request to `url` with the given headers
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<TransportResponse>;
}

/// [`Transport`] backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with default timeouts
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a transport using the timeouts of a client configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::builder()
            .connect_timeout(config.connect_timeout())
            .request_timeout(config.timeout())
            .build()
    }

    /// Create a new builder
    #[must_use]
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Wrap an existing reqwest client
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<TransportResponse> {
        debug!(url, "Issuing GET");

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().await?;

        debug!(url, status, bytes = body.len(), "Received response");
        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Builder for [`HttpTransport`]
#[derive(Debug)]
pub struct HttpTransportBuilder {
    builder: ClientBuilder,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            builder: Client::builder()
                .user_agent(defaults::USER_AGENT)
                .redirect(redirect::Policy::none())
                .tcp_nodelay(true)
                .connect_timeout(Duration::from_secs(defaults::default_connect_timeout()))
                .timeout(Duration::from_secs(defaults::default_timeout())),
        }
    }
}

impl HttpTransportBuilder {
    /// Set a custom user agent
    #[must_use]
    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.builder = self.builder.user_agent(user_agent);
        self
    }

    /// Set connection timeout
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.connect_timeout(timeout);
        self
    }

    /// Set whole-request timeout
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.timeout(timeout);
        self
    }

    /// Build the transport
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be built.
    pub fn build(self) -> Result<HttpTransport> {
        self.builder
            .build()
            .map(HttpTransport::with_client)
            .map_err(|e| ClientError::Internal(format!("Failed to create HTTP client: {e}")))
    }
}
