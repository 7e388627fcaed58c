//! Reference customer service
//!
//! The provider side of the contract: `GET /customers/{id}` answers 200 with
//! the stored customer as JSON, or 404 with an empty body. Used to verify the
//! pact in-process and by the `serve` command.

use crate::contract::fixtures::{
    EXISTING_CUSTOMER_ID, EXISTING_CUSTOMER_STATE, NON_EXISTENT_CUSTOMER_STATE,
};
use crate::contract::ProviderStateHandler;
use crate::error::{ClientError, Result};
use crate::server::BackgroundServer;
use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

pub mod repository;

pub use repository::{CustomerRepository, InMemoryCustomerRepository, StoredCustomer};

/// Router serving `/customers/{id}` from `repository`
pub fn router(repository: Arc<dyn CustomerRepository>) -> Router {
    Router::new()
        .route("/customers/{id}", get(get_customer))
        .with_state(repository)
}

async fn get_customer(
    State(repository): State<Arc<dyn CustomerRepository>>,
    Path(id): Path<i64>,
) -> Response {
    match repository.find_by_id(id).await {
        Ok(Some(customer)) => {
            debug!(id, "Customer found");
            Json(customer).into_response()
        }
        Ok(None) => {
            debug!(id, "Customer not found");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(err) => {
            error!(id, error = %err, "Customer lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Store customer 1234 "Test First"
///
/// # Errors
///
/// Propagates repository failures.
pub async fn seed_test_data(repository: &dyn CustomerRepository) -> Result<()> {
    let saved = repository
        .save(StoredCustomer::new(EXISTING_CUSTOMER_ID, "Test", "First"))
        .await?;
    info!(id = saved.id, "Saved customer");

    for customer in repository.find_all().await? {
        info!(
            id = customer.id,
            first_name = %customer.first_name,
            last_name = %customer.last_name,
            "Found customer"
        );
    }
    Ok(())
}

/// Running reference provider
#[derive(Debug)]
pub struct ProviderServer {
    server: BackgroundServer,
}

impl ProviderServer {
    /// Serve `repository` on `address`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MockServer`] if the address cannot be bound.
    pub async fn start(address: SocketAddr, repository: Arc<dyn CustomerRepository>) -> Result<Self> {
        let server = BackgroundServer::start("customer-service", address, router(repository)).await?;
        Ok(Self { server })
    }

    /// `http://ip:port`
    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Bound address
    #[must_use]
    pub const fn address(&self) -> SocketAddr {
        self.server.address()
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

/// Provider states for the customer-service pact, backed by a repository
#[derive(Clone)]
pub struct RepositoryStates {
    repository: Arc<dyn CustomerRepository>,
}

impl RepositoryStates {
    /// States that mutate `repository`
    pub fn new(repository: Arc<dyn CustomerRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl ProviderStateHandler for RepositoryStates {
    async fn set_up(&self, state: &str) -> Result<()> {
        match state {
            EXISTING_CUSTOMER_STATE => seed_test_data(self.repository.as_ref()).await,
            NON_EXISTENT_CUSTOMER_STATE => self.repository.clear().await,
            other => Err(ClientError::VerificationFailed {
                failures: 1,
                summary: format!("unknown provider state '{other}'"),
            }),
        }
    }
}

impl std::fmt::Debug for RepositoryStates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryStates").finish_non_exhaustive()
    }
}
