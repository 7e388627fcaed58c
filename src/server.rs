//! Background HTTP server shared by the mock server and the reference provider

use crate::error::{ClientError, Result};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// An axum router served on its own task until shut down or dropped
#[derive(Debug)]
pub struct BackgroundServer {
    name: &'static str,
    address: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl BackgroundServer {
    /// Bind `address` and start serving `app`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MockServer`] when the address cannot be bound.
    pub async fn start(name: &'static str, address: SocketAddr, app: Router) -> Result<Self> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| ClientError::MockServer(format!("{name}: failed to bind {address}: {e}")))?;
        let address = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(err) = served {
                warn!(server = name, error = %err, "Server stopped with error");
            }
        });

        info!(server = name, %address, "Listening");
        Ok(Self {
            name,
            address,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// Bound socket address
    #[must_use]
    pub const fn address(&self) -> SocketAddr {
        self.address
    }

    /// `http://ip:port`
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.address)
    }

    /// Stop accepting connections and wait for the server task to finish
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MockServer`] if the server task panicked.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| ClientError::MockServer(format!("{}: task failed: {e}", self.name)))?;
        }
        info!(server = self.name, address = %self.address, "Stopped");
        Ok(())
    }
}

impl Drop for BackgroundServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
