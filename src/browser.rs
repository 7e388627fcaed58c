//! Customer lookups by numeric id
//!
//! [`CustomerBrowser::find_by_id`] never blocks: it starts the request on the
//! async runtime and hands back a [`CustomerLookup`], which can be awaited,
//! given a continuation, waited on from a plain thread, or cancelled.
//!
//! Status mapping:
//! - 200-299: the body must parse as a [`Customer`], otherwise the lookup fails
//!   with [`ClientError::SchemaViolation`]
//! - anything else, 404 included: `Ok(None)`
//!
//! Server errors (5xx) are reported as absence too. Callers that must tell a
//! missing customer from a failing provider should look at the logs or use the
//! [`Transport`] directly.

use crate::config::{ClientConfig, APPLICATION_JSON, CUSTOMERS_RESOURCE};
use crate::customer::Customer;
use crate::error::{ClientError, Result};
use crate::transport::{HttpTransport, Transport, TransportResponse};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Retrieve customers by id
pub trait CustomerBrowser: Send + Sync {
    /// Start looking up the customer identified by `id`
    ///
    /// The returned handle resolves to `Ok(Some(customer))`, `Ok(None)` when
    /// the service does not report the customer, or an error when the lookup
    /// itself failed.
    fn find_by_id(&self, id: i64) -> CustomerLookup;
}

/// Outcome of [`CustomerLookup::cancel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The pending request was aborted; awaiting the lookup yields
    /// [`ClientError::Cancelled`]
    Cancelled,
    /// The lookup had already finished and keeps its outcome
    AlreadyCompleted,
}

/// [`CustomerBrowser`] issuing `GET {base}/customers/{id}` through a shared transport
pub struct DefaultCustomerBrowser<T: Transport + ?Sized = HttpTransport> {
    transport: Arc<T>,
    base_url: String,
    runtime: Option<Handle>,
    timeout: Option<Duration>,
}

impl DefaultCustomerBrowser<HttpTransport> {
    /// Browser for the service at `host:port` with default timeouts
    ///
    /// # Errors
    ///
    /// Returns an error if the host/port pair is invalid or the HTTP client
    /// cannot be built.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::from_config(&ClientConfig::new(host, port))
    }

    /// Browser built from a full client configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }
}

impl<T: Transport + ?Sized + 'static> DefaultCustomerBrowser<T> {
    /// Browser using an injected transport
    ///
    /// The transport is shared by every lookup issued through this browser.
    pub fn with_transport(config: &ClientConfig, transport: Arc<T>) -> Self {
        Self {
            transport,
            base_url: config.base_url(),
            runtime: None,
            timeout: None,
        }
    }

    /// Run lookups on a specific runtime instead of the caller's current one
    #[must_use]
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Fail lookups that take longer than `timeout`
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// URL requested for `id`
    #[must_use]
    pub fn customer_url(&self, id: i64) -> String {
        format!("{}/{CUSTOMERS_RESOURCE}/{id}", self.base_url)
    }

    /// Look `id` up on the current task instead of spawning
    ///
    /// # Errors
    ///
    /// Same failures as awaiting [`CustomerBrowser::find_by_id`], minus
    /// cancellation.
    pub async fn lookup(&self, id: i64) -> Result<Option<Customer>> {
        let url = self.customer_url(id);
        with_deadline(id, self.timeout, fetch_customer(self.transport.as_ref(), id, &url)).await
    }

    fn runtime(&self) -> Option<Handle> {
        self.runtime.clone().or_else(|| Handle::try_current().ok())
    }
}

impl<T: Transport + ?Sized + 'static> CustomerBrowser for DefaultCustomerBrowser<T> {
    fn find_by_id(&self, id: i64) -> CustomerLookup {
        let Some(runtime) = self.runtime() else {
            return CustomerLookup::failed(
                id,
                ClientError::NoRuntime(
                    "find_by_id needs a tokio runtime; call it inside one or use with_runtime"
                        .to_string(),
                ),
            );
        };

        let transport = Arc::clone(&self.transport);
        let url = self.customer_url(id);
        let timeout = self.timeout;
        let handle = runtime.spawn(async move {
            with_deadline(id, timeout, fetch_customer(transport.as_ref(), id, &url)).await
        });

        CustomerLookup {
            id,
            runtime: Some(runtime),
            state: LookupState::Pending(handle),
            cancelled: AtomicBool::new(false),
        }
    }
}

impl<T: Transport + ?Sized> fmt::Debug for DefaultCustomerBrowser<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultCustomerBrowser")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Deferred result of a single lookup
///
/// Await it (it is a [`Future`]), attach a continuation with
/// [`on_complete`](Self::on_complete), block on it with [`wait`](Self::wait),
/// or abort it with [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct CustomerLookup {
    id: i64,
    runtime: Option<Handle>,
    state: LookupState,
    cancelled: AtomicBool,
}

#[derive(Debug)]
enum LookupState {
    Pending(JoinHandle<Result<Option<Customer>>>),
    Failed(Option<ClientError>),
}

impl CustomerLookup {
    fn failed(id: i64, err: ClientError) -> Self {
        Self {
            id,
            runtime: None,
            state: LookupState::Failed(Some(err)),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Id this lookup was issued for
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// Whether the outcome is available without waiting
    #[must_use]
    pub fn is_finished(&self) -> bool {
        match &self.state {
            LookupState::Pending(handle) => handle.is_finished(),
            LookupState::Failed(_) => true,
        }
    }

    /// Abort the pending request
    ///
    /// Once this returns [`CancelOutcome::Cancelled`], awaiting the lookup
    /// yields [`ClientError::Cancelled`], even if the request finished between
    /// the check and the abort.
    pub fn cancel(&self) -> CancelOutcome {
        if self.cancelled.load(Ordering::SeqCst) {
            return CancelOutcome::Cancelled;
        }
        match &self.state {
            LookupState::Pending(handle) if !handle.is_finished() => {
                self.cancelled.store(true, Ordering::SeqCst);
                handle.abort();
                debug!(id = self.id, "Lookup cancelled");
                CancelOutcome::Cancelled
            }
            _ => CancelOutcome::AlreadyCompleted,
        }
    }

    /// Run `callback` with the outcome once it is available
    ///
    /// The callback runs on the runtime that carries the request. The returned
    /// handle completes after the callback has run.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoRuntime`] when the lookup never started because
    /// no runtime was available.
    pub fn on_complete<F>(self, callback: F) -> Result<JoinHandle<()>>
    where
        F: FnOnce(Result<Option<Customer>>) + Send + 'static,
    {
        let runtime = self.runtime.clone();
        match runtime {
            Some(runtime) => Ok(runtime.spawn(async move { callback(self.await) })),
            None => Err(ClientError::NoRuntime(
                "lookup has no runtime to run its continuation on".to_string(),
            )),
        }
    }

    /// Block the calling thread until the outcome is available
    ///
    /// Must be called from a plain thread, not from inside an async task:
    /// blocking a runtime worker can stall the request it is waiting for.
    ///
    /// # Errors
    ///
    /// Same failures as awaiting the lookup.
    pub fn wait(self) -> Result<Option<Customer>> {
        futures::executor::block_on(self)
    }
}

impl Future for CustomerLookup {
    type Output = Result<Option<Customer>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let id = this.id;
        let cancelled = this.cancelled.load(Ordering::SeqCst);
        match &mut this.state {
            LookupState::Pending(handle) => Pin::new(handle).poll(cx).map(|joined| match joined {
                Ok(_) if cancelled => Err(ClientError::Cancelled),
                Ok(outcome) => outcome,
                Err(err) if err.is_cancelled() => Err(ClientError::Cancelled),
                Err(err) => Err(ClientError::Internal(format!(
                    "lookup task for customer {id} failed: {err}"
                ))),
            }),
            LookupState::Failed(err) => Poll::Ready(Err(err.take().unwrap_or_else(|| {
                ClientError::Internal("lookup polled after completion".to_string())
            }))),
        }
    }
}

async fn with_deadline<F>(id: i64, timeout: Option<Duration>, lookup: F) -> Result<Option<Customer>>
where
    F: Future<Output = Result<Option<Customer>>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, lookup).await.unwrap_or_else(|_| {
            Err(ClientError::Timeout(format!(
                "lookup of customer {id} exceeded {}ms",
                limit.as_millis()
            )))
        }),
        None => lookup.await,
    }
}

async fn fetch_customer<T: Transport + ?Sized>(
    transport: &T,
    id: i64,
    url: &str,
) -> Result<Option<Customer>> {
    let headers = [("Accept".to_string(), APPLICATION_JSON.to_string())];
    let response = transport.get(url, &headers).await?;
    customer_from_response(id, &response)
}

fn customer_from_response(id: i64, response: &TransportResponse) -> Result<Option<Customer>> {
    if response.is_success() {
        return Customer::from_json(&response.body)
            .map(Some)
            .map_err(|e| ClientError::SchemaViolation {
                status: response.status,
                reason: e.to_string(),
            });
    }

    if response.status == 404 {
        debug!(id, "Customer not found");
    } else {
        warn!(
            id,
            status = response.status,
            "Non-success status reported as absent customer"
        );
    }
    Ok(None)
}
