//! Customer lookups against a stubbed HTTP provider

#![allow(clippy::unwrap_used)]

use customer_contract::{
    CancelOutcome, ClientConfig, ClientError, Customer, CustomerBrowser, DefaultCustomerBrowser,
};
use std::sync::mpsc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn browser_for(server: &MockServer) -> DefaultCustomerBrowser {
    let address = server.address();
    DefaultCustomerBrowser::new(address.ip().to_string(), address.port()).unwrap()
}

async fn respond(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_found_customer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/customers/1234"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 1234,
            "firstName": "Test",
            "lastName": "First"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let customer = browser_for(&server).find_by_id(1234).await.unwrap();

    assert_eq!(customer, Some(Customer::new("Test", "First")));
}

#[tokio::test]
async fn test_not_found_is_absent() {
    let server = MockServer::start().await;
    respond(&server, "/customers/112233", ResponseTemplate::new(404)).await;

    let customer = browser_for(&server).find_by_id(112_233).await.unwrap();

    assert_eq!(customer, None);
}

#[tokio::test]
async fn test_server_error_is_absent() {
    let server = MockServer::start().await;
    respond(
        &server,
        "/customers/7",
        ResponseTemplate::new(503).set_body_string("maintenance"),
    )
    .await;

    assert_eq!(browser_for(&server).find_by_id(7).await.unwrap(), None);
}

#[tokio::test]
async fn test_any_2xx_is_parsed() {
    let server = MockServer::start().await;
    respond(
        &server,
        "/customers/5",
        ResponseTemplate::new(203).set_body_json(serde_json::json!({
            "firstName": "Ada",
            "lastName": "Lovelace"
        })),
    )
    .await;

    let customer = browser_for(&server).find_by_id(5).await.unwrap().unwrap();

    assert_eq!(customer.full_name(), "Ada Lovelace");
}

#[tokio::test]
async fn test_malformed_body_is_schema_violation() {
    let server = MockServer::start().await;
    respond(
        &server,
        "/customers/1",
        ResponseTemplate::new(200).set_body_string("<html>oops</html>"),
    )
    .await;
    respond(
        &server,
        "/customers/2",
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"firstName": "Only"})),
    )
    .await;
    let browser = browser_for(&server);

    let garbage = browser.find_by_id(1).await.unwrap_err();
    let partial = browser.find_by_id(2).await.unwrap_err();

    assert!(matches!(garbage, ClientError::SchemaViolation { status: 200, .. }));
    assert!(matches!(partial, ClientError::SchemaViolation { .. }));
    assert_eq!(partial.exit_code(), 3);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let browser = DefaultCustomerBrowser::new("127.0.0.1", port).unwrap();

    let err = browser.find_by_id(1234).await.unwrap_err();

    assert!(err.is_transport(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let server = MockServer::start().await;
    respond(
        &server,
        "/customers/1234",
        ResponseTemplate::new(200).set_delay(Duration::from_secs(5)),
    )
    .await;
    let browser = browser_for(&server).with_timeout(Duration::from_millis(100));

    let err = browser.find_by_id(1234).await.unwrap_err();

    assert!(matches!(err, ClientError::Timeout(_)));
    assert_eq!(err.exit_code(), 124);
}

#[tokio::test]
async fn test_cancel_pending_lookup() {
    let server = MockServer::start().await;
    respond(
        &server,
        "/customers/1234",
        ResponseTemplate::new(200).set_delay(Duration::from_secs(5)),
    )
    .await;
    let lookup = browser_for(&server).find_by_id(1234);

    assert_eq!(lookup.cancel(), CancelOutcome::Cancelled);
    assert!(matches!(lookup.await, Err(ClientError::Cancelled)));
}

#[tokio::test]
async fn test_cancel_after_completion_keeps_outcome() {
    let server = MockServer::start().await;
    respond(&server, "/customers/9", ResponseTemplate::new(404)).await;
    let lookup = browser_for(&server).find_by_id(9);

    while !lookup.is_finished() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(lookup.cancel(), CancelOutcome::AlreadyCompleted);
    assert_eq!(lookup.await.unwrap(), None);
}

#[tokio::test]
async fn test_concurrent_lookups_are_independent() {
    let server = MockServer::start().await;
    for (id, first) in [(1, "Ann"), (2, "Bob"), (3, "Cid")] {
        respond(
            &server,
            &format!("/customers/{id}"),
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(50 * (4 - id)))
                .set_body_json(serde_json::json!({"firstName": first, "lastName": "Doe"})),
        )
        .await;
    }
    let browser = browser_for(&server);

    let lookups: Vec<_> = (1..=4).map(|id| browser.find_by_id(id)).collect();
    let outcomes = futures::future::join_all(lookups).await;

    let names: Vec<Option<String>> = outcomes
        .into_iter()
        .map(|outcome| outcome.unwrap().map(|customer| customer.first_name))
        .collect();
    assert_eq!(
        names,
        vec![
            Some("Ann".to_string()),
            Some("Bob".to_string()),
            Some("Cid".to_string()),
            None
        ]
    );
}

#[tokio::test]
async fn test_on_complete_continuation() {
    let server = MockServer::start().await;
    respond(
        &server,
        "/customers/1234",
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({"firstName": "Test", "lastName": "First"})),
    )
    .await;
    let (tx, rx) = mpsc::channel();

    let done = browser_for(&server)
        .find_by_id(1234)
        .on_complete(move |outcome| {
            let _ = tx.send(outcome.map(|customer| customer.map(|c| c.full_name())));
        })
        .unwrap();
    done.await.unwrap();

    assert_eq!(rx.recv().unwrap().unwrap(), Some("Test First".to_string()));
}

#[test]
fn test_blocking_wait_from_plain_thread() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let server = runtime.block_on(async {
        let server = MockServer::start().await;
        respond(
            &server,
            "/customers/1234",
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"firstName": "Test", "lastName": "First"})),
        )
        .await;
        server
    });
    let address = server.address();
    let config = ClientConfig::new(address.ip().to_string(), address.port());
    let browser = DefaultCustomerBrowser::from_config(&config)
        .unwrap()
        .with_runtime(runtime.handle().clone());

    let customer = browser.find_by_id(1234).wait().unwrap();

    assert_eq!(customer, Some(Customer::new("Test", "First")));
}

#[test]
fn test_lookup_without_runtime_fails() {
    let browser = DefaultCustomerBrowser::new("localhost", 8080).unwrap();

    let lookup = browser.find_by_id(1);
    assert!(lookup.is_finished());
    assert!(matches!(lookup.wait(), Err(ClientError::NoRuntime(_))));

    let continuation = browser.find_by_id(1).on_complete(|_| {});
    assert!(matches!(continuation, Err(ClientError::NoRuntime(_))));
}
