//! Consumer and provider sides of the customer-service pact

#![allow(clippy::unwrap_used, clippy::panic)]

use customer_contract::contract::fixtures::{
    self, EXISTING_CUSTOMER_ID, EXISTING_CUSTOMER_STATE, NON_EXISTENT_CUSTOMER_ID,
    NON_EXISTENT_CUSTOMER_STATE,
};
use customer_contract::contract::{MockServer, Pact, ProviderVerifier};
use customer_contract::service::{
    CustomerRepository, InMemoryCustomerRepository, ProviderServer, RepositoryStates,
    StoredCustomer,
};
use customer_contract::{
    ClientError, Customer, CustomerBrowser, DefaultCustomerBrowser, HttpTransport, Transport,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

async fn mock_for_state(state: &str) -> MockServer {
    let pact = fixtures::customer_service_pact().unwrap().for_state(state);
    MockServer::start(pact).await.unwrap()
}

fn browser_for(server: &MockServer) -> DefaultCustomerBrowser {
    DefaultCustomerBrowser::new(server.host(), server.port()).unwrap()
}

async fn start_provider(repository: Arc<dyn CustomerRepository>) -> ProviderServer {
    ProviderServer::start(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)), repository)
        .await
        .unwrap()
}

fn transport() -> Arc<dyn Transport> {
    Arc::new(HttpTransport::new().unwrap())
}

#[tokio::test]
async fn test_existing_customer_is_found() {
    let server = mock_for_state(EXISTING_CUSTOMER_STATE).await;

    let customer = browser_for(&server)
        .find_by_id(EXISTING_CUSTOMER_ID)
        .await
        .unwrap();

    assert_eq!(customer, Some(Customer::new("Test", "First")));
    server.verify().await.unwrap();
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_non_existent_customer_is_absent() {
    let server = mock_for_state(NON_EXISTENT_CUSTOMER_STATE).await;

    let customer = browser_for(&server)
        .find_by_id(NON_EXISTENT_CUSTOMER_ID)
        .await
        .unwrap();

    assert_eq!(customer, None);
    server.verify().await.unwrap();
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_both_states_from_one_server() {
    let server = MockServer::start(fixtures::customer_service_pact().unwrap())
        .await
        .unwrap();
    let browser = browser_for(&server);

    let (found, missing) = tokio::join!(
        browser.find_by_id(EXISTING_CUSTOMER_ID),
        browser.find_by_id(NON_EXISTENT_CUSTOMER_ID)
    );

    assert_eq!(found.unwrap().unwrap().full_name(), "Test First");
    assert_eq!(missing.unwrap(), None);
    assert!(server.hits().iter().all(|(_, hits)| *hits == 1));
    server.verify().await.unwrap();
}

#[tokio::test]
async fn test_unexercised_interaction_fails_verification() {
    let server = MockServer::start(fixtures::customer_service_pact().unwrap())
        .await
        .unwrap();

    let _ = browser_for(&server)
        .find_by_id(EXISTING_CUSTOMER_ID)
        .await
        .unwrap();

    match server.verify().await {
        Err(ClientError::VerificationFailed { failures, summary }) => {
            assert_eq!(failures, 1);
            assert!(summary.contains(fixtures::NON_EXISTENT_CUSTOMER_REQUEST));
        }
        other => panic!("expected verification failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_request_outside_contract_is_recorded() {
    let server = mock_for_state(EXISTING_CUSTOMER_STATE).await;

    let response = transport()
        .get(&format!("{}/orders/1", server.url()), &[])
        .await
        .unwrap();

    assert_eq!(response.status, 500);
    let unexpected = server.unexpected_requests().await;
    assert_eq!(unexpected.len(), 1);
    assert_eq!(unexpected[0].path, "/orders/1");
    assert!(server.verify().await.is_err());
}

#[tokio::test]
async fn test_written_pact_serves_the_same_contract() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixtures::customer_service_pact()
        .unwrap()
        .write_to_dir(dir.path())
        .unwrap();
    assert!(path.ends_with("AndroidClient-CustomerService.json"));

    let pact = Pact::load(&path).unwrap();
    let server = MockServer::start(pact.for_state(EXISTING_CUSTOMER_STATE))
        .await
        .unwrap();

    let customer = browser_for(&server).find_by_id(42).await.unwrap();

    assert_eq!(customer, Some(Customer::new("Test", "First")));
}

#[tokio::test]
async fn test_reference_provider_honours_pact() {
    let repository: Arc<dyn CustomerRepository> = Arc::new(InMemoryCustomerRepository::new());
    let provider = start_provider(Arc::clone(&repository)).await;
    let pact = fixtures::customer_service_pact().unwrap();

    let report = ProviderVerifier::new(provider.url(), transport())
        .with_state_handler(Arc::new(RepositoryStates::new(repository)))
        .verify(&pact)
        .await;

    assert!(report.is_success(), "{}", report.summary());
    assert_eq!(report.results.len(), 2);
    provider.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_provider_breaking_the_contract_is_reported() {
    let repository: Arc<dyn CustomerRepository> = Arc::new(InMemoryCustomerRepository::new());
    let _ = repository
        .save(StoredCustomer::new(EXISTING_CUSTOMER_ID, "test", "first"))
        .await
        .unwrap();
    let provider = start_provider(repository).await;
    let pact = fixtures::customer_service_pact()
        .unwrap()
        .for_state(EXISTING_CUSTOMER_STATE);

    let report = ProviderVerifier::new(provider.url(), transport())
        .verify(&pact)
        .await;

    assert!(!report.is_success());
    let failed: Vec<_> = report.failures().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].mismatches.len(), 2);
    assert!(matches!(
        report.into_result(),
        Err(ClientError::VerificationFailed { failures: 1, .. })
    ));
}

#[tokio::test]
async fn test_mock_server_satisfies_its_own_pact() {
    let pact = fixtures::customer_service_pact().unwrap();
    let server = MockServer::start(pact.clone()).await.unwrap();

    let report = ProviderVerifier::new(server.url(), transport())
        .verify(&pact)
        .await;

    assert!(report.is_success(), "{}", report.summary());
    server.verify().await.unwrap();
}

#[tokio::test]
async fn test_pact_with_unusable_regex_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let mut document =
        serde_json::to_value(fixtures::customer_service_pact().unwrap()).unwrap();
    document["interactions"][0]["request"]["path"]["regex"] = "/customers/[".into();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, document.to_string()).unwrap();

    assert!(matches!(
        Pact::load(&path),
        Err(ClientError::InvalidMatcher { .. })
    ));
}
