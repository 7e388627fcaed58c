//! Customer storage for the reference provider

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Customer as stored and served by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCustomer {
    /// Primary key
    pub id: i64,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
}

impl StoredCustomer {
    /// Create a stored customer
    pub fn new(id: i64, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

/// Async customer storage
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Customer with `id`, if stored
    async fn find_by_id(&self, id: i64) -> Result<Option<StoredCustomer>>;

    /// Insert or replace a customer
    async fn save(&self, customer: StoredCustomer) -> Result<StoredCustomer>;

    /// Every stored customer, ordered by id
    async fn find_all(&self) -> Result<Vec<StoredCustomer>>;

    /// Remove every customer
    async fn clear(&self) -> Result<()>;
}

/// Process-local [`CustomerRepository`]
#[derive(Debug, Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<i64, StoredCustomer>>,
}

impl InMemoryCustomerRepository {
    /// Empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<StoredCustomer>> {
        Ok(self.customers.read().await.get(&id).cloned())
    }

    async fn save(&self, customer: StoredCustomer) -> Result<StoredCustomer> {
        let _ = self
            .customers
            .write()
            .await
            .insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn find_all(&self) -> Result<Vec<StoredCustomer>> {
        let mut all: Vec<StoredCustomer> = self.customers.read().await.values().cloned().collect();
        all.sort_by_key(|customer| customer.id);
        Ok(all)
    }

    async fn clear(&self) -> Result<()> {
        self.customers.write().await.clear();
        Ok(())
    }
}
