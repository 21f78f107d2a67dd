use std::collections::HashMap;

use parking_lot::RwLock;

use crate::domain::{Customer, CustomerId};

use super::StoreError;

/// Where customer profiles live. The ledger only needs to create, fetch and
/// search them.
pub trait CustomerDirectory: Send + Sync {
    fn create(&self, name: &str, email: &str) -> Result<CustomerId, StoreError>;

    fn get(&self, id: CustomerId) -> Result<Customer, StoreError>;

    /// Customers whose name starts with `query`, ignoring case.
    fn find_by_name_prefix(&self, query: &str) -> Vec<Customer>;

    /// Customers whose name contains `query`, ignoring case.
    fn search(&self, query: &str) -> Vec<Customer>;
}

#[derive(Debug, Default)]
pub struct InMemoryCustomerDirectory {
    customers: RwLock<HashMap<CustomerId, Customer>>,
}

impl InMemoryCustomerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching(&self, predicate: impl Fn(&Customer) -> bool) -> Vec<Customer> {
        let mut found: Vec<Customer> = self
            .customers
            .read()
            .values()
            .filter(|&customer| predicate(customer))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        found
    }
}

impl CustomerDirectory for InMemoryCustomerDirectory {
    fn create(&self, name: &str, email: &str) -> Result<CustomerId, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidCustomer(
                "Customer name cannot be empty".to_string(),
            ));
        }

        let customer = Customer::new(name, email.trim());
        let id = customer.id;
        self.customers.write().insert(id, customer);
        Ok(id)
    }

    fn get(&self, id: CustomerId) -> Result<Customer, StoreError> {
        self.customers
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::CustomerNotFound(id))
    }

    fn find_by_name_prefix(&self, query: &str) -> Vec<Customer> {
        self.matching(|customer| customer.name_starts_with(query))
    }

    fn search(&self, query: &str) -> Vec<Customer> {
        self.matching(|customer| customer.name_contains(query))
    }
}
