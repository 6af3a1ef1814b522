//! Customer registration and lookup.

use std::sync::Arc;

use crate::domain::{Customer, NewCustomer};
use crate::error::{CheckoutError, CheckoutResult};
use crate::ports::CustomerRepository;

pub struct CustomerService {
    customer_repository: Arc<dyn CustomerRepository>,
}

impl CustomerService {
    pub fn new(customer_repository: Arc<dyn CustomerRepository>) -> Self {
        Self {
            customer_repository,
        }
    }

    /// Returns the customer registered under `customer.email`, creating it when absent.
    pub async fn resolve(&self, customer: &NewCustomer) -> CheckoutResult<Customer> {
        if let Some(existing) = self
            .customer_repository
            .find_by_email(&customer.email)
            .await?
        {
            return Ok(existing);
        }

        let created = self.customer_repository.create(customer).await?;
        tracing::info!(customer_id = %created.id, "Customer created");
        Ok(created)
    }

    /// Registers a new customer; the email must not be on file yet.
    pub async fn register(&self, customer: &NewCustomer) -> CheckoutResult<Customer> {
        if self
            .customer_repository
            .find_by_email(&customer.email)
            .await?
            .is_some()
        {
            return Err(CheckoutError::CustomerAlreadyExists(customer.email.clone()));
        }

        Ok(self.customer_repository.create(customer).await?)
    }
}
