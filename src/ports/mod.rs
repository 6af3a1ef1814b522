//! Ports consumed by the checkout use cases.
//! Storage and payment collaborators are reached only through these traits.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    CardDetails, Customer, Delivery, DeliveryDetails, LegalAcceptances, NewCustomer,
    NewOrderTransaction, OrderTransaction, PaymentCompletion, PaymentStatus, Product,
    TransactionStatus,
};
use crate::gateway::{GatewayError, GatewayTransaction};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Customer>>;
    async fn create(&self, customer: &NewCustomer) -> RepositoryResult<Customer>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list(&self) -> RepositoryResult<Vec<Product>>;
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Product>>;
    /// Adds `delta` to the product's stock; negative values decrement it.
    /// Fails with `InsufficientStock`, leaving stock untouched, if the result would be negative.
    async fn update_stock(&self, id: Uuid, delta: i32) -> RepositoryResult<()>;
}

#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    async fn insert(&self, details: &DeliveryDetails, fee: &BigDecimal) -> RepositoryResult<Delivery>;
}

#[async_trait]
pub trait TransactionStatusRepository: Send + Sync {
    async fn find_by_name(&self, name: PaymentStatus) -> RepositoryResult<Option<TransactionStatus>>;
}

#[async_trait]
pub trait OrderTransactionRepository: Send + Sync {
    async fn insert(&self, transaction: &NewOrderTransaction) -> RepositoryResult<OrderTransaction>;
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<OrderTransaction>>;
    /// Marks a `PENDING` transaction as being charged. Returns `false` when it is
    /// already claimed or no longer `PENDING`; only the caller that gets `true` may charge.
    async fn claim_pending(&self, id: Uuid) -> RepositoryResult<bool>;
    /// Drops the charge claim of a still `PENDING` transaction.
    async fn release_claim(&self, id: Uuid) -> RepositoryResult<()>;
    /// Atomically moves a `PENDING` transaction to its terminal outcome. When the
    /// completion consumes stock, the product is decremented by the order quantity in
    /// the same write and the order's product snapshot takes the remaining stock.
    /// Returns `None` when the transaction is no longer `PENDING`, and
    /// `InsufficientStock` (with nothing written) when the catalog cannot cover it.
    async fn complete_pending(
        &self,
        id: Uuid,
        completion: &PaymentCompletion,
    ) -> RepositoryResult<Option<OrderTransaction>>;
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Fresh legal acceptances; fails if the gateway does not issue both.
    async fn acceptances(&self) -> Result<LegalAcceptances, GatewayError>;

    /// Charges the card for the transaction and waits for a terminal gateway status.
    async fn pay(
        &self,
        transaction: &OrderTransaction,
        card: &CardDetails,
    ) -> Result<GatewayTransaction, GatewayError>;
}

/// The storage ports the order flow needs, bundled for wiring.
#[derive(Clone)]
pub struct CheckoutRepositories {
    pub customers: Arc<dyn CustomerRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub deliveries: Arc<dyn DeliveryRepository>,
    pub statuses: Arc<dyn TransactionStatusRepository>,
    pub transactions: Arc<dyn OrderTransactionRepository>,
}
