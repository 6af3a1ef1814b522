use thiserror::Error;
use uuid::Uuid;

use crate::domain::AcceptanceKind;
use crate::gateway::GatewayError;
use crate::ports::RepositoryError;

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("Product stock not available for {product_id}: requested {requested}, available {available}")]
    ProductStockNotAvailable {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Customer already exists: {0}")]
    CustomerAlreadyExists(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    #[error("Transaction already finished: {0}")]
    TransactionAlreadyFinished(Uuid),

    #[error("Transaction status not seeded: {0}")]
    StatusNotSeeded(String),

    #[error("Missing legal acceptance: {0}")]
    MissingAcceptance(AcceptanceKind),

    #[error("Payment {gateway_transaction_id} still pending after {attempts} status checks")]
    PaymentTimedOut {
        gateway_transaction_id: String,
        attempts: u32,
    },

    #[error("Payment gateway error: {0}")]
    Gateway(GatewayError),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CheckoutError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::InsufficientStock {
                product_id,
                requested,
                available,
            } => CheckoutError::ProductStockNotAvailable {
                product_id,
                requested,
                available,
            },
            other => CheckoutError::Repository(other),
        }
    }
}

impl From<GatewayError> for CheckoutError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::MissingAcceptance(kind) => CheckoutError::MissingAcceptance(kind),
            GatewayError::PaymentTimedOut {
                gateway_transaction_id,
                attempts,
            } => CheckoutError::PaymentTimedOut {
                gateway_transaction_id,
                attempts,
            },
            other => CheckoutError::Gateway(other),
        }
    }
}

pub type CheckoutResult<T> = Result<T, CheckoutError>;
