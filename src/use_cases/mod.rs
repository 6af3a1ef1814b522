//! Checkout use cases.

pub mod customers;
pub mod deliveries;
pub mod order_transaction;
pub mod products;

pub use customers::CustomerService;
pub use deliveries::DeliveryService;
pub use order_transaction::OrderTransactionService;
pub use products::ProductService;
