pub mod adapters;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod ports;
pub mod pricing;
pub mod startup;
pub mod use_cases;

pub use error::{CheckoutError, CheckoutResult};
pub use use_cases::OrderTransactionService;
