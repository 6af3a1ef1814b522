//! Checkout domain entities.
//! Framework-agnostic types shared by the use cases, ports and adapters.

pub mod acceptance;
pub mod card;
pub mod customer;
pub mod delivery;
pub mod order_transaction;
pub mod product;
pub mod status;

pub use acceptance::{Acceptance, AcceptanceKind, LegalAcceptances};
pub use card::CardDetails;
pub use customer::{Customer, NewCustomer};
pub use delivery::{Delivery, DeliveryDetails};
pub use order_transaction::{
    NewOrderTransaction, OrderReceipt, OrderRequest, OrderTransaction, PaymentCompletion,
};
pub use product::Product;
pub use status::{PaymentStatus, TransactionStatus};
