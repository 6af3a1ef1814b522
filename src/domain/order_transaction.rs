//! Order transaction aggregate.
//! An order moves from `PENDING` to exactly one terminal status, once.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    Customer, Delivery, DeliveryDetails, LegalAcceptances, NewCustomer, Product, TransactionStatus,
};

/// Prefix of the merchant reference sent to the gateway.
pub const REFERENCE_PREFIX: &str = "sk8-";

/// What the buyer submits to open an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub customer: NewCustomer,
    pub product_id: Uuid,
    pub delivery: DeliveryDetails,
    pub quantity: i32,
}

/// A fully resolved order that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderTransaction {
    pub quantity: i32,
    pub total: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub product: Product,
    pub delivery: Delivery,
    pub customer: Customer,
    pub status: TransactionStatus,
    pub acceptances: LegalAcceptances,
}

/// A persisted order transaction.
///
/// `product` and `customer` are snapshots taken when the order was written, not live
/// catalog or directory rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTransaction {
    pub id: Uuid,
    pub quantity: i32,
    pub total: BigDecimal,
    pub payment_gateway_transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set once a caller has claimed the order for charging.
    pub charging_started_at: Option<DateTime<Utc>>,
    pub product: Product,
    pub delivery: Delivery,
    pub customer: Customer,
    pub status: TransactionStatus,
    pub acceptances: LegalAcceptances,
}

impl OrderTransaction {
    pub fn from_new(id: Uuid, new: NewOrderTransaction) -> Self {
        Self {
            id,
            quantity: new.quantity,
            total: new.total,
            payment_gateway_transaction_id: None,
            created_at: new.created_at,
            charging_started_at: None,
            product: new.product,
            delivery: new.delivery,
            customer: new.customer,
            status: new.status,
            acceptances: new.acceptances,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.status.name.is_terminal()
    }

    /// Merchant reference correlating this order with the gateway transaction.
    pub fn reference(&self) -> String {
        format!("{}{}", REFERENCE_PREFIX, self.id)
    }

    pub fn is_charging(&self) -> bool {
        self.charging_started_at.is_some()
    }

    /// Applies a terminal payment result.
    pub fn apply(&mut self, completion: PaymentCompletion) {
        self.status = completion.status;
        self.payment_gateway_transaction_id = Some(completion.payment_gateway_transaction_id);
        self.total = completion.total;
    }
}

/// The terminal outcome written back when a charge settles.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentCompletion {
    pub status: TransactionStatus,
    pub payment_gateway_transaction_id: String,
    pub total: BigDecimal,
    /// Whether the sale takes `quantity` units out of the catalog in the same write.
    pub consumes_stock: bool,
}

/// Response shape of both order operations. `iva` is computed per call and never persisted.
///
/// `transaction.product` is always the order's stored snapshot. A completion that
/// consumes stock rewrites the snapshot's `stock` with the catalog value left by that
/// same write, so an approved receipt shows the post-sale stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    #[serde(flatten)]
    pub transaction: OrderTransaction,
    pub iva: BigDecimal,
}
