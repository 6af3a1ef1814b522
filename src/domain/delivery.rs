use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shipping fields entered by the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub address: String,
    pub country: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub destinataire_name: String,
}

/// A persisted delivery. The fee is computed server-side once, when the order starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    #[serde(flatten)]
    pub details: DeliveryDetails,
    pub fee: BigDecimal,
}
