//! Payment gateway integration.
//!
//! [`GatewayClient`] is the raw HTTP boundary to the provider, [`GatewayService`]
//! turns domain orders into signed charges and waits for their outcome.

pub mod client;
pub mod service;

pub use client::GatewayClient;
pub use service::{integrity_signature, GatewayService, PollingPolicy};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::{Acceptance, AcceptanceKind, CardDetails, PaymentStatus};

/// The only currency this checkout charges in.
pub const CURRENCY: &str = "COP";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Gateway rejected request ({status}): {message}")]
    Provider {
        status: u16,
        message: String,
        error: Option<ProviderError>,
    },
    #[error("Invalid response from gateway: {0}")]
    InvalidResponse(String),
    #[error("Invalid charge amount: {0}")]
    InvalidAmount(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
    #[error("Gateway did not issue acceptance {0}")]
    MissingAcceptance(AcceptanceKind),
    #[error("Payment {gateway_transaction_id} still pending after {attempts} status checks")]
    PaymentTimedOut {
        gateway_transaction_id: String,
        attempts: u32,
    },
}

/// Structured error body returned by the provider, e.g.
/// `{"error": {"type": "INPUT_VALIDATION_ERROR", "messages": {..}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderError {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub messages: Option<serde_json::Value>,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(reason) = &self.reason {
            write!(f, ": {}", reason)?;
        }
        if let Some(messages) = &self.messages {
            write!(f, " {}", messages)?;
        }
        Ok(())
    }
}

/// Card token as returned by the provider's tokenization endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardToken {
    pub status: String,
    pub data: CardTokenData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardTokenData {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_four: Option<String>,
    #[serde(default)]
    pub bin: Option<String>,
    #[serde(default)]
    pub exp_year: Option<String>,
    #[serde(default)]
    pub exp_month: Option<String>,
    #[serde(default)]
    pub card_holder: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// A gateway-side transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayTransaction {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub amount_in_cents: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_method_type: Option<String>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl GatewayTransaction {
    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending.as_str()
    }

    pub fn payment_status(&self) -> PaymentStatus {
        PaymentStatus::from_gateway(&self.status)
    }
}

/// Signed charge request, serialized as the provider expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub acceptance_token: String,
    pub acceptance_personal_auth: String,
    pub amount_in_cents: i64,
    pub currency: String,
    pub signature: String,
    pub customer_email: String,
    pub reference: String,
    pub payment_method: PaymentMethod,
    pub customer_data: CustomerData,
    pub shipping_address: ShippingAddress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    #[serde(rename = "type")]
    pub kind: String,
    pub token: String,
    pub installments: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerData {
    pub phone_number: String,
    pub full_name: String,
    pub legal_id: String,
    pub legal_id_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub address_line_1: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub name: String,
    pub phone_number: String,
    pub postal_code: String,
}

/// Low-level operations offered by the payment provider.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    /// Presigned acceptance contracts currently issued for the merchant.
    async fn acceptance_contracts(&self) -> Result<Vec<Acceptance>, GatewayError>;
    async fn tokenize_card(&self, card: &CardDetails) -> Result<CardToken, GatewayError>;
    async fn create_transaction(&self, request: &ChargeRequest) -> Result<GatewayTransaction, GatewayError>;
    async fn get_transaction(&self, id: &str) -> Result<GatewayTransaction, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_request_wire_format() {
        let request = ChargeRequest {
            acceptance_token: "acc-1".to_string(),
            acceptance_personal_auth: "acc-2".to_string(),
            amount_in_cents: 2_975_000,
            currency: CURRENCY.to_string(),
            signature: "abc".to_string(),
            customer_email: "ana@example.com".to_string(),
            reference: "sk8-1".to_string(),
            payment_method: PaymentMethod {
                kind: "CARD".to_string(),
                token: "tok_test_1".to_string(),
                installments: 1,
            },
            customer_data: CustomerData {
                phone_number: "3001234567".to_string(),
                full_name: "Ana Gomez".to_string(),
                legal_id: "1020304050".to_string(),
                legal_id_type: "CC".to_string(),
            },
            shipping_address: ShippingAddress {
                address_line_1: "Calle 10 # 5-20".to_string(),
                country: "CO".to_string(),
                region: "Antioquia".to_string(),
                city: "Medellin".to_string(),
                name: "Ana Gomez".to_string(),
                phone_number: "3001234567".to_string(),
                postal_code: "050001".to_string(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["amount_in_cents"], 2_975_000);
        assert_eq!(json["payment_method"]["type"], "CARD");
        assert_eq!(json["payment_method"]["installments"], 1);
        assert_eq!(json["customer_data"]["legal_id_type"], "CC");
        assert_eq!(json["shipping_address"]["address_line_1"], "Calle 10 # 5-20");
    }

    #[test]
    fn test_gateway_transaction_status_mapping() {
        let tx: GatewayTransaction =
            serde_json::from_str(r#"{"id": "1-2-3", "status": "PENDING"}"#).unwrap();
        assert!(tx.is_pending());
        assert_eq!(tx.payment_status(), PaymentStatus::Pending);

        let tx: GatewayTransaction =
            serde_json::from_str(r#"{"id": "1-2-3", "status": "SOMETHING_NEW"}"#).unwrap();
        assert!(!tx.is_pending());
        assert_eq!(tx.payment_status(), PaymentStatus::Error);
    }

    #[test]
    fn test_provider_error_display() {
        let error: ProviderError = serde_json::from_str(
            r#"{"type": "INPUT_VALIDATION_ERROR", "messages": {"reference": ["taken"]}}"#,
        )
        .unwrap();
        assert_eq!(
            error.to_string(),
            r#"INPUT_VALIDATION_ERROR {"reference":["taken"]}"#
        );
    }
}
