//! Charges orders through the payment gateway.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{
    ChargeRequest, CustomerData, GatewayApi, GatewayError, GatewayTransaction, PaymentMethod,
    ShippingAddress, CURRENCY,
};
use crate::domain::{AcceptanceKind, CardDetails, LegalAcceptances, OrderTransaction};
use crate::ports::PaymentProcessor;
use crate::pricing::PriceCalculator;

const PAYMENT_METHOD_CARD: &str = "CARD";
const LEGAL_ID_TYPE: &str = "CC";

/// Bounds the wait for a gateway transaction to leave `PENDING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 20,
        }
    }
}

/// Hex SHA-256 of `reference + amount_in_cents + currency + integrity_key`.
pub fn integrity_signature(
    reference: &str,
    amount_in_cents: i64,
    currency: &str,
    integrity_key: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(reference.as_bytes());
    hasher.update(amount_in_cents.to_string().as_bytes());
    hasher.update(currency.as_bytes());
    hasher.update(integrity_key.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct GatewayService {
    api: Arc<dyn GatewayApi>,
    integrity_key: String,
    calculator: PriceCalculator,
    polling: PollingPolicy,
}

impl GatewayService {
    pub fn new(
        api: Arc<dyn GatewayApi>,
        integrity_key: String,
        calculator: PriceCalculator,
        polling: PollingPolicy,
    ) -> Self {
        Self {
            api,
            integrity_key,
            calculator,
            polling,
        }
    }

    fn amount_in_cents(&self, transaction: &OrderTransaction) -> Result<i64, GatewayError> {
        self.calculator
            .amount_in_cents(&transaction.total)
            .filter(|cents| *cents > 0)
            .ok_or_else(|| {
                GatewayError::InvalidAmount(format!(
                    "total {} cannot be charged in cents",
                    transaction.total
                ))
            })
    }

    fn charge_request(
        &self,
        transaction: &OrderTransaction,
        amount_in_cents: i64,
        card_token: String,
    ) -> ChargeRequest {
        let reference = transaction.reference();
        let signature =
            integrity_signature(&reference, amount_in_cents, CURRENCY, &self.integrity_key);
        let customer = &transaction.customer;
        let delivery = &transaction.delivery.details;

        ChargeRequest {
            acceptance_token: transaction.acceptances.end_user_policy.acceptance_token.clone(),
            acceptance_personal_auth: transaction
                .acceptances
                .personal_data_auth
                .acceptance_token
                .clone(),
            amount_in_cents,
            currency: CURRENCY.to_string(),
            signature,
            customer_email: customer.email.clone(),
            reference,
            payment_method: PaymentMethod {
                kind: PAYMENT_METHOD_CARD.to_string(),
                token: card_token,
                installments: 1,
            },
            customer_data: CustomerData {
                phone_number: customer.phone.clone(),
                full_name: customer.full_name(),
                legal_id: customer.dni.clone(),
                legal_id_type: LEGAL_ID_TYPE.to_string(),
            },
            shipping_address: ShippingAddress {
                address_line_1: delivery.address.clone(),
                country: delivery.country.clone(),
                region: delivery.region.clone(),
                city: delivery.city.clone(),
                name: delivery.destinataire_name.clone(),
                phone_number: customer.phone.clone(),
                postal_code: delivery.postal_code.clone(),
            },
        }
    }

    /// Re-fetches the gateway transaction until it leaves `PENDING` or the
    /// polling budget runs out.
    async fn wait_for_terminal(
        &self,
        mut current: GatewayTransaction,
    ) -> Result<GatewayTransaction, GatewayError> {
        let mut attempts = 0;
        while current.is_pending() {
            if attempts >= self.polling.max_attempts {
                warn!(
                    gateway_transaction_id = %current.id,
                    attempts,
                    "Gateway transaction still pending, giving up"
                );
                return Err(GatewayError::PaymentTimedOut {
                    gateway_transaction_id: current.id,
                    attempts,
                });
            }

            sleep(self.polling.interval).await;
            attempts += 1;
            current = self.api.get_transaction(&current.id).await?;
            debug!(
                gateway_transaction_id = %current.id,
                status = %current.status,
                attempt = attempts,
                "Polled gateway transaction"
            );
        }

        Ok(current)
    }
}

#[async_trait]
impl PaymentProcessor for GatewayService {
    async fn acceptances(&self) -> Result<LegalAcceptances, GatewayError> {
        let contracts = self.api.acceptance_contracts().await?;

        let find = |kind: AcceptanceKind| {
            contracts
                .iter()
                .find(|acceptance| acceptance.kind == kind)
                .cloned()
                .ok_or(GatewayError::MissingAcceptance(kind))
        };

        Ok(LegalAcceptances {
            end_user_policy: find(AcceptanceKind::EndUserPolicy)?,
            personal_data_auth: find(AcceptanceKind::PersonalDataAuth)?,
        })
    }

    async fn pay(
        &self,
        transaction: &OrderTransaction,
        card: &CardDetails,
    ) -> Result<GatewayTransaction, GatewayError> {
        let amount_in_cents = self.amount_in_cents(transaction)?;
        let token = self.api.tokenize_card(card).await?;
        let request = self.charge_request(transaction, amount_in_cents, token.data.id);

        info!(
            transaction_id = %transaction.id,
            reference = %request.reference,
            amount_in_cents = request.amount_in_cents,
            "Creating gateway transaction"
        );
        let created = self.api.create_transaction(&request).await?;
        let settled = self.wait_for_terminal(created).await?;

        info!(
            transaction_id = %transaction.id,
            gateway_transaction_id = %settled.id,
            status = %settled.status,
            "Gateway transaction settled"
        );
        Ok(settled)
    }
}
