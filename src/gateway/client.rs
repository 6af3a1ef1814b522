use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CardToken, ChargeRequest, GatewayApi, GatewayError, GatewayTransaction, ProviderError};
use crate::domain::{Acceptance, AcceptanceKind, CardDetails};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
const DEFAULT_RESET_TIMEOUT_SECS: u64 = 60;

/// `{"data": ..}` envelope wrapping every successful provider response.
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct MerchantData {
    #[serde(default)]
    presigned_acceptance: Option<PresignedAcceptance>,
    #[serde(default)]
    presigned_personal_data_auth: Option<PresignedAcceptance>,
}

#[derive(Debug, Deserialize)]
struct PresignedAcceptance {
    acceptance_token: String,
    permalink: String,
}

impl PresignedAcceptance {
    fn into_acceptance(self, kind: AcceptanceKind) -> Acceptance {
        Acceptance {
            acceptance_token: self.acceptance_token,
            permalink: self.permalink,
            kind,
        }
    }
}

#[derive(Debug, Serialize)]
struct TokenizeCardRequest<'a> {
    number: &'a str,
    cvc: &'a str,
    exp_month: &'a str,
    exp_year: &'a str,
    card_holder: &'a str,
}

type GatewayBreaker = StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>;

/// HTTP client for the payment provider's public API.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    public_key: String,
    circuit_breaker: GatewayBreaker,
}

impl GatewayClient {
    /// Creates a new GatewayClient with default timeout and circuit breaker settings
    pub fn new(base_url: String, public_key: String) -> Self {
        Self::with_circuit_breaker(
            base_url,
            public_key,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            DEFAULT_FAILURE_THRESHOLD,
            DEFAULT_RESET_TIMEOUT_SECS,
        )
    }

    /// Creates a new GatewayClient with custom timeout and circuit breaker configuration
    pub fn with_circuit_breaker(
        base_url: String,
        public_key: String,
        timeout: Duration,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        GatewayClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            public_key,
            circuit_breaker,
        }
    }

    /// Returns the current state of the circuit breaker
    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn unwrap_breaker<T>(result: Result<T, FailsafeError<GatewayError>>) -> Result<T, GatewayError> {
        match result {
            Ok(value) => Ok(value),
            Err(FailsafeError::Rejected) => Err(GatewayError::CircuitBreakerOpen(
                "payment gateway circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

/// Decodes a `{"data": ..}` response or turns the provider's error body into a `GatewayError`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let error = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);
        let message = match &error {
            Some(error) => error.to_string(),
            None if body.is_empty() => status.to_string(),
            None => body,
        };
        return Err(GatewayError::Provider {
            status: status.as_u16(),
            message,
            error,
        });
    }

    let body = response.text().await?;
    serde_json::from_str::<DataEnvelope<T>>(&body)
        .map(|envelope| envelope.data)
        .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl GatewayApi for GatewayClient {
    async fn acceptance_contracts(&self) -> Result<Vec<Acceptance>, GatewayError> {
        let url = self.url(&format!("/merchants/{}", self.public_key));
        let client = self.client.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client.get(&url).send().await?;
                decode::<MerchantData>(response).await
            })
            .await;

        let merchant = Self::unwrap_breaker(result)?;
        let mut acceptances = Vec::with_capacity(2);
        if let Some(presigned) = merchant.presigned_acceptance {
            acceptances.push(presigned.into_acceptance(AcceptanceKind::EndUserPolicy));
        }
        if let Some(presigned) = merchant.presigned_personal_data_auth {
            acceptances.push(presigned.into_acceptance(AcceptanceKind::PersonalDataAuth));
        }

        Ok(acceptances)
    }

    async fn tokenize_card(&self, card: &CardDetails) -> Result<CardToken, GatewayError> {
        let url = self.url("/tokens/cards");
        let client = self.client.clone();
        let public_key = self.public_key.clone();
        let body = serde_json::to_value(TokenizeCardRequest {
            number: &card.number,
            cvc: &card.cvc,
            exp_month: &card.exp_month,
            exp_year: &card.exp_year,
            card_holder: &card.card_holder,
        })
        .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .bearer_auth(public_key)
                    .json(&body)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return decode::<CardToken>(response).await;
                }
                // the token endpoint returns its envelope as-is
                let token = response.json::<CardToken>().await?;
                Ok(token)
            })
            .await;

        let token = Self::unwrap_breaker(result)?;
        tracing::debug!(
            token_id = %token.data.id,
            last_four = %card.last_four(),
            "Card tokenized"
        );
        Ok(token)
    }

    async fn create_transaction(&self, request: &ChargeRequest) -> Result<GatewayTransaction, GatewayError> {
        let url = self.url("/transactions");
        let client = self.client.clone();
        let public_key = self.public_key.clone();
        let body = request.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .bearer_auth(public_key)
                    .json(&body)
                    .send()
                    .await?;
                decode::<GatewayTransaction>(response).await
            })
            .await;

        match Self::unwrap_breaker(result) {
            Ok(transaction) => Ok(transaction),
            Err(e) => {
                if let GatewayError::Provider {
                    status,
                    error: Some(error),
                    ..
                } = &e
                {
                    tracing::error!(
                        reference = %request.reference,
                        status = *status,
                        error_type = %error.kind,
                        messages = ?error.messages,
                        "Gateway rejected transaction"
                    );
                } else {
                    tracing::error!(reference = %request.reference, "Gateway transaction failed: {}", e);
                }
                Err(e)
            }
        }
    }

    async fn get_transaction(&self, id: &str) -> Result<GatewayTransaction, GatewayError> {
        let url = self.url(&format!("/transactions/{}", id));
        let client = self.client.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client.get(&url).send().await?;
                decode::<GatewayTransaction>(response).await
            })
            .await;

        Self::unwrap_breaker(result)
    }
}
