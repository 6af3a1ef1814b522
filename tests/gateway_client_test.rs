mod common;

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use checkout_core::domain::PaymentStatus;
use checkout_core::gateway::{integrity_signature, GatewayClient, GatewayError};
use checkout_core::CheckoutError;
use common::{card, checkout, order_request};

const PUBLIC_KEY: &str = "pub_test_abc";

async fn merchant_mock(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("GET", "/merchants/pub_test_abc")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"data": {
                "id": 1,
                "presigned_acceptance": {
                    "acceptance_token": "eup-token",
                    "permalink": "https://gateway.test/terms.pdf",
                    "type": "END_USER_POLICY"
                },
                "presigned_personal_data_auth": {
                    "acceptance_token": "pda-token",
                    "permalink": "https://gateway.test/data.pdf",
                    "type": "PERSONAL_DATA_AUTH"
                }
            }})
            .to_string(),
        )
        .create_async()
        .await
}

async fn token_mock(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/tokens/cards")
        .match_header("authorization", "Bearer pub_test_abc")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "CREATED", "data": {"id": "tok_test_42", "last_four": "4242"}}"#)
        .create_async()
        .await
}

#[tokio::test]
async fn test_checkout_against_http_gateway() {
    let mut server = Server::new_async().await;
    let merchant = merchant_mock(&mut server).await;
    let token = token_mock(&mut server).await;

    let shop = checkout(10, GatewayClient::new(server.url(), PUBLIC_KEY.to_string()));
    let started = shop
        .service
        .start_transaction(order_request(shop.product.id, 2))
        .await
        .unwrap();
    let reference = started.transaction.reference();

    let create = server
        .mock("POST", "/transactions")
        .match_header("authorization", "Bearer pub_test_abc")
        .match_body(Matcher::PartialJson(json!({
            "acceptance_token": "eup-token",
            "acceptance_personal_auth": "pda-token",
            "amount_in_cents": 2975000,
            "currency": "COP",
            "reference": reference,
            "signature": integrity_signature(&reference, 2_975_000, "COP", "test_integrity_abc"),
            "payment_method": {"type": "CARD", "token": "tok_test_42", "installments": 1}
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({"data": {"id": "15113-1", "status": "PENDING"}}).to_string())
        .create_async()
        .await;
    let poll = server
        .mock("GET", "/transactions/15113-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"data": {"id": "15113-1", "status": "APPROVED"}}).to_string())
        .create_async()
        .await;

    let finished = shop
        .service
        .finish_transaction_with_card(started.transaction.id, card())
        .await
        .unwrap();

    assert_eq!(finished.transaction.status.name, PaymentStatus::Approved);
    assert_eq!(
        finished.transaction.payment_gateway_transaction_id.as_deref(),
        Some("15113-1")
    );
    assert_eq!(finished.transaction.product.stock, 8);

    merchant.assert_async().await;
    token.assert_async().await;
    create.assert_async().await;
    poll.assert_async().await;
}

#[tokio::test]
async fn test_rejected_charge_keeps_order_pending() {
    let mut server = Server::new_async().await;
    let _merchant = merchant_mock(&mut server).await;
    let _token = token_mock(&mut server).await;
    let _create = server
        .mock("POST", "/transactions")
        .with_status(422)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"error": {
                "type": "INPUT_VALIDATION_ERROR",
                "messages": {"reference": ["La referencia ya ha sido usada"]}
            }})
            .to_string(),
        )
        .create_async()
        .await;

    let shop = checkout(10, GatewayClient::new(server.url(), PUBLIC_KEY.to_string()));
    let started = shop
        .service
        .start_transaction(order_request(shop.product.id, 1))
        .await
        .unwrap();

    let result = shop
        .service
        .finish_transaction_with_card(started.transaction.id, card())
        .await;

    match result {
        Err(CheckoutError::Gateway(GatewayError::Provider { status, error, .. })) => {
            assert_eq!(status, 422);
            assert_eq!(error.map(|e| e.kind).as_deref(), Some("INPUT_VALIDATION_ERROR"));
        }
        other => panic!("expected provider rejection, got {:?}", other),
    }
    let stored = shop.service.get_transaction(started.transaction.id).await.unwrap();
    assert_eq!(stored.status.name, PaymentStatus::Pending);
    let product = shop.service.products().get_product(shop.product.id).await.unwrap();
    assert_eq!(product.stock, 10);
}

#[tokio::test]
async fn test_missing_personal_data_acceptance_blocks_checkout() {
    let mut server = Server::new_async().await;
    let _merchant = server
        .mock("GET", "/merchants/pub_test_abc")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"data": {"presigned_acceptance": {
                "acceptance_token": "eup-token",
                "permalink": "https://gateway.test/terms.pdf"
            }}})
            .to_string(),
        )
        .create_async()
        .await;

    let shop = checkout(10, GatewayClient::new(server.url(), PUBLIC_KEY.to_string()));
    let result = shop
        .service
        .start_transaction(order_request(shop.product.id, 1))
        .await;

    assert!(matches!(result, Err(CheckoutError::MissingAcceptance(_))));
    assert_eq!(shop.customers.len().await, 0);
}
