#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use checkout_core::adapters::memory::{
    InMemoryCustomerRepository, InMemoryDeliveryRepository, InMemoryOrderTransactionRepository,
    InMemoryProductRepository, InMemoryTransactionStatusRepository,
};
use checkout_core::domain::{
    Acceptance, AcceptanceKind, CardDetails, DeliveryDetails, NewCustomer, OrderRequest, Product,
};
use checkout_core::gateway::{
    CardToken, CardTokenData, ChargeRequest, GatewayApi, GatewayError, GatewayService,
    GatewayTransaction, PollingPolicy,
};
use checkout_core::ports::CheckoutRepositories;
use checkout_core::pricing::{FixedDeliveryFee, PriceCalculator};
use checkout_core::OrderTransactionService;

pub const GATEWAY_TRANSACTION_ID: &str = "15113-1700000000-38771";

/// Gateway double that replays a scripted sequence of transaction statuses.
pub struct ScriptedGateway {
    acceptances: Vec<Acceptance>,
    statuses: Mutex<VecDeque<String>>,
    reject_create: AtomicBool,
    pub charges: Mutex<Vec<ChargeRequest>>,
    pub polls: Mutex<u32>,
}

impl ScriptedGateway {
    /// Both acceptances issued; every transaction ends with `statuses`' last entry.
    pub fn settling(statuses: &[&str]) -> Self {
        Self {
            acceptances: vec![
                acceptance(AcceptanceKind::PersonalDataAuth, "pda-token"),
                acceptance(AcceptanceKind::EndUserPolicy, "eup-token"),
            ],
            statuses: Mutex::new(statuses.iter().map(|s| s.to_string()).collect()),
            reject_create: AtomicBool::new(false),
            charges: Mutex::new(Vec::new()),
            polls: Mutex::new(0),
        }
    }

    pub fn approving() -> Self {
        Self::settling(&["PENDING", "APPROVED"])
    }

    pub fn without_acceptances(mut self, kinds: &[AcceptanceKind]) -> Self {
        self.acceptances.retain(|a| !kinds.contains(&a.kind));
        self
    }

    pub fn rejecting_charges(self) -> Self {
        self.reject_create.store(true, Ordering::SeqCst);
        self
    }

    pub fn accept_charges(&self) {
        self.reject_create.store(false, Ordering::SeqCst);
    }

    pub fn charge_count(&self) -> usize {
        self.charges.lock().unwrap().len()
    }

    fn next(&self) -> GatewayTransaction {
        let mut statuses = self.statuses.lock().unwrap();
        let status = if statuses.len() > 1 {
            statuses.pop_front().unwrap_or_default()
        } else {
            statuses.front().cloned().unwrap_or_else(|| "PENDING".to_string())
        };
        GatewayTransaction {
            id: GATEWAY_TRANSACTION_ID.to_string(),
            status,
            reference: None,
            amount_in_cents: None,
            currency: Some("COP".to_string()),
            payment_method_type: Some("CARD".to_string()),
            status_message: None,
            created_at: None,
        }
    }
}

#[async_trait]
impl GatewayApi for ScriptedGateway {
    async fn acceptance_contracts(&self) -> Result<Vec<Acceptance>, GatewayError> {
        Ok(self.acceptances.clone())
    }

    async fn tokenize_card(&self, card: &CardDetails) -> Result<CardToken, GatewayError> {
        Ok(CardToken {
            status: "CREATED".to_string(),
            data: CardTokenData {
                id: format!("tok_test_{}", card.last_four()),
                created_at: None,
                brand: Some("VISA".to_string()),
                name: None,
                last_four: Some(card.last_four().to_string()),
                bin: None,
                exp_year: Some(card.exp_year.clone()),
                exp_month: Some(card.exp_month.clone()),
                card_holder: Some(card.card_holder.clone()),
                expires_at: None,
            },
        })
    }

    async fn create_transaction(
        &self,
        request: &ChargeRequest,
    ) -> Result<GatewayTransaction, GatewayError> {
        if self.reject_create.load(Ordering::SeqCst) {
            return Err(GatewayError::Provider {
                status: 422,
                message: "INPUT_VALIDATION_ERROR".to_string(),
                error: None,
            });
        }
        self.charges.lock().unwrap().push(request.clone());
        let mut transaction = self.next();
        transaction.reference = Some(request.reference.clone());
        transaction.amount_in_cents = Some(request.amount_in_cents);
        Ok(transaction)
    }

    async fn get_transaction(&self, _id: &str) -> Result<GatewayTransaction, GatewayError> {
        *self.polls.lock().unwrap() += 1;
        Ok(self.next())
    }
}

pub fn acceptance(kind: AcceptanceKind, token: &str) -> Acceptance {
    Acceptance {
        acceptance_token: token.to_string(),
        permalink: format!("https://gateway.test/legal/{}.pdf", token),
        kind,
    }
}

pub fn deck(stock: i32) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: "Street deck".to_string(),
        description: "8.25 maple deck".to_string(),
        price: BigDecimal::from(10000),
        stock,
        image: Some("deck.png".to_string()),
    }
}

pub fn order_request(product_id: Uuid, quantity: i32) -> OrderRequest {
    OrderRequest {
        customer: NewCustomer {
            name: "Ana".to_string(),
            last_name: "Gomez".to_string(),
            dni: "1020304050".to_string(),
            phone: "3001234567".to_string(),
            email: "ana@example.com".to_string(),
        },
        product_id,
        delivery: DeliveryDetails {
            address: "Calle 10 # 5-20".to_string(),
            country: "CO".to_string(),
            city: "Medellin".to_string(),
            region: "Antioquia".to_string(),
            postal_code: "050001".to_string(),
            destinataire_name: "Luis Gomez".to_string(),
        },
        quantity,
    }
}

pub fn card() -> CardDetails {
    CardDetails {
        number: "4242424242424242".to_string(),
        cvc: "123".to_string(),
        exp_month: "08".to_string(),
        exp_year: "28".to_string(),
        card_holder: "Ana Gomez".to_string(),
    }
}

pub struct Checkout<G> {
    pub service: OrderTransactionService,
    pub customers: Arc<InMemoryCustomerRepository>,
    pub products: Arc<InMemoryProductRepository>,
    pub deliveries: Arc<InMemoryDeliveryRepository>,
    pub transactions: Arc<InMemoryOrderTransactionRepository>,
    pub gateway: Arc<G>,
    pub product: Product,
}

/// In-memory checkout with a flat 5000 delivery fee and a 19% IVA.
pub fn checkout<G: GatewayApi + 'static>(stock: i32, gateway: G) -> Checkout<G> {
    let product = deck(stock);
    let customers = Arc::new(InMemoryCustomerRepository::default());
    let products = Arc::new(InMemoryProductRepository::with_products(vec![product.clone()]));
    let deliveries = Arc::new(InMemoryDeliveryRepository::default());
    let transactions = Arc::new(InMemoryOrderTransactionRepository::new(products.clone()));
    let gateway = Arc::new(gateway);

    let calculator = PriceCalculator::default();
    let payments = GatewayService::new(
        gateway.clone(),
        "test_integrity_abc".to_string(),
        calculator.clone(),
        PollingPolicy {
            interval: Duration::from_millis(1),
            max_attempts: 5,
        },
    );

    let service = OrderTransactionService::new(
        CheckoutRepositories {
            customers: customers.clone(),
            products: products.clone(),
            deliveries: deliveries.clone(),
            statuses: Arc::new(InMemoryTransactionStatusRepository::default()),
            transactions: transactions.clone(),
        },
        Arc::new(payments),
        calculator,
        Arc::new(FixedDeliveryFee(BigDecimal::from(5000))),
    );

    Checkout {
        service,
        customers,
        products,
        deliveries,
        transactions,
        gateway,
        product,
    }
}
