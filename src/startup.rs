use sqlx::PgPool;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::adapters::{
    PostgresCustomerRepository, PostgresDeliveryRepository, PostgresOrderTransactionRepository,
    PostgresProductRepository, PostgresTransactionStatusRepository,
};
use crate::config::Config;
use crate::gateway::{GatewayClient, GatewayService};
use crate::ports::CheckoutRepositories;
use crate::pricing::{PriceCalculator, RandomDeliveryFee};
use crate::use_cases::OrderTransactionService;

/// Installs the global tracing subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

pub fn postgres_repositories(pool: PgPool) -> CheckoutRepositories {
    CheckoutRepositories {
        customers: Arc::new(PostgresCustomerRepository::new(pool.clone())),
        products: Arc::new(PostgresProductRepository::new(pool.clone())),
        deliveries: Arc::new(PostgresDeliveryRepository::new(pool.clone())),
        statuses: Arc::new(PostgresTransactionStatusRepository::new(pool.clone())),
        transactions: Arc::new(PostgresOrderTransactionRepository::new(pool)),
    }
}

/// Wires the order flow against Postgres and the live payment gateway.
pub fn build_checkout(config: &Config, pool: PgPool) -> OrderTransactionService {
    let gateway = &config.gateway;
    let client = GatewayClient::with_circuit_breaker(
        gateway.base_url.clone(),
        gateway.public_key.clone(),
        gateway.timeout,
        gateway.failure_threshold,
        gateway.reset_timeout_secs,
    );
    tracing::info!("Payment gateway client initialized with URL: {}", gateway.base_url);

    let calculator = PriceCalculator::new(config.tax_rate.clone());
    let payments = GatewayService::new(
        Arc::new(client),
        gateway.integrity_key.clone(),
        calculator.clone(),
        gateway.polling,
    );

    OrderTransactionService::new(
        postgres_repositories(pool),
        Arc::new(payments),
        calculator,
        Arc::new(RandomDeliveryFee),
    )
}
