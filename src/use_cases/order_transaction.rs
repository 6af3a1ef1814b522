//! Order transaction use case.
//! Opens an order as `PENDING`, then charges it once and records the terminal outcome.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{CustomerService, DeliveryService, ProductService};
use crate::domain::{
    CardDetails, NewOrderTransaction, OrderReceipt, OrderRequest, OrderTransaction,
    PaymentCompletion, PaymentStatus, TransactionStatus,
};
use crate::error::{CheckoutError, CheckoutResult};
use crate::gateway::GatewayError;
use crate::ports::{
    CheckoutRepositories, OrderTransactionRepository, PaymentProcessor,
    TransactionStatusRepository,
};
use crate::pricing::{DeliveryFeePolicy, PriceCalculator};

pub struct OrderTransactionService {
    customers: CustomerService,
    products: ProductService,
    deliveries: DeliveryService,
    statuses: Arc<dyn TransactionStatusRepository>,
    transactions: Arc<dyn OrderTransactionRepository>,
    payments: Arc<dyn PaymentProcessor>,
    calculator: PriceCalculator,
    delivery_fees: Arc<dyn DeliveryFeePolicy>,
}

impl OrderTransactionService {
    pub fn new(
        repositories: CheckoutRepositories,
        payments: Arc<dyn PaymentProcessor>,
        calculator: PriceCalculator,
        delivery_fees: Arc<dyn DeliveryFeePolicy>,
    ) -> Self {
        Self {
            customers: CustomerService::new(repositories.customers),
            products: ProductService::new(repositories.products),
            deliveries: DeliveryService::new(repositories.deliveries),
            statuses: repositories.statuses,
            transactions: repositories.transactions,
            payments,
            calculator,
            delivery_fees,
        }
    }

    pub fn products(&self) -> &ProductService {
        &self.products
    }

    pub fn customers(&self) -> &CustomerService {
        &self.customers
    }

    async fn status(&self, name: PaymentStatus) -> CheckoutResult<TransactionStatus> {
        self.statuses
            .find_by_name(name)
            .await?
            .ok_or_else(|| CheckoutError::StatusNotSeeded(name.to_string()))
    }

    /// Validates stock, resolves the customer, prices the order and persists it as `PENDING`.
    ///
    /// Everything that can fail without side effects (stock, status lookup, legal
    /// acceptances) runs before the customer, delivery and order rows are written.
    pub async fn start_transaction(&self, request: OrderRequest) -> CheckoutResult<OrderReceipt> {
        if request.quantity <= 0 {
            return Err(CheckoutError::InvalidQuantity(request.quantity));
        }

        let product = self
            .products
            .get_available(request.product_id, request.quantity)
            .await?;
        let pending = self.status(PaymentStatus::Pending).await?;
        let acceptances = self.payments.acceptances().await?;

        let customer = self.customers.resolve(&request.customer).await?;
        let fee = self.delivery_fees.delivery_fee();
        let delivery = self.deliveries.register(&request.delivery, &fee).await?;

        let base = self
            .calculator
            .compute_total(&product.price, request.quantity, &delivery.fee);
        let iva = self.calculator.compute_tax_amount(&base);
        let total = self.calculator.compute_total_with_tax(&base);

        let transaction = self
            .transactions
            .insert(&NewOrderTransaction {
                quantity: request.quantity,
                total,
                created_at: Utc::now(),
                product,
                delivery,
                customer,
                status: pending,
                acceptances,
            })
            .await?;

        info!(
            transaction_id = %transaction.id,
            product_id = %transaction.product.id,
            quantity = transaction.quantity,
            total = %transaction.total,
            "Order transaction started"
        );

        Ok(OrderReceipt { transaction, iva })
    }

    /// Charges a `PENDING` transaction and records the gateway's terminal status.
    ///
    /// A transaction is charged at most once: the caller first claims it, and a second
    /// call, or a caller losing the claim, fails with `TransactionAlreadyFinished`
    /// without reaching the gateway. The status change and, for approved payments, the
    /// stock decrement are written together. When the gateway call fails the
    /// transaction stays `PENDING`; the claim is kept only after a polling timeout,
    /// since the charge may still settle.
    pub async fn finish_transaction_with_card(
        &self,
        id: Uuid,
        card: CardDetails,
    ) -> CheckoutResult<OrderReceipt> {
        let transaction = self.get_transaction(id).await?;
        if !transaction.is_pending() {
            return Err(CheckoutError::TransactionAlreadyFinished(id));
        }

        self.products
            .get_available(transaction.product.id, transaction.quantity)
            .await?;

        if !self.transactions.claim_pending(id).await? {
            warn!(transaction_id = %id, "Transaction already claimed for charging");
            return Err(CheckoutError::TransactionAlreadyFinished(id));
        }

        let settled = match self.payments.pay(&transaction, &card).await {
            Ok(settled) => settled,
            Err(err) => {
                self.abandon_charge(id, &err).await;
                return Err(err.into());
            }
        };
        let outcome = settled.payment_status();
        let status = self.status(outcome).await?;

        let base = self.calculator.remove_tax(&transaction.total);
        let iva = self.calculator.compute_tax_amount(&base);
        let total = self.calculator.compute_total_with_tax(&base);

        let completion = PaymentCompletion {
            status,
            payment_gateway_transaction_id: settled.id.clone(),
            total,
            consumes_stock: outcome == PaymentStatus::Approved,
        };
        let finished = match self.transactions.complete_pending(id, &completion).await {
            Ok(Some(finished)) => finished,
            Ok(None) => {
                warn!(
                    transaction_id = %id,
                    gateway_transaction_id = %settled.id,
                    "Transaction finished concurrently, outcome discarded"
                );
                return Err(CheckoutError::TransactionAlreadyFinished(id));
            }
            Err(err) => {
                error!(
                    transaction_id = %id,
                    gateway_transaction_id = %settled.id,
                    status = %outcome,
                    error = %err,
                    "Settled charge could not be recorded, transaction left PENDING"
                );
                return Err(err.into());
            }
        };

        info!(
            transaction_id = %id,
            gateway_transaction_id = %settled.id,
            status = %outcome,
            total = %finished.total,
            "Order transaction finished"
        );

        Ok(OrderReceipt {
            transaction: finished,
            iva,
        })
    }

    async fn abandon_charge(&self, id: Uuid, err: &GatewayError) {
        if let GatewayError::PaymentTimedOut {
            gateway_transaction_id,
            ..
        } = err
        {
            warn!(
                transaction_id = %id,
                gateway_transaction_id = %gateway_transaction_id,
                "Charge still pending at the gateway, keeping claim"
            );
            return;
        }

        if let Err(release_err) = self.transactions.release_claim(id).await {
            error!(
                transaction_id = %id,
                error = %release_err,
                "Failed to release charge claim"
            );
        }
    }

    pub async fn get_transaction(&self, id: Uuid) -> CheckoutResult<OrderTransaction> {
        self.transactions
            .find_by_id(id)
            .await?
            .ok_or(CheckoutError::TransactionNotFound(id))
    }
}
