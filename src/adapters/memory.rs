//! In-process implementations of the storage ports.
//! Same semantics as the Postgres adapters; used for tests and local runs.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    Customer, Delivery, DeliveryDetails, NewCustomer, NewOrderTransaction, OrderTransaction,
    PaymentCompletion, PaymentStatus, Product, TransactionStatus,
};
use crate::ports::{
    CustomerRepository, DeliveryRepository, OrderTransactionRepository, ProductRepository,
    RepositoryError, RepositoryResult, TransactionStatusRepository,
};

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<String, Customer>>,
}

impl InMemoryCustomerRepository {
    pub async fn len(&self) -> usize {
        self.customers.read().await.len()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Customer>> {
        Ok(self.customers.read().await.get(email).cloned())
    }

    async fn create(&self, customer: &NewCustomer) -> RepositoryResult<Customer> {
        let created = Customer {
            id: Uuid::new_v4(),
            name: customer.name.clone(),
            last_name: customer.last_name.clone(),
            dni: customer.dni.clone(),
            phone: customer.phone.clone(),
            email: customer.email.clone(),
        };
        self.customers
            .write()
            .await
            .insert(created.email.clone(), created.clone());
        Ok(created)
    }
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<Uuid, Product>>,
}

impl InMemoryProductRepository {
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products: RwLock::new(products.into_iter().map(|p| (p.id, p)).collect()),
        }
    }

    pub async fn set_stock(&self, id: Uuid, stock: i32) {
        if let Some(product) = self.products.write().await.get_mut(&id) {
            product.stock = stock;
        }
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn list(&self) -> RepositoryResult<Vec<Product>> {
        let mut products: Vec<Product> = self.products.read().await.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn update_stock(&self, id: Uuid, delta: i32) -> RepositoryResult<()> {
        let mut products = self.products.write().await;
        apply_stock_delta(&mut products, id, delta).map(|_| ())
    }
}

/// Applies `delta` unless it would take stock below zero; returns the new stock.
fn apply_stock_delta(
    products: &mut HashMap<Uuid, Product>,
    id: Uuid,
    delta: i32,
) -> RepositoryResult<i32> {
    let product = products
        .get_mut(&id)
        .ok_or_else(|| RepositoryError::NotFound(format!("product {}", id)))?;
    if product.stock + delta < 0 {
        return Err(RepositoryError::InsufficientStock {
            product_id: id,
            requested: -delta,
            available: product.stock,
        });
    }
    product.stock += delta;
    Ok(product.stock)
}

#[derive(Default)]
pub struct InMemoryDeliveryRepository {
    deliveries: RwLock<HashMap<Uuid, Delivery>>,
}

impl InMemoryDeliveryRepository {
    pub async fn len(&self) -> usize {
        self.deliveries.read().await.len()
    }
}

#[async_trait]
impl DeliveryRepository for InMemoryDeliveryRepository {
    async fn insert(&self, details: &DeliveryDetails, fee: &BigDecimal) -> RepositoryResult<Delivery> {
        let delivery = Delivery {
            id: Uuid::new_v4(),
            details: details.clone(),
            fee: fee.clone(),
        };
        self.deliveries
            .write()
            .await
            .insert(delivery.id, delivery.clone());
        Ok(delivery)
    }
}

/// Status directory pre-seeded with every `PaymentStatus`, ids starting at 1.
pub struct InMemoryTransactionStatusRepository {
    statuses: Vec<TransactionStatus>,
}

impl Default for InMemoryTransactionStatusRepository {
    fn default() -> Self {
        let statuses = PaymentStatus::ALL
            .iter()
            .zip(1..)
            .map(|(name, id)| TransactionStatus { id, name: *name })
            .collect();
        Self { statuses }
    }
}

#[async_trait]
impl TransactionStatusRepository for InMemoryTransactionStatusRepository {
    async fn find_by_name(&self, name: PaymentStatus) -> RepositoryResult<Option<TransactionStatus>> {
        Ok(self.statuses.iter().find(|status| status.name == name).copied())
    }
}

/// Order store sharing the product catalog so completions can take stock in the same step.
pub struct InMemoryOrderTransactionRepository {
    transactions: RwLock<HashMap<Uuid, OrderTransaction>>,
    products: Arc<InMemoryProductRepository>,
}

impl InMemoryOrderTransactionRepository {
    pub fn new(products: Arc<InMemoryProductRepository>) -> Self {
        Self {
            transactions: RwLock::new(HashMap::new()),
            products,
        }
    }
}

#[async_trait]
impl OrderTransactionRepository for InMemoryOrderTransactionRepository {
    async fn insert(&self, transaction: &NewOrderTransaction) -> RepositoryResult<OrderTransaction> {
        let saved = OrderTransaction::from_new(Uuid::new_v4(), transaction.clone());
        self.transactions
            .write()
            .await
            .insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<OrderTransaction>> {
        Ok(self.transactions.read().await.get(&id).cloned())
    }

    async fn claim_pending(&self, id: Uuid) -> RepositoryResult<bool> {
        let mut transactions = self.transactions.write().await;
        match transactions.get_mut(&id) {
            Some(transaction) if transaction.is_pending() && !transaction.is_charging() => {
                transaction.charging_started_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_claim(&self, id: Uuid) -> RepositoryResult<()> {
        let mut transactions = self.transactions.write().await;
        if let Some(transaction) = transactions.get_mut(&id) {
            if transaction.is_pending() {
                transaction.charging_started_at = None;
            }
        }
        Ok(())
    }

    async fn complete_pending(
        &self,
        id: Uuid,
        completion: &PaymentCompletion,
    ) -> RepositoryResult<Option<OrderTransaction>> {
        // lock order: transactions, then products
        let mut transactions = self.transactions.write().await;
        let transaction = match transactions.get_mut(&id) {
            Some(transaction) if transaction.is_pending() => transaction,
            _ => return Ok(None),
        };

        if completion.consumes_stock {
            let mut products = self.products.products.write().await;
            let remaining =
                apply_stock_delta(&mut products, transaction.product.id, -transaction.quantity)?;
            transaction.product.stock = remaining;
        }
        transaction.apply(completion.clone());
        Ok(Some(transaction.clone()))
    }
}
