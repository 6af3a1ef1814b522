//! Postgres implementation of OrderTransactionRepository.
//! Product and customer are read from the snapshot columns written with the order.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    Acceptance, AcceptanceKind, Customer, Delivery, DeliveryDetails, LegalAcceptances,
    NewOrderTransaction, OrderTransaction, PaymentCompletion, PaymentStatus, Product,
    TransactionStatus,
};
use crate::ports::{OrderTransactionRepository, RepositoryError, RepositoryResult};

const SELECT_ORDER_TRANSACTION: &str = r#"
    SELECT
        ot.id, ot.quantity, ot.total, ot.payment_gateway_transaction_id, ot.created_at,
        ot.charging_started_at,
        ot.end_user_policy_token, ot.end_user_policy_permalink,
        ot.personal_data_auth_token, ot.personal_data_auth_permalink,
        ot.product_id, ot.product_name, ot.product_description,
        ot.product_price, ot.product_stock, ot.product_image,
        d.id AS delivery_id, d.address, d.country, d.city, d.region, d.postal_code,
        d.destinataire_name, d.fee,
        ot.customer_id, ot.customer_name, ot.customer_last_name AS last_name,
        ot.customer_dni AS dni, ot.customer_phone AS phone, ot.customer_email AS email,
        s.id AS status_id, s.name AS status_name
    FROM order_transactions ot
    JOIN deliveries d ON d.id = ot.delivery_id
    JOIN transaction_statuses s ON s.id = ot.status_id
    WHERE ot.id = $1
"#;

const PENDING_STATUS_ID: &str = "(SELECT id FROM transaction_statuses WHERE name = 'PENDING')";

/// Postgres-backed order transaction repository.
#[derive(Clone)]
pub struct PostgresOrderTransactionRepository {
    pool: PgPool,
}

impl PostgresOrderTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderTransactionRepository for PostgresOrderTransactionRepository {
    async fn insert(&self, tx: &NewOrderTransaction) -> RepositoryResult<OrderTransaction> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO order_transactions (
                id, quantity, total, created_at, product_id, delivery_id, customer_id, status_id,
                end_user_policy_token, end_user_policy_permalink,
                personal_data_auth_token, personal_data_auth_permalink,
                product_name, product_description, product_price, product_stock, product_image,
                customer_name, customer_last_name, customer_dni, customer_phone, customer_email
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22
            )
            "#,
        )
        .bind(id)
        .bind(tx.quantity)
        .bind(&tx.total)
        .bind(tx.created_at)
        .bind(tx.product.id)
        .bind(tx.delivery.id)
        .bind(tx.customer.id)
        .bind(tx.status.id)
        .bind(&tx.acceptances.end_user_policy.acceptance_token)
        .bind(&tx.acceptances.end_user_policy.permalink)
        .bind(&tx.acceptances.personal_data_auth.acceptance_token)
        .bind(&tx.acceptances.personal_data_auth.permalink)
        .bind(&tx.product.name)
        .bind(&tx.product.description)
        .bind(&tx.product.price)
        .bind(tx.product.stock)
        .bind(&tx.product.image)
        .bind(&tx.customer.name)
        .bind(&tx.customer.last_name)
        .bind(&tx.customer.dni)
        .bind(&tx.customer.phone)
        .bind(&tx.customer.email)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(OrderTransaction::from_new(id, tx.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<OrderTransaction>> {
        let row = sqlx::query_as::<_, OrderTransactionRow>(SELECT_ORDER_TRANSACTION)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        row.map(OrderTransactionRow::into_domain).transpose()
    }

    async fn claim_pending(&self, id: Uuid) -> RepositoryResult<bool> {
        let result = sqlx::query(&format!(
            r#"
            UPDATE order_transactions
            SET charging_started_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND charging_started_at IS NULL AND status_id = {}
            "#,
            PENDING_STATUS_ID
        ))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_claim(&self, id: Uuid) -> RepositoryResult<()> {
        sqlx::query(&format!(
            r#"
            UPDATE order_transactions
            SET charging_started_at = NULL, updated_at = NOW()
            WHERE id = $1 AND status_id = {}
            "#,
            PENDING_STATUS_ID
        ))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn complete_pending(
        &self,
        id: Uuid,
        completion: &PaymentCompletion,
    ) -> RepositoryResult<Option<OrderTransaction>> {
        let mut db_tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        // Only a row still in PENDING is updated, so concurrent finishers cannot both win.
        let updated = sqlx::query_as::<_, (Uuid, i32)>(&format!(
            r#"
            UPDATE order_transactions
            SET status_id = $2, payment_gateway_transaction_id = $3, total = $4, updated_at = NOW()
            WHERE id = $1 AND status_id = {}
            RETURNING product_id, quantity
            "#,
            PENDING_STATUS_ID
        ))
        .bind(id)
        .bind(completion.status.id)
        .bind(&completion.payment_gateway_transaction_id)
        .bind(&completion.total)
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(RepositoryError::from)?;

        let (product_id, quantity) = match updated {
            Some(row) => row,
            None => return Ok(None),
        };

        if completion.consumes_stock {
            let remaining = sqlx::query_scalar::<_, i32>(
                "UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2 RETURNING stock",
            )
            .bind(product_id)
            .bind(quantity)
            .fetch_optional(&mut *db_tx)
            .await
            .map_err(RepositoryError::from)?;

            let remaining = match remaining {
                Some(stock) => stock,
                None => {
                    let available =
                        sqlx::query_scalar::<_, i32>("SELECT stock FROM products WHERE id = $1")
                            .bind(product_id)
                            .fetch_optional(&mut *db_tx)
                            .await
                            .map_err(RepositoryError::from)?
                            .unwrap_or(0);
                    db_tx.rollback().await.map_err(RepositoryError::from)?;
                    return Err(RepositoryError::InsufficientStock {
                        product_id,
                        requested: quantity,
                        available,
                    });
                }
            };

            sqlx::query("UPDATE order_transactions SET product_stock = $2 WHERE id = $1")
                .bind(id)
                .bind(remaining)
                .execute(&mut *db_tx)
                .await
                .map_err(RepositoryError::from)?;
        }

        db_tx.commit().await.map_err(RepositoryError::from)?;

        self.find_by_id(id)
            .await?
            .map(Some)
            .ok_or_else(|| RepositoryError::NotFound(format!("order transaction {}", id)))
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct OrderTransactionRow {
    id: Uuid,
    quantity: i32,
    total: BigDecimal,
    payment_gateway_transaction_id: Option<String>,
    created_at: DateTime<Utc>,
    charging_started_at: Option<DateTime<Utc>>,
    end_user_policy_token: String,
    end_user_policy_permalink: String,
    personal_data_auth_token: String,
    personal_data_auth_permalink: String,
    product_id: Uuid,
    product_name: String,
    product_description: String,
    product_price: BigDecimal,
    product_stock: i32,
    product_image: Option<String>,
    delivery_id: Uuid,
    address: String,
    country: String,
    city: String,
    region: String,
    postal_code: String,
    destinataire_name: String,
    fee: BigDecimal,
    customer_id: Uuid,
    customer_name: String,
    last_name: String,
    dni: String,
    phone: String,
    email: String,
    status_id: i32,
    status_name: String,
}

impl OrderTransactionRow {
    fn into_domain(self) -> RepositoryResult<OrderTransaction> {
        let status_name = self
            .status_name
            .parse::<PaymentStatus>()
            .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;

        Ok(OrderTransaction {
            id: self.id,
            quantity: self.quantity,
            total: self.total,
            payment_gateway_transaction_id: self.payment_gateway_transaction_id,
            created_at: self.created_at,
            charging_started_at: self.charging_started_at,
            product: Product {
                id: self.product_id,
                name: self.product_name,
                description: self.product_description,
                price: self.product_price,
                stock: self.product_stock,
                image: self.product_image,
            },
            delivery: Delivery {
                id: self.delivery_id,
                details: DeliveryDetails {
                    address: self.address,
                    country: self.country,
                    city: self.city,
                    region: self.region,
                    postal_code: self.postal_code,
                    destinataire_name: self.destinataire_name,
                },
                fee: self.fee,
            },
            customer: Customer {
                id: self.customer_id,
                name: self.customer_name,
                last_name: self.last_name,
                dni: self.dni,
                phone: self.phone,
                email: self.email,
            },
            status: TransactionStatus {
                id: self.status_id,
                name: status_name,
            },
            acceptances: LegalAcceptances {
                end_user_policy: Acceptance {
                    acceptance_token: self.end_user_policy_token,
                    permalink: self.end_user_policy_permalink,
                    kind: AcceptanceKind::EndUserPolicy,
                },
                personal_data_auth: Acceptance {
                    acceptance_token: self.personal_data_auth_token,
                    permalink: self.personal_data_auth_permalink,
                    kind: AcceptanceKind::PersonalDataAuth,
                },
            },
        })
    }
}
