use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{PaymentStatus, TransactionStatus};
use crate::ports::{RepositoryError, RepositoryResult, TransactionStatusRepository};

/// Reads the pre-seeded `transaction_statuses` table.
#[derive(Clone)]
pub struct PostgresTransactionStatusRepository {
    pool: PgPool,
}

impl PostgresTransactionStatusRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStatusRepository for PostgresTransactionStatusRepository {
    async fn find_by_name(&self, name: PaymentStatus) -> RepositoryResult<Option<TransactionStatus>> {
        let id = sqlx::query_scalar::<_, i32>("SELECT id FROM transaction_statuses WHERE name = $1")
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        Ok(id.map(|id| TransactionStatus { id, name }))
    }
}
