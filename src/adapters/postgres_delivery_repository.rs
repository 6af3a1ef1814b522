use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Delivery, DeliveryDetails};
use crate::ports::{DeliveryRepository, RepositoryError, RepositoryResult};

#[derive(Clone)]
pub struct PostgresDeliveryRepository {
    pool: PgPool,
}

impl PostgresDeliveryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryRepository for PostgresDeliveryRepository {
    async fn insert(&self, details: &DeliveryDetails, fee: &BigDecimal) -> RepositoryResult<Delivery> {
        let row = sqlx::query_as::<_, DeliveryRow>(
            r#"
            INSERT INTO deliveries (
                id, address, country, city, region, postal_code, destinataire_name, fee
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, address, country, city, region, postal_code, destinataire_name, fee
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&details.address)
        .bind(&details.country)
        .bind(&details.city)
        .bind(&details.region)
        .bind(&details.postal_code)
        .bind(&details.destinataire_name)
        .bind(fee)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.into_domain())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DeliveryRow {
    id: Uuid,
    address: String,
    country: String,
    city: String,
    region: String,
    postal_code: String,
    destinataire_name: String,
    fee: BigDecimal,
}

impl DeliveryRow {
    fn into_domain(self) -> Delivery {
        Delivery {
            id: self.id,
            details: DeliveryDetails {
                address: self.address,
                country: self.country,
                city: self.city,
                region: self.region,
                postal_code: self.postal_code,
                destinataire_name: self.destinataire_name,
            },
            fee: self.fee,
        }
    }
}
