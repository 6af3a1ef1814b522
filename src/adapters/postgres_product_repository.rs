//! Postgres implementation of ProductRepository.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Product;
use crate::ports::{ProductRepository, RepositoryError, RepositoryResult};

#[derive(Clone)]
pub struct PostgresProductRepository {
    pool: PgPool,
}

impl PostgresProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PostgresProductRepository {
    async fn list(&self) -> RepositoryResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, description, price, stock, image FROM products ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows.into_iter().map(ProductRow::into_domain).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, description, price, stock, image FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.map(ProductRow::into_domain))
    }

    async fn update_stock(&self, id: Uuid, delta: i32) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1 AND stock + $2 >= 0")
            .bind(id)
            .bind(delta)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            let available = sqlx::query_scalar::<_, i32>("SELECT stock FROM products WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(RepositoryError::from)?;

            return Err(match available {
                Some(available) => RepositoryError::InsufficientStock {
                    product_id: id,
                    requested: -delta,
                    available,
                },
                None => RepositoryError::NotFound(format!("product {}", id)),
            });
        }
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    price: BigDecimal,
    stock: i32,
    image: Option<String>,
}

impl ProductRow {
    fn into_domain(self) -> Product {
        Product {
            id: self.id,
            name: self.name,
            description: self.description,
            price: self.price,
            stock: self.stock,
            image: self.image,
        }
    }
}
