//! Postgres implementation of CustomerRepository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Customer, NewCustomer};
use crate::ports::{CustomerRepository, RepositoryError, RepositoryResult};

#[derive(Clone)]
pub struct PostgresCustomerRepository {
    pool: PgPool,
}

impl PostgresCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerRepository for PostgresCustomerRepository {
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT id, name, last_name, dni, phone, email FROM customers WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.map(CustomerRow::into_domain))
    }

    async fn create(&self, customer: &NewCustomer) -> RepositoryResult<Customer> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            INSERT INTO customers (id, name, last_name, dni, phone, email)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, last_name, dni, phone, email
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&customer.name)
        .bind(&customer.last_name)
        .bind(&customer.dni)
        .bind(&customer.phone)
        .bind(&customer.email)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.into_domain())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    name: String,
    last_name: String,
    dni: String,
    phone: String,
    email: String,
}

impl CustomerRow {
    fn into_domain(self) -> Customer {
        Customer {
            id: self.id,
            name: self.name,
            last_name: self.last_name,
            dni: self.dni,
            phone: self.phone,
            email: self.email,
        }
    }
}
