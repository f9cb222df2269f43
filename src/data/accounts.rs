use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::*;

/// Maps a unique-email violation to a client error and everything else to a database error.
fn duplicate_email(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::BadRequest(message.to_string())
        }
        _ => AppError::DatabaseError(err),
    }
}

/// Persistence for customer and provider accounts.
pub struct AccountStore {
    pool: PgPool,
}

impl AccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_customer(
        &self,
        customer: &NewCustomer,
        password_hash: &str,
    ) -> Result<Customer, AppError> {
        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (id, name, email, password_hash, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(password_hash)
        .bind(&customer.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| duplicate_email(e, "Customer already exists with this email"))
    }

    pub async fn insert_provider(
        &self,
        provider: &NewProvider,
        password_hash: &str,
    ) -> Result<Provider, AppError> {
        let service_types: Vec<&str> = provider.service_types.iter().map(|s| s.as_str()).collect();

        sqlx::query_as::<_, Provider>(
            r#"
            INSERT INTO providers (id, business_name, owner_name, email, password_hash, phone, service_types)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&provider.business_name)
        .bind(&provider.owner_name)
        .bind(&provider.email)
        .bind(password_hash)
        .bind(&provider.phone)
        .bind(&service_types)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| duplicate_email(e, "Provider already exists with this email"))
    }

    pub async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    pub async fn find_provider(&self, id: Uuid) -> Result<Option<Provider>, AppError> {
        let provider = sqlx::query_as::<_, Provider>("SELECT * FROM providers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(provider)
    }

    pub async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    pub async fn find_provider_by_email(&self, email: &str) -> Result<Option<Provider>, AppError> {
        let provider = sqlx::query_as::<_, Provider>("SELECT * FROM providers WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(provider)
    }
}
