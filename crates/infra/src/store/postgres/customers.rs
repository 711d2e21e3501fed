use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use mercato_core::{CustomerId, StoreError};
use mercato_parties::{Customer, CustomerProfile, CustomerStore};

use super::{decode_error, map_sqlx_error, out_of_range};

#[derive(Debug, Clone)]
pub struct PostgresCustomerStore {
    pool: PgPool,
}

impl PostgresCustomerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn customer_from_row(row: &PgRow) -> Result<Customer, StoreError> {
    let decode = |e: sqlx::Error| decode_error("customer", e);
    let id: i64 = row.try_get("id").map_err(decode)?;
    Ok(Customer {
        id: CustomerId::try_from_i64(id).map_err(out_of_range)?,
        name: row.try_get("name").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        verified_email: row.try_get("verified_email").map_err(decode)?,
        phone: row.try_get("phone").map_err(decode)?,
        picture: row.try_get("picture").map_err(decode)?,
    })
}

#[async_trait]
impl CustomerStore for PostgresCustomerStore {
    /// Insert a new customer, or refresh the existing row with the same email.
    #[instrument(skip(self, profile), err)]
    async fn upsert_by_email(&self, profile: CustomerProfile) -> Result<Customer, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO customers (name, email, verified_email, phone, picture)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name,
                verified_email = EXCLUDED.verified_email,
                phone = EXCLUDED.phone,
                picture = EXCLUDED.picture
            RETURNING id, name, email, verified_email, phone, picture
            "#,
        )
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(profile.verified_email)
        .bind(&profile.phone)
        .bind(&profile.picture)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_customer", e))?;

        customer_from_row(&row)
    }

    #[instrument(skip(self), fields(customer_id = %id), err)]
    async fn get(&self, id: CustomerId) -> Result<Customer, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, verified_email, phone, picture
            FROM customers
            WHERE id = $1
            "#,
        )
        .bind(id.to_i64().map_err(out_of_range)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_customer", e))?
        .ok_or(StoreError::NotFound)?;

        customer_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn get_by_email(&self, email: &str) -> Result<Customer, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, verified_email, phone, picture
            FROM customers
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_customer_by_email", e))?
        .ok_or(StoreError::NotFound)?;

        customer_from_row(&row)
    }
}
