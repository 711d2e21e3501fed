//! Postgres-backed stores.
//!
//! Queries are built at runtime with `sqlx::query(..).bind(..)`; nothing here
//! needs a live database at compile time. Migrations are managed outside this
//! crate. The adapters expect this schema:
//!
//! ```sql
//! CREATE TABLE categories (
//!     id   BIGSERIAL PRIMARY KEY,
//!     name TEXT NOT NULL
//! );
//!
//! CREATE TABLE products (
//!     id          BIGSERIAL PRIMARY KEY,
//!     name        TEXT NOT NULL,
//!     price       NUMERIC NOT NULL CHECK (price >= 0),
//!     category_id BIGINT NOT NULL REFERENCES categories (id) ON DELETE RESTRICT
//! );
//!
//! CREATE TABLE customers (
//!     id             BIGSERIAL PRIMARY KEY,
//!     name           TEXT NOT NULL,
//!     email          TEXT NOT NULL UNIQUE,
//!     verified_email BOOLEAN NOT NULL DEFAULT FALSE,
//!     phone          TEXT,
//!     picture        TEXT
//! );
//!
//! CREATE TABLE orders (
//!     id             BIGSERIAL PRIMARY KEY,
//!     customer_id    BIGINT,
//!     customer_email TEXT NOT NULL,
//!     total_price    NUMERIC NOT NULL,
//!     created_at     TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE order_items (
//!     id         BIGSERIAL PRIMARY KEY,
//!     order_id   BIGINT NOT NULL REFERENCES orders (id) ON DELETE CASCADE,
//!     product_id BIGINT NOT NULL,
//!     quantity   INTEGER NOT NULL CHECK (quantity > 0),
//!     price      NUMERIC NOT NULL
//! );
//! ```
//!
//! `order_items.product_id` deliberately has no foreign key: a line keeps its
//! price snapshot after the product is edited or removed.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `Conflict` |
//! | Database (check constraint violation) | `23514` | `Rejected` |
//! | Database (other) | Any other | `Rejected` |
//! | PoolClosed / PoolTimedOut / Io / Tls | N/A | `Unavailable` |
//! | RowNotFound | N/A | `NotFound` |
//! | Other | N/A | `Rejected` |

mod catalog;
mod customers;
mod orders;

use std::time::Duration;

use secrecy::ExposeSecret;
use secrecy::SecretString;
pub use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use mercato_core::{DomainError, StoreError};

pub use catalog::PostgresCatalogStore;
pub use customers::PostgresCustomerStore;
pub use orders::PostgresOrderStore;

/// Open a connection pool.
pub async fn connect(database_url: &SecretString) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url.expose_secret())
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

/// Map SQLx errors to StoreError.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") => StoreError::Conflict(msg),
                _ => StoreError::Rejected(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::unavailable(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::Tls(e) => StoreError::unavailable(format!("tls error in {operation}: {e}")),
        other => StoreError::rejected(format!("sqlx error in {operation}: {other}")),
    }
}

/// Ids and quantities that do not fit their column types.
pub(crate) fn out_of_range(err: DomainError) -> StoreError {
    StoreError::rejected(err.to_string())
}

pub(crate) fn decode_error(operation: &str, err: sqlx::Error) -> StoreError {
    StoreError::rejected(format!("failed to decode row in {operation}: {err}"))
}
