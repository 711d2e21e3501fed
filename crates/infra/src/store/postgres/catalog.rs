use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use mercato_catalog::{Category, CategoryStore, NewCategory, NewProduct, Product, ProductStore};
use mercato_core::{CategoryId, Entity, ProductId, StoreError};

use super::{decode_error, map_sqlx_error, out_of_range};

/// Products and categories in Postgres.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let decode = |e: sqlx::Error| decode_error("product", e);
    let id: i64 = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let price: Decimal = row.try_get("price").map_err(decode)?;
    let category_id: i64 = row.try_get("category_id").map_err(decode)?;
    Ok(Product::from_parts(
        ProductId::try_from_i64(id).map_err(out_of_range)?,
        name,
        price,
        CategoryId::try_from_i64(category_id).map_err(out_of_range)?,
    ))
}

fn category_from_row(row: &PgRow) -> Result<Category, StoreError> {
    let decode = |e: sqlx::Error| decode_error("category", e);
    let id: i64 = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    Ok(Category::from_parts(
        CategoryId::try_from_i64(id).map_err(out_of_range)?,
        name,
    ))
}

#[async_trait]
impl ProductStore for PostgresCatalogStore {
    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get(&self, id: ProductId) -> Result<Product, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, price, category_id
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.to_i64().map_err(out_of_range)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.as_ref().map(product_from_row).unwrap_or(Err(StoreError::NotFound))
    }

    #[instrument(skip(self), fields(category_id = %category_id), err)]
    async fn list_by_category(&self, category_id: CategoryId) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, price, category_id
            FROM products
            WHERE category_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(category_id.to_i64().map_err(out_of_range)?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products_by_category", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, price, category_id
            FROM products
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self, product), fields(category_id = %product.category_id), err)]
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, price, category_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, price, category_id
            "#,
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(product.category_id.to_i64().map_err(out_of_range)?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        product_from_row(&row)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id()), err)]
    async fn update(&self, product: &Product) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, price = $3, category_id = $4
            WHERE id = $1
            "#,
        )
        .bind(product.id().to_i64().map_err(out_of_range)?)
        .bind(product.name())
        .bind(product.price())
        .bind(product.category_id().to_i64().map_err(out_of_range)?)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.to_i64().map_err(out_of_range)?)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for PostgresCatalogStore {
    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn get(&self, id: CategoryId) -> Result<Category, StoreError> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = $1")
            .bind(id.to_i64().map_err(out_of_range)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;

        row.as_ref().map(category_from_row).unwrap_or(Err(StoreError::NotFound))
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;

        rows.iter().map(category_from_row).collect()
    }

    #[instrument(skip(self, category), err)]
    async fn create(&self, category: NewCategory) -> Result<Category, StoreError> {
        let row = sqlx::query("INSERT INTO categories (name) VALUES ($1) RETURNING id, name")
            .bind(&category.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_category", e))?;

        category_from_row(&row)
    }

    #[instrument(skip(self, category), fields(category_id = %category.id()), err)]
    async fn update(&self, category: &Category) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE categories SET name = $2 WHERE id = $1")
            .bind(category.id().to_i64().map_err(out_of_range)?)
            .bind(category.name())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_category", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Fails with `Conflict` (foreign key violation) while products still
    /// reference the category.
    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn delete(&self, id: CategoryId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.to_i64().map_err(out_of_range)?)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
