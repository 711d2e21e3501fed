use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{instrument, Span};

use mercato_core::{CustomerId, OrderId, OrderItemId, ProductId, StoreError};
use mercato_sales::{NewOrder, Order, OrderItem, OrderStore, Purchaser};

use super::{decode_error, map_sqlx_error, out_of_range};

/// Orders and their items in Postgres.
///
/// An order row and all of its item rows are written in one transaction.
/// Deleting an order cascades to its items through the foreign key.
#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

struct OrderRow {
    id: OrderId,
    purchaser: Purchaser,
    total_price: Decimal,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn from_row(row: &PgRow) -> Result<Self, StoreError> {
        let decode = |e: sqlx::Error| decode_error("order", e);
        let id: i64 = row.try_get("id").map_err(decode)?;
        let customer_id: Option<i64> = row.try_get("customer_id").map_err(decode)?;
        Ok(Self {
            id: OrderId::try_from_i64(id).map_err(out_of_range)?,
            purchaser: Purchaser {
                email: row.try_get("customer_email").map_err(decode)?,
                customer_id: customer_id
                    .map(CustomerId::try_from_i64)
                    .transpose()
                    .map_err(out_of_range)?,
            },
            total_price: row.try_get("total_price").map_err(decode)?,
            created_at: row.try_get("created_at").map_err(decode)?,
        })
    }

    fn with_items(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            purchaser: self.purchaser,
            items,
            total_price: self.total_price,
            created_at: self.created_at,
        }
    }
}

fn item_from_row(row: &PgRow) -> Result<OrderItem, StoreError> {
    let decode = |e: sqlx::Error| decode_error("order_item", e);
    let id: i64 = row.try_get("id").map_err(decode)?;
    let order_id: i64 = row.try_get("order_id").map_err(decode)?;
    let product_id: i64 = row.try_get("product_id").map_err(decode)?;
    let quantity: i32 = row.try_get("quantity").map_err(decode)?;
    Ok(OrderItem {
        id: OrderItemId::try_from_i64(id).map_err(out_of_range)?,
        order_id: OrderId::try_from_i64(order_id).map_err(out_of_range)?,
        product_id: ProductId::try_from_i64(product_id).map_err(out_of_range)?,
        quantity: u32::try_from(quantity)
            .map_err(|_| StoreError::rejected(format!("negative quantity {quantity} in order_items")))?,
        price: row.try_get("price").map_err(decode)?,
    })
}

fn quantity_column(quantity: u32) -> Result<i32, StoreError> {
    i32::try_from(quantity).map_err(|_| StoreError::rejected(format!("quantity {quantity} out of range")))
}

fn customer_column(purchaser: &Purchaser) -> Result<Option<i64>, StoreError> {
    purchaser
        .customer_id
        .map(|id| id.to_i64())
        .transpose()
        .map_err(out_of_range)
}

/// Insert one item row inside an open transaction.
async fn insert_item(
    tx: &mut Transaction<'_, Postgres>,
    item_id: Option<OrderItemId>,
    order_id: OrderId,
    product_id: ProductId,
    quantity: u32,
    price: Decimal,
) -> Result<OrderItem, StoreError> {
    let row = match item_id {
        Some(id) => sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, order_id, product_id, quantity, price
            "#,
        )
        .bind(id.to_i64().map_err(out_of_range)?),
        None => sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, order_id, product_id, quantity, price
            "#,
        ),
    }
    .bind(order_id.to_i64().map_err(out_of_range)?)
    .bind(product_id.to_i64().map_err(out_of_range)?)
    .bind(quantity_column(quantity)?)
    .bind(price)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_order_item", e))?;

    item_from_row(&row)
}

/// Ids to write for a replacement item list: an id the order already owns is
/// kept once, anything else is left to the sequence.
fn retained_item_ids(mut owned: HashSet<OrderItemId>, items: &[OrderItem]) -> Vec<Option<OrderItemId>> {
    items
        .iter()
        .map(|item| owned.remove(&item.id).then_some(item.id))
        .collect()
}

impl PostgresOrderStore {
    async fn items_for(&self, order_ids: &[i64]) -> Result<HashMap<OrderId, Vec<OrderItem>>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_order_items", e))?;

        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in &rows {
            let item = item_from_row(row)?;
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[instrument(
        skip(self, order),
        fields(item_count = order.items.len(), order_id),
        err
    )]
    async fn create(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            r#"
            INSERT INTO orders (customer_id, customer_email, total_price, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, customer_id, customer_email, total_price, created_at
            "#,
        )
        .bind(customer_column(&order.purchaser)?)
        .bind(&order.purchaser.email)
        .bind(order.total_price)
        .bind(order.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        let header = OrderRow::from_row(&row)?;
        Span::current().record("order_id", header.id.get());

        let mut items = Vec::with_capacity(order.items.len());
        for line in order.items {
            items.push(
                insert_item(&mut tx, None, header.id, line.product_id, line.quantity, line.price).await?,
            );
        }

        // Dropping `tx` before this point rolls everything back.
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(header.with_items(items))
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn get(&self, id: OrderId) -> Result<Order, StoreError> {
        let key = id.to_i64().map_err(out_of_range)?;
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, customer_email, total_price, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?
        .ok_or(StoreError::NotFound)?;

        let header = OrderRow::from_row(&row)?;
        let mut items = self.items_for(&[key]).await?;
        let items = items.remove(&header.id).unwrap_or_default();
        Ok(header.with_items(items))
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, customer_email, total_price, created_at
            FROM orders
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        let headers = rows
            .iter()
            .map(OrderRow::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let keys = headers
            .iter()
            .map(|h| h.id.to_i64().map_err(out_of_range))
            .collect::<Result<Vec<_>, _>>()?;
        let mut items = self.items_for(&keys).await?;

        Ok(headers
            .into_iter()
            .map(|h| {
                let lines = items.remove(&h.id).unwrap_or_default();
                h.with_items(lines)
            })
            .collect())
    }

    /// Replace the order row and its items. Item ids the order does not
    /// already own are reassigned; ids owned by another order are a conflict.
    #[instrument(skip(self, order), fields(order_id = %order.id), err)]
    async fn update(&self, order: &Order) -> Result<(), StoreError> {
        let key = order.id.to_i64().map_err(out_of_range)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET customer_id = $2, customer_email = $3, total_price = $4, created_at = $5
            WHERE id = $1
            "#,
        )
        .bind(key)
        .bind(customer_column(&order.purchaser)?)
        .bind(&order.purchaser.email)
        .bind(order.total_price)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_order", e))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::NotFound);
        }

        let requested = order
            .items
            .iter()
            .map(|i| i.id.to_i64().map_err(out_of_range))
            .collect::<Result<Vec<_>, _>>()?;
        let foreign = sqlx::query("SELECT id FROM order_items WHERE id = ANY($1) AND order_id <> $2 LIMIT 1")
            .bind(requested.as_slice())
            .bind(key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("check_order_items", e))?;
        if let Some(row) = foreign {
            let id: i64 = row.try_get("id").map_err(|e| decode_error("order_item", e))?;
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::conflict(format!("order item {id} belongs to another order")));
        }

        let owned = sqlx::query("SELECT id FROM order_items WHERE order_id = $1")
            .bind(key)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("load_order_items", e))?
            .iter()
            .map(|row| {
                let id: i64 = row.try_get("id").map_err(|e| decode_error("order_item", e))?;
                OrderItemId::try_from_i64(id).map_err(out_of_range)
            })
            .collect::<Result<HashSet<_>, _>>()?;

        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("replace_order_items", e))?;

        let ids = retained_item_ids(owned, &order.items);
        for (item, id) in order.items.iter().zip(ids) {
            insert_item(
                &mut tx,
                id,
                order.id,
                item.product_id,
                item.quantity,
                item.price,
            )
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn delete(&self, id: OrderId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.to_i64().map_err(out_of_range)?)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
