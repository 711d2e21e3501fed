use std::sync::Arc;

use async_trait::async_trait;

use mercato_core::{OrderId, StoreError};

use crate::order::{NewOrder, Order};

/// Durable storage of orders and their items.
///
/// `create` and `delete` are atomic over the order row and all of its items:
/// no other caller may observe an order without items or items without an
/// order. A `create` future dropped before completion must leave nothing behind.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist the order with its items and assign all identifiers.
    async fn create(&self, order: NewOrder) -> Result<Order, StoreError>;

    async fn get(&self, id: OrderId) -> Result<Order, StoreError>;

    async fn list(&self) -> Result<Vec<Order>, StoreError>;

    /// Replace the stored order and its items with `order`, verbatim.
    async fn update(&self, order: &Order) -> Result<(), StoreError>;

    /// Remove the order and cascade its items.
    async fn delete(&self, id: OrderId) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    async fn create(&self, order: NewOrder) -> Result<Order, StoreError> {
        (**self).create(order).await
    }

    async fn get(&self, id: OrderId) -> Result<Order, StoreError> {
        (**self).get(id).await
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        (**self).list().await
    }

    async fn update(&self, order: &Order) -> Result<(), StoreError> {
        (**self).update(order).await
    }

    async fn delete(&self, id: OrderId) -> Result<(), StoreError> {
        (**self).delete(id).await
    }
}
