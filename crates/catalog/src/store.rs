//! Catalog storage ports.
//!
//! Adapters live in `mercato-infra` (Postgres and in-memory). Implementations
//! must be cancel-safe: callers race every call against the request's
//! cancellation signal and drop the future when it fires.

use std::sync::Arc;

use async_trait::async_trait;

use mercato_core::{CategoryId, ProductId, StoreError};

use crate::category::{Category, NewCategory};
use crate::product::{NewProduct, Product};

/// Durable storage of products.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Point lookup. Returns `StoreError::NotFound` for an unknown id.
    async fn get(&self, id: ProductId) -> Result<Product, StoreError>;

    /// All products tagged with `category_id`, in id order.
    async fn list_by_category(&self, category_id: CategoryId) -> Result<Vec<Product>, StoreError>;

    async fn list(&self) -> Result<Vec<Product>, StoreError>;

    /// Store a new product and assign its identifier.
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError>;

    async fn update(&self, product: &Product) -> Result<(), StoreError>;

    async fn delete(&self, id: ProductId) -> Result<(), StoreError>;
}

/// Durable storage of categories.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn get(&self, id: CategoryId) -> Result<Category, StoreError>;

    async fn list(&self) -> Result<Vec<Category>, StoreError>;

    async fn create(&self, category: NewCategory) -> Result<Category, StoreError>;

    async fn update(&self, category: &Category) -> Result<(), StoreError>;

    /// Remove a category. Adapters reject this with `StoreError::Conflict` while
    /// products still reference the category.
    async fn delete(&self, id: CategoryId) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    async fn get(&self, id: ProductId) -> Result<Product, StoreError> {
        (**self).get(id).await
    }

    async fn list_by_category(&self, category_id: CategoryId) -> Result<Vec<Product>, StoreError> {
        (**self).list_by_category(category_id).await
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        (**self).list().await
    }

    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        (**self).create(product).await
    }

    async fn update(&self, product: &Product) -> Result<(), StoreError> {
        (**self).update(product).await
    }

    async fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        (**self).delete(id).await
    }
}

#[async_trait]
impl<S> CategoryStore for Arc<S>
where
    S: CategoryStore + ?Sized,
{
    async fn get(&self, id: CategoryId) -> Result<Category, StoreError> {
        (**self).get(id).await
    }

    async fn list(&self) -> Result<Vec<Category>, StoreError> {
        (**self).list().await
    }

    async fn create(&self, category: NewCategory) -> Result<Category, StoreError> {
        (**self).create(category).await
    }

    async fn update(&self, category: &Category) -> Result<(), StoreError> {
        (**self).update(category).await
    }

    async fn delete(&self, id: CategoryId) -> Result<(), StoreError> {
        (**self).delete(id).await
    }
}
