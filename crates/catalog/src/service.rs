//! Catalog management: category and product CRUD with validation.
//!
//! Every operation requires a caller identity on the request context.

use tracing::info;

use mercato_core::{CategoryId, Entity, ProductId, RequestContext, StoreError};

use crate::category::{Category, NewCategory};
use crate::error::CatalogError;
use crate::product::{NewProduct, Product, ProductChanges};
use crate::store::{CategoryStore, ProductStore};

#[derive(Debug, Clone)]
pub struct CatalogService<P, C> {
    products: P,
    categories: C,
}

impl<P, C> CatalogService<P, C>
where
    P: ProductStore,
    C: CategoryStore,
{
    pub fn new(products: P, categories: C) -> Self {
        Self {
            products,
            categories,
        }
    }

    pub async fn create_category(
        &self,
        ctx: &RequestContext,
        name: impl Into<String>,
    ) -> Result<Category, CatalogError> {
        ctx.require_identity()?;
        let new = NewCategory::new(name)?;
        let category = ctx.bound(self.categories.create(new)).await??;
        info!(category_id = %category.id(), "category created");
        Ok(category)
    }

    pub async fn get_category(
        &self,
        ctx: &RequestContext,
        id: CategoryId,
    ) -> Result<Category, CatalogError> {
        ctx.require_identity()?;
        Ok(ctx.bound(self.categories.get(id)).await??)
    }

    pub async fn list_categories(&self, ctx: &RequestContext) -> Result<Vec<Category>, CatalogError> {
        ctx.require_identity()?;
        Ok(ctx.bound(self.categories.list()).await??)
    }

    pub async fn rename_category(
        &self,
        ctx: &RequestContext,
        id: CategoryId,
        name: impl Into<String>,
    ) -> Result<Category, CatalogError> {
        ctx.require_identity()?;
        let mut category = ctx.bound(self.categories.get(id)).await??;
        category.rename(name)?;
        ctx.bound(self.categories.update(&category)).await??;
        Ok(category)
    }

    /// Delete a category. Rejected with `Conflict` while products reference it.
    pub async fn delete_category(&self, ctx: &RequestContext, id: CategoryId) -> Result<(), CatalogError> {
        ctx.require_identity()?;
        let in_use = ctx.bound(self.products.list_by_category(id)).await??;
        if !in_use.is_empty() {
            return Err(CatalogError::Conflict(format!(
                "category {id} is referenced by {} product(s)",
                in_use.len()
            )));
        }
        ctx.bound(self.categories.delete(id)).await??;
        info!(category_id = %id, "category deleted");
        Ok(())
    }

    pub async fn create_product(
        &self,
        ctx: &RequestContext,
        new: NewProduct,
    ) -> Result<Product, CatalogError> {
        ctx.require_identity()?;
        let new = new.validated()?;
        self.ensure_category(ctx, new.category_id).await?;
        let product = ctx.bound(self.products.create(new)).await??;
        info!(
            product_id = %product.id(),
            category_id = %product.category_id(),
            price = %product.price(),
            "product created"
        );
        Ok(product)
    }

    pub async fn get_product(&self, ctx: &RequestContext, id: ProductId) -> Result<Product, CatalogError> {
        ctx.require_identity()?;
        Ok(ctx.bound(self.products.get(id)).await??)
    }

    pub async fn list_products(&self, ctx: &RequestContext) -> Result<Vec<Product>, CatalogError> {
        ctx.require_identity()?;
        Ok(ctx.bound(self.products.list()).await??)
    }

    /// Apply a partial update to a product.
    ///
    /// Existing orders keep the prices they were created with.
    pub async fn update_product(
        &self,
        ctx: &RequestContext,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product, CatalogError> {
        ctx.require_identity()?;
        let mut product = ctx.bound(self.products.get(id)).await??;
        if changes.is_empty() {
            return Ok(product);
        }
        if let Some(category_id) = changes.category_id {
            self.ensure_category(ctx, category_id).await?;
        }
        product.apply_changes(changes)?;
        ctx.bound(self.products.update(&product)).await??;
        info!(product_id = %id, price = %product.price(), "product updated");
        Ok(product)
    }

    pub async fn delete_product(&self, ctx: &RequestContext, id: ProductId) -> Result<(), CatalogError> {
        ctx.require_identity()?;
        ctx.bound(self.products.delete(id)).await??;
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    async fn ensure_category(&self, ctx: &RequestContext, id: CategoryId) -> Result<(), CatalogError> {
        match ctx.bound(self.categories.get(id)).await? {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound) => Err(CatalogError::UnknownCategory(id)),
            Err(e) => Err(e.into()),
        }
    }
}
