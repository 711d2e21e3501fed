use thiserror::Error;
use tracing::info;

use mercato_core::{CustomerId, DomainError, Interrupted, RequestContext, StoreError};

use crate::customer::{normalize_email, Customer, CustomerProfile};
use crate::store::CustomerStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CustomerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("customer not found")]
    NotFound,

    #[error("persistence failure: {0}")]
    Persistence(StoreError),

    #[error("{0}")]
    Interrupted(Interrupted),
}

impl From<DomainError> for CustomerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::NotFound => Self::NotFound,
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<StoreError> for CustomerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => Self::NotFound,
            other => Self::Persistence(other),
        }
    }
}

impl From<Interrupted> for CustomerError {
    fn from(value: Interrupted) -> Self {
        Self::Interrupted(value)
    }
}

#[derive(Debug, Clone)]
pub struct CustomerService<S> {
    store: S,
}

impl<S> CustomerService<S>
where
    S: CustomerStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create or refresh the customer keyed by `profile.email`.
    pub async fn upsert(
        &self,
        ctx: &RequestContext,
        profile: CustomerProfile,
    ) -> Result<Customer, CustomerError> {
        let profile = profile.normalized()?;
        let customer = ctx.bound(self.store.upsert_by_email(profile)).await??;
        info!(customer_id = %customer.id, "customer profile upserted");
        Ok(customer)
    }

    pub async fn get(&self, ctx: &RequestContext, id: CustomerId) -> Result<Customer, CustomerError> {
        Ok(ctx.bound(self.store.get(id)).await??)
    }

    pub async fn find_by_email(&self, ctx: &RequestContext, email: &str) -> Result<Customer, CustomerError> {
        let email = normalize_email(email)?;
        Ok(ctx.bound(self.store.get_by_email(&email)).await??)
    }
}
