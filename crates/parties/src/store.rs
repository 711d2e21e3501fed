use std::sync::Arc;

use async_trait::async_trait;

use mercato_core::{CustomerId, StoreError};

use crate::customer::{Customer, CustomerProfile};

/// Durable storage of customers.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Insert a customer, or update name, verified flag, phone and picture of
    /// the customer already holding `profile.email`.
    async fn upsert_by_email(&self, profile: CustomerProfile) -> Result<Customer, StoreError>;

    async fn get(&self, id: CustomerId) -> Result<Customer, StoreError>;

    async fn get_by_email(&self, email: &str) -> Result<Customer, StoreError>;
}

#[async_trait]
impl<S> CustomerStore for Arc<S>
where
    S: CustomerStore + ?Sized,
{
    async fn upsert_by_email(&self, profile: CustomerProfile) -> Result<Customer, StoreError> {
        (**self).upsert_by_email(profile).await
    }

    async fn get(&self, id: CustomerId) -> Result<Customer, StoreError> {
        (**self).get(id).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Customer, StoreError> {
        (**self).get_by_email(email).await
    }
}
