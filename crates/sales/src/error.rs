use thiserror::Error;

use mercato_core::{DomainError, Interrupted, ProductId, StoreError};

use crate::notifier::NotifyError;
use crate::order::Order;

/// Why the post-commit notification did not go out.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotificationFailure {
    /// The request was cancelled or timed out before the channel answered.
    #[error("notification abandoned: {0}")]
    Interrupted(Interrupted),

    /// The channel itself failed.
    #[error("notification channel failed: {0}")]
    Channel(NotifyError),
}

/// Errors returned by the order workflow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// No caller identity on the request. Raised before any other work.
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("order must contain at least one line")]
    EmptyOrder,

    #[error("invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    #[error("unknown product {0}")]
    InvalidProduct(ProductId),

    #[error("order not found")]
    NotFound,

    #[error("persistence failure: {0}")]
    Persistence(StoreError),

    /// Interrupted before anything was written.
    #[error("{0}")]
    Cancelled(Interrupted),

    /// The order was committed but the confirmation did not go out.
    ///
    /// Callers must treat this as a successful order and never resubmit it.
    #[error("order {} committed, {cause}", .order.id)]
    NotificationFailed {
        order: Box<Order>,
        cause: NotificationFailure,
    },
}

impl OrderError {
    /// The committed order carried by a `NotificationFailed` error.
    pub fn committed_order(&self) -> Option<&Order> {
        match self {
            Self::NotificationFailed { order, .. } => Some(order),
            _ => None,
        }
    }
}

impl From<StoreError> for OrderError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => Self::NotFound,
            other => Self::Persistence(other),
        }
    }
}

impl From<Interrupted> for OrderError {
    fn from(value: Interrupted) -> Self {
        Self::Cancelled(value)
    }
}

impl From<DomainError> for OrderError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::NotFound => Self::NotFound,
            DomainError::Unauthenticated => Self::Unauthenticated,
            other => Self::Persistence(StoreError::rejected(other.to_string())),
        }
    }
}
