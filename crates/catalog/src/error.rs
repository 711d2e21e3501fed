use thiserror::Error;

use mercato_core::{CategoryId, DomainError, Interrupted, StoreError};

/// Errors returned by catalog management and the category aggregator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No caller identity on the request. Raised before any store call.
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found")]
    NotFound,

    /// A product references a category that does not exist.
    #[error("unknown category {0}")]
    UnknownCategory(CategoryId),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Average requested over a category with no products.
    #[error("category {0} has no products")]
    EmptyCategory(CategoryId),

    #[error("persistence failure: {0}")]
    Persistence(StoreError),

    #[error("{0}")]
    Interrupted(Interrupted),
}

impl From<DomainError> for CatalogError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::NotFound => Self::NotFound,
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::Unauthenticated => Self::Unauthenticated,
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => Self::NotFound,
            StoreError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Persistence(other),
        }
    }
}

impl From<Interrupted> for CatalogError {
    fn from(value: Interrupted) -> Self {
        Self::Interrupted(value)
    }
}
