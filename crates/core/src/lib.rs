//! `mercato-core`: domain foundation building blocks.
//!
//! This crate contains identifiers, the shared error model and the per-request
//! call context. No storage or transport concerns live here.

pub mod context;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use context::{CancelSignal, Canceller, Identity, Interrupted, RequestContext};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, StoreError};
pub use id::{CategoryId, CustomerId, OrderId, OrderItemId, ProductId, RequestId};
pub use value_object::ValueObject;
