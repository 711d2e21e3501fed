//! Customer profiles.
//!
//! Customers are created or refreshed from the identity provider's profile,
//! keyed by email. The order workflow only ever reads the resulting identity.

pub mod customer;
pub mod service;
pub mod store;

pub use customer::{Customer, CustomerProfile};
pub use service::{CustomerError, CustomerService};
pub use store::CustomerStore;
