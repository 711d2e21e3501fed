//! Order placement, pricing and notification.
//!
//! Domain types and ports live here; storage and channel adapters live in
//! `mercato-infra`.

pub mod error;
pub mod notifier;
pub mod order;
pub mod pricing;
pub mod store;
pub mod workflow;

pub use error::{NotificationFailure, OrderError};
pub use notifier::{Notifier, NotifyError};
pub use order::{LineRequest, NewOrder, Order, OrderItem, PricedLine, Purchaser};
pub use pricing::{line_total, PricedOrder, PricingEngine};
pub use store::OrderStore;
pub use workflow::{confirmation_body, OrderWorkflow, SmsAlert, CONFIRMATION_SUBJECT};
