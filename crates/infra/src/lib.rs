//! Infrastructure layer: storage adapters, notification channels, config.

pub mod config;
pub mod notify;
pub mod store;

mod integration_tests;
