//! Storage adapters for the catalog, order and customer ports.

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryCatalogStore, InMemoryCustomerStore, InMemoryOrderStore};
pub use postgres::{PostgresCatalogStore, PostgresCustomerStore, PostgresOrderStore};
