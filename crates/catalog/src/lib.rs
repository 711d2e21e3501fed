//! `mercato-catalog`: products, categories and the category price aggregate.

pub mod aggregator;
pub mod category;
pub mod error;
pub mod product;
pub mod service;
pub mod store;

pub use aggregator::{mean_price, CategoryAggregator};
pub use category::{Category, NewCategory};
pub use error::CatalogError;
pub use product::{NewProduct, Product, ProductChanges};
pub use service::CatalogService;
pub use store::{CategoryStore, ProductStore};
