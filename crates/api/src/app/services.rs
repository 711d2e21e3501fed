//! Service wiring: stores, notifier and the application services over them.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use mercato_catalog::{CatalogService, CategoryAggregator, CategoryStore, ProductStore};
use mercato_core::StoreError;
use mercato_infra::config::AppConfig;
use mercato_infra::notify::ChannelNotifier;
use mercato_infra::store::{
    InMemoryCatalogStore, InMemoryCustomerStore, InMemoryOrderStore, PostgresCatalogStore,
    PostgresCustomerStore, PostgresOrderStore, postgres,
};
use mercato_parties::{CustomerService, CustomerStore};
use mercato_sales::{Notifier, OrderStore, OrderWorkflow, SmsAlert};

pub type Products = Arc<dyn ProductStore>;
pub type Categories = Arc<dyn CategoryStore>;
pub type Orders = Arc<dyn OrderStore>;
pub type Customers = Arc<dyn CustomerStore>;
pub type Notifications = Arc<dyn Notifier>;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Storage backends behind the service layer.
pub struct Stores {
    pub products: Products,
    pub categories: Categories,
    pub orders: Orders,
    pub customers: Customers,
}

impl Stores {
    pub fn in_memory() -> Self {
        let catalog = Arc::new(InMemoryCatalogStore::new());
        Self {
            products: catalog.clone(),
            categories: catalog,
            orders: Arc::new(InMemoryOrderStore::new()),
            customers: Arc::new(InMemoryCustomerStore::new()),
        }
    }

    pub fn postgres(pool: postgres::PgPool) -> Self {
        let catalog = Arc::new(PostgresCatalogStore::new(pool.clone()));
        Self {
            products: catalog.clone(),
            categories: catalog,
            orders: Arc::new(PostgresOrderStore::new(pool.clone())),
            customers: Arc::new(PostgresCustomerStore::new(pool)),
        }
    }
}

pub struct AppServices {
    pub catalog: CatalogService<Products, Categories>,
    pub aggregator: CategoryAggregator<Products>,
    pub orders: OrderWorkflow<Products, Orders, Notifications>,
    pub customers: CustomerService<Customers>,
    pub request_timeout: Duration,
}

impl AppServices {
    pub fn new(stores: Stores, notifier: Notifications, sms_alert: Option<SmsAlert>) -> Self {
        let mut orders = OrderWorkflow::new(stores.products.clone(), stores.orders, notifier);
        if let Some(alert) = sms_alert {
            orders = orders.with_sms_alert(alert);
        }

        Self {
            catalog: CatalogService::new(stores.products.clone(), stores.categories),
            aggregator: CategoryAggregator::new(stores.products),
            orders,
            customers: CustomerService::new(stores.customers),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// In-memory stores with the given notifier. Used by tests and local runs.
    pub fn in_memory(notifier: Notifications) -> Self {
        Self::new(Stores::in_memory(), notifier, None)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Postgres when `DATABASE_URL` is set, in-memory otherwise.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        let stores = match &config.database_url {
            Some(url) => {
                let pool = postgres::connect(url).await?;
                info!("connected to postgres");
                Stores::postgres(pool)
            }
            None => Stores::in_memory(),
        };

        let notifier: Notifications = Arc::new(ChannelNotifier::from_config(config));
        let sms_alert = config.order_alert.as_ref().map(|a| SmsAlert {
            recipients: a.recipients.clone(),
            sender_id: a.sender_id.clone(),
        });

        Ok(Self::new(stores, notifier, sms_alert).with_request_timeout(config.request_timeout))
    }
}
