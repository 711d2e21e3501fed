//! In-memory stores for tests/dev.
//!
//! Each store keeps its state behind one `RwLock`, so a multi-row write such as
//! order creation is applied under a single write guard and is never partially
//! visible. Guards are never held across an `.await`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use mercato_catalog::{Category, CategoryStore, NewCategory, NewProduct, Product, ProductStore};
use mercato_core::{CategoryId, CustomerId, Entity, OrderId, OrderItemId, ProductId, StoreError};
use mercato_parties::{Customer, CustomerProfile, CustomerStore};
use mercato_sales::{NewOrder, Order, OrderItem, OrderStore};

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::unavailable("in-memory store lock poisoned")
}

/// Serial keyed table with a monotonically increasing id counter.
#[derive(Debug)]
struct Table<V> {
    next_id: u64,
    rows: BTreeMap<u64, V>,
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<V> Table<V> {
    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

// -------------------------
// Catalog
// -------------------------

/// In-memory products and categories.
///
/// Both ports share one lock so that deleting a category can check for
/// referencing products atomically.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    inner: RwLock<CatalogTables>,
}

#[derive(Debug, Default)]
struct CatalogTables {
    products: Table<Product>,
    categories: Table<Category>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for InMemoryCatalogStore {
    async fn get(&self, id: ProductId) -> Result<Product, StoreError> {
        let tables = self.inner.read().map_err(poisoned)?;
        tables
            .products
            .rows
            .get(&id.get())
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_by_category(&self, category_id: CategoryId) -> Result<Vec<Product>, StoreError> {
        let tables = self.inner.read().map_err(poisoned)?;
        Ok(tables
            .products
            .rows
            .values()
            .filter(|p| p.category_id() == category_id)
            .cloned()
            .collect())
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let tables = self.inner.read().map_err(poisoned)?;
        Ok(tables.products.rows.values().cloned().collect())
    }

    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut tables = self.inner.write().map_err(poisoned)?;
        if !tables.categories.rows.contains_key(&product.category_id.get()) {
            return Err(StoreError::conflict(format!(
                "category {} does not exist",
                product.category_id
            )));
        }
        let id = tables.products.allocate();
        let stored = Product::from_parts(ProductId::new(id), product.name, product.price, product.category_id);
        tables.products.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, product: &Product) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(poisoned)?;
        if !tables.categories.rows.contains_key(&product.category_id().get()) {
            return Err(StoreError::conflict(format!(
                "category {} does not exist",
                product.category_id()
            )));
        }
        let slot = tables
            .products
            .rows
            .get_mut(&product.id().get())
            .ok_or(StoreError::NotFound)?;
        *slot = product.clone();
        Ok(())
    }

    async fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(poisoned)?;
        tables
            .products
            .rows
            .remove(&id.get())
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl CategoryStore for InMemoryCatalogStore {
    async fn get(&self, id: CategoryId) -> Result<Category, StoreError> {
        let tables = self.inner.read().map_err(poisoned)?;
        tables
            .categories
            .rows
            .get(&id.get())
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self) -> Result<Vec<Category>, StoreError> {
        let tables = self.inner.read().map_err(poisoned)?;
        Ok(tables.categories.rows.values().cloned().collect())
    }

    async fn create(&self, category: NewCategory) -> Result<Category, StoreError> {
        let mut tables = self.inner.write().map_err(poisoned)?;
        let id = tables.categories.allocate();
        let stored = Category::from_parts(CategoryId::new(id), category.name);
        tables.categories.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, category: &Category) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(poisoned)?;
        let slot = tables
            .categories
            .rows
            .get_mut(&category.id().get())
            .ok_or(StoreError::NotFound)?;
        *slot = category.clone();
        Ok(())
    }

    async fn delete(&self, id: CategoryId) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(poisoned)?;
        if tables.products.rows.values().any(|p| p.category_id() == id) {
            return Err(StoreError::conflict(format!("category {id} still has products")));
        }
        tables
            .categories
            .rows
            .remove(&id.get())
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

// -------------------------
// Orders
// -------------------------

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    inner: RwLock<OrderTables>,
}

#[derive(Debug, Default)]
struct OrderTables {
    orders: Table<Order>,
    next_item_id: u64,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderTables {
    fn allocate_item(&mut self) -> OrderItemId {
        self.next_item_id += 1;
        OrderItemId::new(self.next_item_id)
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut tables = self.inner.write().map_err(poisoned)?;
        let order_id = OrderId::new(tables.orders.allocate());

        let items = order
            .items
            .into_iter()
            .map(|line| OrderItem {
                id: tables.allocate_item(),
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
            })
            .collect();

        let stored = Order {
            id: order_id,
            purchaser: order.purchaser,
            items,
            total_price: order.total_price,
            created_at: order.created_at,
        };
        tables.orders.rows.insert(order_id.get(), stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: OrderId) -> Result<Order, StoreError> {
        let tables = self.inner.read().map_err(poisoned)?;
        tables.orders.rows.get(&id.get()).cloned().ok_or(StoreError::NotFound)
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let tables = self.inner.read().map_err(poisoned)?;
        Ok(tables.orders.rows.values().cloned().collect())
    }

    async fn update(&self, order: &Order) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(poisoned)?;
        let mut owned: BTreeSet<OrderItemId> = tables
            .orders
            .rows
            .get(&order.id.get())
            .ok_or(StoreError::NotFound)?
            .items
            .iter()
            .map(|i| i.id)
            .collect();

        let foreign = order.items.iter().find(|item| {
            !owned.contains(&item.id)
                && tables
                    .orders
                    .rows
                    .values()
                    .any(|o| o.id != order.id && o.items.iter().any(|i| i.id == item.id))
        });
        if let Some(item) = foreign {
            return Err(StoreError::conflict(format!(
                "order item {} belongs to another order",
                item.id
            )));
        }

        // Existing ids are kept once; anything else gets a fresh serial.
        let mut replacement = order.clone();
        for item in &mut replacement.items {
            if !owned.remove(&item.id) {
                item.id = tables.allocate_item();
            }
            item.order_id = order.id;
        }
        tables.orders.rows.insert(order.id.get(), replacement);
        Ok(())
    }

    async fn delete(&self, id: OrderId) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(poisoned)?;
        // Items live inside the order row, so removing it cascades.
        tables
            .orders
            .rows
            .remove(&id.get())
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

// -------------------------
// Customers
// -------------------------

#[derive(Debug, Default)]
pub struct InMemoryCustomerStore {
    inner: RwLock<Table<Customer>>,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn upsert_by_email(&self, profile: CustomerProfile) -> Result<Customer, StoreError> {
        let mut table = self.inner.write().map_err(poisoned)?;

        if let Some(existing) = table.rows.values_mut().find(|c| c.email == profile.email) {
            existing.name = profile.name;
            existing.verified_email = profile.verified_email;
            existing.phone = profile.phone;
            existing.picture = profile.picture;
            return Ok(existing.clone());
        }

        let id = table.allocate();
        let customer = Customer {
            id: CustomerId::new(id),
            name: profile.name,
            email: profile.email,
            verified_email: profile.verified_email,
            phone: profile.phone,
            picture: profile.picture,
        };
        table.rows.insert(id, customer.clone());
        Ok(customer)
    }

    async fn get(&self, id: CustomerId) -> Result<Customer, StoreError> {
        let table = self.inner.read().map_err(poisoned)?;
        table.rows.get(&id.get()).cloned().ok_or(StoreError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> Result<Customer, StoreError> {
        let table = self.inner.read().map_err(poisoned)?;
        table
            .rows
            .values()
            .find(|c| c.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}
