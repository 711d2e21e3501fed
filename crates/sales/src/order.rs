use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mercato_core::{CustomerId, Entity, Identity, OrderId, OrderItemId, ProductId, ValueObject};

/// Who placed an order, as authenticated when it was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchaser {
    pub email: String,
    pub customer_id: Option<CustomerId>,
}

impl ValueObject for Purchaser {}

impl From<&Identity> for Purchaser {
    fn from(identity: &Identity) -> Self {
        Self {
            email: identity.email().to_string(),
            customer_id: identity.customer_id(),
        }
    }
}

/// A requested order line, before pricing.
///
/// `quantity` is signed so that non-positive input reaches the pricing engine
/// and is rejected there rather than at deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl ValueObject for LineRequest {}

impl LineRequest {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A line after pricing: `price` is the line total, captured now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Decimal,
}

/// An order ready to be persisted (no identifiers assigned yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub purchaser: Purchaser,
    pub items: Vec<PricedLine>,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A persisted order line.
///
/// `price` is the line total snapshotted at creation. It never follows later
/// changes to the product's catalog price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Decimal,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub purchaser: Purchaser,
    pub items: Vec<OrderItem>,
    /// Sum of item prices at creation. Stored, never recomputed.
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Sum of the current item prices.
    ///
    /// Equals `total_price` for any order created by the workflow; may differ
    /// after a verbatim update.
    pub fn item_sum(&self) -> Decimal {
        self.items.iter().map(|i| i.price).sum()
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
