use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mercato_core::{CategoryId, CustomerId, ProductId};
use mercato_sales::{LineRequest, NotificationFailure, Order};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CategoryNameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: Decimal,
    pub category_id: CategoryId,
}

#[derive(Debug, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLineRequest>,
}

impl CreateOrderRequest {
    pub fn into_lines(self) -> Vec<LineRequest> {
        self.items
            .into_iter()
            .map(|line| LineRequest::new(line.product_id, line.quantity))
            .collect()
    }
}

/// Profile fields a caller may set; email and verification come from the token.
#[derive(Debug, Deserialize)]
pub struct UpsertProfileRequest {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub customer_id: CustomerId,
    pub email: String,
    pub email_verified: bool,
}

#[derive(Debug, Serialize)]
pub struct AveragePriceResponse {
    pub category_id: CategoryId,
    pub average_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct NotificationStatus {
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A committed order plus the outcome of its confirmation.
#[derive(Debug, Serialize)]
pub struct OrderCreatedResponse {
    #[serde(flatten)]
    pub order: Order,
    pub notification: NotificationStatus,
}

impl OrderCreatedResponse {
    pub fn delivered(order: Order) -> Self {
        Self {
            order,
            notification: NotificationStatus {
                delivered: true,
                reason: None,
            },
        }
    }

    pub fn undelivered(order: Order, cause: &NotificationFailure) -> Self {
        Self {
            order,
            notification: NotificationStatus {
                delivered: false,
                reason: Some(cause.to_string()),
            },
        }
    }
}
