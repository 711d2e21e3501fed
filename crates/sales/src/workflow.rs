//! Order placement workflow (application-level orchestration).
//!
//! The `OrderWorkflow` composes the pricing engine, an `OrderStore` and a
//! `Notifier`. Every entry point takes the caller's `RequestContext`
//! explicitly; nothing is read from ambient state.
//!
//! ## Order Creation Flow
//!
//! ```text
//! Received
//!   ↓  identity present?            no ─► Unauthenticated   (nothing read)
//!   ↓  at least one line?           no ─► EmptyOrder
//! Priced
//!   ↓  all quantities > 0?          no ─► InvalidQuantity   (nothing written)
//!   ↓  every product exists?        no ─► InvalidProduct    (nothing written)
//! Persisted
//!   ↓  OrderStore::create (atomic)  err ─► Persistence / Cancelled (nothing written)
//! Notified
//!   ↓  email purchaser (+ SMS alert) err ─► NotificationFailed { order, cause }
//!   ↓                                       (order stays committed)
//! Ok(order)
//! ```
//!
//! Notification happens strictly after the commit and is never rolled back
//! into it. A `NotificationFailed` result means the order exists; callers must
//! not resubmit. There is no durable outbox: a process crash between commit and
//! notification loses the notification.

use chrono::Utc;
use tracing::{info, instrument, warn};

use mercato_catalog::ProductStore;
use mercato_core::{OrderId, RequestContext};

use crate::error::{NotificationFailure, OrderError};
use crate::notifier::Notifier;
use crate::order::{LineRequest, NewOrder, Order, Purchaser};
use crate::pricing::PricingEngine;
use crate::store::OrderStore;

pub const CONFIRMATION_SUBJECT: &str = "New Order Purchased";

/// Staff SMS alert sent after each confirmed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsAlert {
    pub recipients: Vec<String>,
    pub sender_id: String,
}

/// Confirmation email body for a committed order.
pub fn confirmation_body(order: &Order) -> String {
    format!(
        "New Order Created!\n\nOrder ID: {}\nTotal Price: {:.2}",
        order.id, order.total_price
    )
}

fn alert_text(order: &Order) -> String {
    format!(
        "Order {} placed by {}: total {:.2}",
        order.id, order.purchaser.email, order.total_price
    )
}

pub struct OrderWorkflow<P, O, N> {
    pricing: PricingEngine<P>,
    orders: O,
    notifier: N,
    sms_alert: Option<SmsAlert>,
}

impl<P, O, N> OrderWorkflow<P, O, N>
where
    P: ProductStore,
    O: OrderStore,
    N: Notifier,
{
    pub fn new(products: P, orders: O, notifier: N) -> Self {
        Self {
            pricing: PricingEngine::new(products),
            orders,
            notifier,
            sms_alert: None,
        }
    }

    /// Also send an SMS alert after each confirmation email.
    pub fn with_sms_alert(mut self, alert: SmsAlert) -> Self {
        self.sms_alert = Some(alert).filter(|a| !a.recipients.is_empty());
        self
    }

    /// Price, persist and confirm a new order for the calling identity.
    #[instrument(
        skip(self, ctx, lines),
        fields(request_id = %ctx.request_id(), line_count = lines.len()),
        err(Display)
    )]
    pub async fn create_order(
        &self,
        ctx: &RequestContext,
        lines: Vec<LineRequest>,
    ) -> Result<Order, OrderError> {
        let identity = ctx.require_identity()?;
        if lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        let priced = self.pricing.price_lines(ctx, &lines).await?;

        let new = NewOrder {
            purchaser: Purchaser::from(identity),
            items: priced.lines,
            total_price: priced.total,
            created_at: Utc::now(),
        };

        let order = match ctx.bound(self.orders.create(new)).await {
            Ok(Ok(order)) => order,
            Ok(Err(e)) => return Err(OrderError::Persistence(e)),
            Err(interrupted) => return Err(OrderError::Cancelled(interrupted)),
        };

        info!(
            order_id = %order.id,
            total_price = %order.total_price,
            item_count = order.items.len(),
            "order committed"
        );

        if let Err(cause) = self.notify(ctx, &order).await {
            warn!(order_id = %order.id, %cause, "order committed but notification failed");
            return Err(OrderError::NotificationFailed {
                order: Box::new(order),
                cause,
            });
        }

        Ok(order)
    }

    pub async fn get_order(&self, ctx: &RequestContext, id: OrderId) -> Result<Order, OrderError> {
        ctx.require_identity()?;
        Ok(ctx.bound(self.orders.get(id)).await??)
    }

    pub async fn list_orders(&self, ctx: &RequestContext) -> Result<Vec<Order>, OrderError> {
        ctx.require_identity()?;
        Ok(ctx.bound(self.orders.list()).await??)
    }

    /// Persist `order` verbatim. Items are not re-priced and the total is not
    /// recomputed. An order always keeps at least one item.
    ///
    /// Returns the stored order, whose item ids may differ from the input.
    pub async fn update_order(&self, ctx: &RequestContext, order: Order) -> Result<Order, OrderError> {
        ctx.require_identity()?;
        if order.items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        ctx.bound(self.orders.update(&order)).await??;
        info!(order_id = %order.id, item_count = order.items.len(), "order updated");
        Ok(ctx.bound(self.orders.get(order.id)).await??)
    }

    /// Delete an order together with its items.
    pub async fn delete_order(&self, ctx: &RequestContext, id: OrderId) -> Result<(), OrderError> {
        ctx.require_identity()?;
        ctx.bound(self.orders.delete(id)).await??;
        info!(order_id = %id, "order deleted");
        Ok(())
    }

    async fn notify(&self, ctx: &RequestContext, order: &Order) -> Result<(), NotificationFailure> {
        let body = confirmation_body(order);
        ctx.bound(
            self.notifier
                .send_email(&order.purchaser.email, CONFIRMATION_SUBJECT, &body),
        )
        .await
        .map_err(NotificationFailure::Interrupted)?
        .map_err(NotificationFailure::Channel)?;

        if let Some(alert) = &self.sms_alert {
            let text = alert_text(order);
            ctx.bound(
                self.notifier
                    .send_sms(&alert.recipients, &alert.sender_id, &text),
            )
            .await
            .map_err(NotificationFailure::Interrupted)?
            .map_err(NotificationFailure::Channel)?;
        }

        Ok(())
    }
}
