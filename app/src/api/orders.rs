//! Order status lookup.
//!
//! `GET /api/orders/:id` - orders are discoverable from the moment they
//! are recorded, even while the payment session is still open (or after
//! it was abandoned).

use crate::server::state::AppState;
use crate::types::{Order, OrderId, OrderStatus, PaymentStatus};
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use marquee_web::AppError;
use serde::Serialize;
use uuid::Uuid;

/// Order details.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// Order ID
    pub id: Uuid,
    /// Fulfillment lifecycle
    pub status: OrderStatus,
    /// Payment lifecycle
    pub payment_status: PaymentStatus,
    /// Derived read: refunded for less than the charged amount
    pub partially_refunded: bool,
    /// Line items
    pub line_items: Vec<OrderLineResponse>,
    /// Subtotal in minor-currency units
    pub subtotal_cents: u64,
    /// Charged total in minor-currency units
    pub total_cents: u64,
    /// Cumulative refunded amount in minor-currency units
    pub amount_refunded_cents: u64,
    /// Customer email
    pub customer_email: String,
    /// Hosted session id, if attached
    pub checkout_session_id: Option<String>,
    /// Payment-intent id, once paid
    pub payment_intent_id: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Purchased timestamp, once paid
    pub purchased_at: Option<DateTime<Utc>>,
    /// Refunded timestamp, if refunded
    pub refunded_at: Option<DateTime<Utc>>,
}

/// One order line.
#[derive(Debug, Serialize)]
pub struct OrderLineResponse {
    /// Snapshot description
    pub description: String,
    /// Snapshot unit price in minor-currency units
    pub unit_price_cents: u64,
    /// Quantity
    pub quantity: u32,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: *order.id.as_uuid(),
            status: order.status,
            payment_status: order.payment_status,
            partially_refunded: order.is_partially_refunded(),
            line_items: order
                .line_items
                .iter()
                .map(|item| OrderLineResponse {
                    description: item.description.clone(),
                    unit_price_cents: item.unit_price.cents(),
                    quantity: item.quantity,
                })
                .collect(),
            subtotal_cents: order.subtotal.cents(),
            total_cents: order.total.cents(),
            amount_refunded_cents: order.amount_refunded.cents(),
            customer_email: order.customer.email.clone(),
            checkout_session_id: order.checkout_session_id.clone(),
            payment_intent_id: order.payment_intent_id.clone(),
            created_at: order.created_at,
            purchased_at: order.purchased_at,
            refunded_at: order.refunded_at,
        }
    }
}

/// Get an order by id.
///
/// # Errors
///
/// `404` when no order with that id exists.
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state
        .store
        .order(OrderId::from_uuid(order_id))
        .await
        .ok_or_else(|| AppError::not_found("Order", order_id))?;

    Ok(Json((&order).into()))
}
