//! Checkout-session creation endpoint.
//!
//! `POST /api/checkout` records a pending order before the customer ever
//! leaves for the gateway's hosted page. Free orders short-circuit: they
//! come back already fulfilled with a receipt, and the gateway is never
//! contacted.

use super::into_app_error;
use crate::gateway::{SessionLineItem, SessionRequest};
use crate::server::state::AppState;
use crate::types::{CustomerInfo, OfferingId, Selection, TicketTypeId};
use axum::{Json, extract::State, http::StatusCode};
use marquee_web::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to start a checkout.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Selected items
    pub items: Vec<CheckoutItem>,
    /// Customer contact fields
    pub customer: CustomerRequest,
}

/// One selected item.
#[derive(Debug, Deserialize)]
pub struct CheckoutItem {
    /// Offering to purchase
    pub offering_id: Uuid,
    /// Ticket type within the offering (required for events)
    pub ticket_type_id: Option<Uuid>,
    /// Requested quantity
    pub quantity: u32,
}

/// Customer contact fields.
#[derive(Debug, Deserialize)]
pub struct CustomerRequest {
    /// Full name
    pub name: String,
    /// Email address
    pub email: String,
}

/// Response to a checkout request.
///
/// Free checkouts return a fulfillment receipt and a redirect; paid
/// checkouts return the hosted session to redirect the customer to.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CheckoutResponse {
    /// Zero-subtotal checkout, fulfilled synchronously
    Free {
        /// Always `true` on this variant
        is_free: bool,
        /// The fulfilled order (the receipt id)
        order_id: Uuid,
        /// Where the client should navigate next
        redirect_url: String,
    },
    /// Paid checkout: redirect to the hosted session
    Hosted {
        /// The pending order
        order_id: Uuid,
        /// Hosted session id
        session_id: String,
        /// Hosted payment page URL
        session_url: String,
    },
}

// ============================================================================
// Handler
// ============================================================================

/// Start a checkout: record a pending order, then open a hosted session.
///
/// # Errors
///
/// `4xx` for validation failures (missing fields, sold out, exceeds
/// max-per-order, unpublished offering); `502` when the gateway cannot
/// create a session.
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    if request.customer.name.trim().is_empty() {
        return Err(AppError::bad_request("Customer name is required"));
    }
    if !request.customer.email.contains('@') {
        return Err(AppError::bad_request("A valid customer email is required"));
    }

    let selections: Vec<Selection> = request
        .items
        .iter()
        .map(|item| Selection {
            offering_id: OfferingId::from_uuid(item.offering_id),
            ticket_type_id: item.ticket_type_id.map(TicketTypeId::from_uuid),
            quantity: item.quantity,
        })
        .collect();

    let customer = CustomerInfo {
        name: request.customer.name.trim().to_string(),
        email: request.customer.email.trim().to_string(),
    };

    let order = state
        .store
        .open_order(selections, customer)
        .await
        .map_err(into_app_error)?;

    metrics::counter!("checkout_orders_opened_total").increment(1);

    // Free offerings never depend on gateway availability
    if order.is_free() {
        return Ok((
            StatusCode::CREATED,
            Json(CheckoutResponse::Free {
                is_free: true,
                order_id: *order.id.as_uuid(),
                redirect_url: state.config.gateway.success_url.clone(),
            }),
        ));
    }

    let session_request = SessionRequest {
        order_id: order.id,
        customer_email: order.customer.email.clone(),
        line_items: order
            .line_items
            .iter()
            .map(|item| SessionLineItem {
                name: item.description.clone(),
                unit_amount: item.unit_price.cents(),
                quantity: item.quantity,
            })
            .collect(),
        success_url: state.config.gateway.success_url.clone(),
        cancel_url: state.config.gateway.cancel_url.clone(),
    };

    let session = state
        .gateway
        .create_session(session_request)
        .await
        .map_err(|err| AppError::gateway(err.to_string()))?;

    // Best-effort: the session already exists at the gateway, and the
    // reconciler can find the order via metadata even if this attach
    // fails. Never roll back the session over it.
    if let Err(error) = state
        .store
        .attach_payment_session(order.id, session.session_id.clone())
        .await
    {
        tracing::warn!(
            order_id = %order.id,
            session_id = %session.session_id,
            %error,
            "Failed to attach checkout session to order; continuing"
        );
    }

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse::Hosted {
            order_id: *order.id.as_uuid(),
            session_id: session.session_id,
            session_url: session.session_url,
        }),
    ))
}
