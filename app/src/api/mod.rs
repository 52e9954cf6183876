//! HTTP API endpoints for the checkout workflow.
//!
//! - [`checkout`] - checkout-session creation (and free-order receipts)
//! - [`webhooks`] - the inbound gateway event endpoint
//! - [`offerings`] - offering management and availability reads
//! - [`orders`] - order status lookup

pub mod checkout;
pub mod offerings;
pub mod orders;
pub mod webhooks;

use crate::types::CheckoutError;
use marquee_web::AppError;

/// Maps workflow validation errors onto the HTTP error taxonomy:
/// lookup misses to 404, scarcity conflicts to 409, everything else to a
/// 422 with the message rendered inline in the checkout UI.
fn into_app_error(error: CheckoutError) -> AppError {
    match error {
        CheckoutError::UnknownOffering(id) => AppError::not_found("Offering", id),
        CheckoutError::UnknownTicketType(id) => AppError::not_found("Ticket type", id),
        CheckoutError::UnknownOrder(id) => AppError::not_found("Order", id),
        CheckoutError::SoldOut { .. } | CheckoutError::DuplicateOffering(_) => {
            AppError::conflict(error.to_string())
        }
        _ => AppError::validation(error.to_string()),
    }
}
