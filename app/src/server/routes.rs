//! Router configuration for the checkout service.
//!
//! Builds the complete Axum router with all endpoints.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{checkout, offerings, orders, webhooks};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Configures all routes:
/// - Health checks
/// - Checkout-session creation
/// - Offering management and availability reads
/// - Order status lookup
/// - The inbound payment webhook
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Checkout
        .route("/checkout", post(checkout::create_checkout))
        // Offering management
        .route("/offerings", post(offerings::create_offering))
        .route("/offerings", get(offerings::list_offerings))
        .route(
            "/offerings/:id/ticket-types",
            post(offerings::add_ticket_type),
        )
        .route("/offerings/:id/publish", post(offerings::publish_offering))
        .route(
            "/offerings/:id/availability",
            get(offerings::get_availability),
        )
        // Orders (discoverable from creation time)
        .route("/orders/:id", get(orders::get_order));

    Router::new()
        // Health checks (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Signed gateway events
        .route("/webhooks/payment", post(webhooks::handle_payment_webhook))
        // API routes under /api prefix
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
