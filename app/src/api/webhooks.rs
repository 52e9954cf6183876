//! Inbound gateway webhook endpoint.
//!
//! `POST /webhooks/payment` receives the raw request body plus a
//! signature header. The signature is the sole authentication boundary
//! between the public internet and state-changing fulfillment logic:
//! nothing in the payload is even parsed until it verifies.
//!
//! Response contract: `200` for everything successfully handled,
//! including idempotent no-ops and lookup misses (which must not trigger
//! gateway retries); `400` for signature failures and malformed
//! payloads; `500` only for unexpected internal errors.

use crate::gateway::GatewayEvent;
use crate::server::state::AppState;
use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use marquee_web::AppError;
use serde::Serialize;

/// Header carrying the `t=<unix>,v1=<hex>` payload signature.
pub const SIGNATURE_HEADER: &str = "marquee-signature";

/// Acknowledgement body returned to the gateway.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    /// Always `true` when the endpoint returns 200
    pub received: bool,
    /// What the reconciler did: `applied`, `no_op`, `unknown_order`, or
    /// `ignored`
    pub disposition: &'static str,
}

/// Handle a signed gateway event.
///
/// # Errors
///
/// `400` when the signature header is missing, does not verify, or the
/// payload cannot be narrowed into an event envelope.
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let signature_header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            metrics::counter!("webhook_rejected_total", "reason" => "missing_header").increment(1);
            AppError::invalid_signature("missing signature header")
        })?;

    state
        .verifier
        .verify(&body, signature_header, state.clock.now())
        .map_err(|err| {
            metrics::counter!("webhook_rejected_total", "reason" => "bad_signature").increment(1);
            AppError::invalid_signature(err.to_string())
        })?;

    // Only now is the payload trusted enough to parse
    let event = GatewayEvent::from_payload(&body).map_err(|err| {
        metrics::counter!("webhook_rejected_total", "reason" => "malformed").increment(1);
        AppError::bad_request(format!("malformed event payload: {err}"))
    })?;

    let kind = event.kind_label();
    let disposition = state.store.apply_gateway_event(event).await;

    metrics::counter!(
        "webhook_events_total",
        "kind" => kind,
        "disposition" => disposition.label(),
    )
    .increment(1);

    Ok(Json(WebhookAck {
        received: true,
        disposition: disposition.label(),
    }))
}
