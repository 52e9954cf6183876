//! HTTP API tests: the full surface through the axum router.
//!
//! Drives the service the way clients and the gateway do: JSON requests
//! through `tower::ServiceExt::oneshot`, webhook payloads signed with the
//! same HMAC scheme the verifier checks.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use marquee::Config;
use marquee::archive::NullOrderArchive;
use marquee::config::{DatabaseConfig, GatewayConfig, ServerConfig};
use marquee::gateway::{
    GatewayError, GatewayResult, HostedSession, MockPaymentGateway, PaymentGateway,
    SessionRequest, WebhookVerifier,
};
use marquee::server::{AppState, build_router};
use marquee::store::CheckoutStore;
use marquee_core::environment::SystemClock;
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const WEBHOOK_SECRET: &str = "whsec_test123secret456";

fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            log_level: "info".to_string(),
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 1,
            connect_timeout: 5,
        },
        gateway: GatewayConfig {
            api_base: "https://api.gateway.example".to_string(),
            secret_key: "sk_test".to_string(),
            webhook_secret: WEBHOOK_SECRET.to_string(),
            signature_tolerance: 300,
            success_url: "https://example.test/thanks".to_string(),
            cancel_url: "https://example.test/cart".to_string(),
            use_mock: true,
        },
    }
}

fn app_with_gateway(gateway: Arc<dyn PaymentGateway>) -> Router {
    let clock = Arc::new(SystemClock);
    let archive = Arc::new(NullOrderArchive);
    let store = Arc::new(CheckoutStore::new(clock.clone(), archive.clone()));
    let verifier = Arc::new(WebhookVerifier::new(
        WEBHOOK_SECRET.to_string(),
        Duration::from_secs(300),
    ));
    build_router(AppState::new(
        store,
        gateway,
        verifier,
        archive,
        clock,
        Arc::new(test_config()),
    ))
}

fn app() -> Router {
    app_with_gateway(MockPaymentGateway::shared())
}

/// Gateway double that fails every session request. Free checkouts must
/// succeed against it, proving they never call the gateway.
#[derive(Clone, Debug)]
struct RefusingGateway;

impl PaymentGateway for RefusingGateway {
    fn create_session(
        &self,
        _request: SessionRequest,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<HostedSession>> + Send>> {
        Box::pin(async {
            Err(GatewayError::Rejected {
                status: 500,
                message: "gateway must not be called".to_string(),
            })
        })
    }
}

async fn send_json(app: &Router, method: &str, uri: &str, body: &Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn send_webhook(app: &Router, payload: &Value, secret: &str) -> (StatusCode, Value) {
    let body = serde_json::to_vec(payload).unwrap();
    let header_value = WebhookVerifier::new(secret.to_string(), Duration::from_secs(300))
        .sign(&body, Utc::now().timestamp());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/payment")
                .header(header::CONTENT_TYPE, "application/json")
                .header("marquee-signature", header_value)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Creates a published event offering with one ticket type; returns
/// (offering id, ticket type id) as JSON strings.
async fn seed_event(app: &Router, quantity: u32, max_per_order: u32) -> (String, String) {
    let (status, offering) = send_json(
        app,
        "POST",
        "/api/offerings",
        &json!({
            "title": "Spring Gala",
            "kind": "event",
            "base_price_cents": 0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let offering_id = offering["id"].as_str().unwrap().to_string();

    let (status, ticket_type) = send_json(
        app,
        "POST",
        &format!("/api/offerings/{offering_id}/ticket-types"),
        &json!({
            "name": "General",
            "unit_price_cents": 2500,
            "quantity": quantity,
            "max_per_order": max_per_order,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let ticket_type_id = ticket_type["id"].as_str().unwrap().to_string();

    let (status, _) = send_json(
        app,
        "POST",
        &format!("/api/offerings/{offering_id}/publish"),
        &json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    (offering_id, ticket_type_id)
}

fn completed_event_payload(session_id: &str, intent_id: &str, order_id: &str) -> Value {
    json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": session_id,
            "payment_intent": intent_id,
            "metadata": { "order_id": order_id }
        }}
    })
}

#[tokio::test]
async fn paid_checkout_then_webhook_confirms_order() {
    let app = app();
    let (offering_id, ticket_type_id) = seed_event(&app, 10, 4).await;

    let (status, checkout) = send_json(
        &app,
        "POST",
        "/api/checkout",
        &json!({
            "items": [{
                "offering_id": offering_id,
                "ticket_type_id": ticket_type_id,
                "quantity": 2
            }],
            "customer": { "name": "Dana", "email": "dana@example.com" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = checkout["order_id"].as_str().unwrap().to_string();
    let session_id = checkout["session_id"].as_str().unwrap().to_string();
    assert!(checkout["session_url"].as_str().unwrap().contains(&session_id));
    assert!(checkout.get("is_free").is_none());

    // Order discoverable and pending before any payment
    let (status, order) = get_json(&app, &format!("/api/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["payment_status"], "Pending");
    assert_eq!(order["checkout_session_id"], Value::String(session_id.clone()));
    assert_eq!(order["total_cents"], 5000);

    // Gateway delivers the completion, twice
    let payload = completed_event_payload(&session_id, "pi_1", &order_id);
    let (status, ack) = send_webhook(&app, &payload, WEBHOOK_SECRET).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["disposition"], "applied");

    let (status, ack) = send_webhook(&app, &payload, WEBHOOK_SECRET).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["disposition"], "no_op");

    // Confirmed once, inventory committed once
    let (_, order) = get_json(&app, &format!("/api/orders/{order_id}")).await;
    assert_eq!(order["payment_status"], "Paid");
    assert_eq!(order["status"], "Confirmed");
    assert_eq!(order["payment_intent_id"], "pi_1");

    let (_, availability) =
        get_json(&app, &format!("/api/offerings/{offering_id}/availability")).await;
    assert_eq!(availability["ticket_types"][0]["available"], 8);
}

#[tokio::test]
async fn free_checkout_returns_receipt_and_never_calls_gateway() {
    let app = app_with_gateway(Arc::new(RefusingGateway));

    let (status, offering) = send_json(
        &app,
        "POST",
        "/api/offerings",
        &json!({
            "title": "Intro to Watercolor",
            "kind": "course",
            "base_price_cents": 0,
            "capacity": 20
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let offering_id = offering["id"].as_str().unwrap().to_string();
    send_json(
        &app,
        "POST",
        &format!("/api/offerings/{offering_id}/publish"),
        &json!({}),
    )
    .await;

    let (status, checkout) = send_json(
        &app,
        "POST",
        "/api/checkout",
        &json!({
            "items": [{ "offering_id": offering_id, "quantity": 1 }],
            "customer": { "name": "Dana", "email": "dana@example.com" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(checkout["is_free"], true);
    assert_eq!(checkout["redirect_url"], "https://example.test/thanks");

    let order_id = checkout["order_id"].as_str().unwrap();
    let (_, order) = get_json(&app, &format!("/api/orders/{order_id}")).await;
    assert_eq!(order["payment_status"], "Paid");
    assert_eq!(order["status"], "Confirmed");
}

#[tokio::test]
async fn sold_out_checkout_conflicts() {
    let app = app();
    let (offering_id, ticket_type_id) = seed_event(&app, 1, 4).await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/checkout",
        &json!({
            "items": [{
                "offering_id": offering_id,
                "ticket_type_id": ticket_type_id,
                "quantity": 2
            }],
            "customer": { "name": "Dana", "email": "dana@example.com" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("sold out"));
}

#[tokio::test]
async fn checkout_validation_errors_are_4xx() {
    let app = app();
    let (offering_id, ticket_type_id) = seed_event(&app, 10, 4).await;

    // Exceeds per-order cap
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/checkout",
        &json!({
            "items": [{
                "offering_id": offering_id,
                "ticket_type_id": ticket_type_id,
                "quantity": 5
            }],
            "customer": { "name": "Dana", "email": "dana@example.com" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("at most 4"));

    // Missing email
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/checkout",
        &json!({
            "items": [{
                "offering_id": offering_id,
                "ticket_type_id": ticket_type_id,
                "quantity": 1
            }],
            "customer": { "name": "Dana", "email": "not-an-email" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown offering
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/checkout",
        &json!({
            "items": [{
                "offering_id": "00000000-0000-0000-0000-000000000000",
                "quantity": 1
            }],
            "customer": { "name": "Dana", "email": "dana@example.com" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn webhook_rejects_unauthenticated_payloads() {
    let app = app();

    let payload = completed_event_payload(
        "cs_1",
        "pi_1",
        "00000000-0000-0000-0000-000000000000",
    );

    // Wrong secret
    let (status, _) = send_webhook(&app, &payload, "wrong_secret").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Missing header entirely
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/payment")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_rejects_malformed_payloads() {
    let app = app();

    // Correctly signed, but a handled kind missing its order metadata
    let payload = json!({
        "type": "checkout.session.completed",
        "data": { "object": { "id": "cs_1", "payment_intent": "pi_1" } }
    });
    let (status, _) = send_webhook(&app, &payload, WEBHOOK_SECRET).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_acknowledges_unknown_orders_and_foreign_kinds() {
    let app = app();

    // Unknown order: benign, must not trigger gateway retries
    let payload = completed_event_payload(
        "cs_ghost",
        "pi_ghost",
        "7f3b1c9e-0000-4000-8000-000000000000",
    );
    let (status, ack) = send_webhook(&app, &payload, WEBHOOK_SECRET).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["disposition"], "unknown_order");

    // Unhandled kind: acknowledged and ignored
    let payload = json!({
        "type": "customer.subscription.updated",
        "data": { "object": {} }
    });
    let (status, ack) = send_webhook(&app, &payload, WEBHOOK_SECRET).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["disposition"], "ignored");
}

#[tokio::test]
async fn refund_flow_through_the_api() {
    let app = app();
    let (offering_id, ticket_type_id) = seed_event(&app, 10, 4).await;

    let (_, checkout) = send_json(
        &app,
        "POST",
        "/api/checkout",
        &json!({
            "items": [{
                "offering_id": offering_id,
                "ticket_type_id": ticket_type_id,
                "quantity": 2
            }],
            "customer": { "name": "Dana", "email": "dana@example.com" }
        }),
    )
    .await;
    let order_id = checkout["order_id"].as_str().unwrap().to_string();
    let session_id = checkout["session_id"].as_str().unwrap().to_string();

    send_webhook(
        &app,
        &completed_event_payload(&session_id, "pi_1", &order_id),
        WEBHOOK_SECRET,
    )
    .await;

    // Partial refund first
    let partial = json!({
        "type": "charge.refunded",
        "data": { "object": {
            "id": "ch_1",
            "payment_intent": "pi_1",
            "amount_refunded": 1000
        }}
    });
    let (status, ack) = send_webhook(&app, &partial, WEBHOOK_SECRET).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["disposition"], "applied");

    let (_, order) = get_json(&app, &format!("/api/orders/{order_id}")).await;
    assert_eq!(order["payment_status"], "Refunded");
    assert_eq!(order["status"], "Confirmed");
    assert_eq!(order["partially_refunded"], true);

    let (_, availability) =
        get_json(&app, &format!("/api/offerings/{offering_id}/availability")).await;
    assert_eq!(availability["ticket_types"][0]["available"], 8);
}

#[tokio::test]
async fn health_probes_respond() {
    let app = app();

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = get_json(&app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
}
