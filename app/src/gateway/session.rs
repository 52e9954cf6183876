//! Hosted checkout session creation.
//!
//! Translates an order's snapshotted line items into a hosted session
//! request. Pricing is always transmitted in integer minor-currency
//! units, and the session metadata carries the order id so the
//! reconciler can map events back to domain records without a secondary
//! lookup table.

use crate::types::{Money, OrderId};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Gateway call result
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors from the hosted-session API.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The gateway could not be reached
    #[error("gateway request failed: {0}")]
    Request(String),

    /// The gateway rejected the session request
    #[error("gateway rejected the session ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the gateway
        status: u16,
        /// Gateway-provided message
        message: String,
    },

    /// The gateway response did not contain a usable session
    #[error("gateway returned a malformed session response")]
    MalformedResponse,
}

/// One line of a hosted session request.
#[derive(Clone, Debug, Serialize)]
pub struct SessionLineItem {
    /// Display name shown on the hosted page
    pub name: String,
    /// Price per unit in minor-currency units
    pub unit_amount: u64,
    /// Quantity
    pub quantity: u32,
}

/// A request to open a hosted checkout session.
#[derive(Clone, Debug)]
pub struct SessionRequest {
    /// Order the session pays for; carried as opaque metadata
    pub order_id: OrderId,
    /// Customer email to prefill on the hosted page
    pub customer_email: String,
    /// One gateway line item per order line item
    pub line_items: Vec<SessionLineItem>,
    /// Where the gateway redirects after payment
    pub success_url: String,
    /// Where the gateway redirects on cancel
    pub cancel_url: String,
}

impl SessionRequest {
    /// Total of the session's line items, `None` on overflow.
    #[must_use]
    pub fn total(&self) -> Option<Money> {
        self.line_items.iter().try_fold(Money::ZERO, |acc, item| {
            acc.checked_add(Money::from_cents(item.unit_amount).checked_multiply(item.quantity)?)
        })
    }
}

/// A hosted session the customer is redirected to.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct HostedSession {
    /// Gateway session id (stored on the order, indexed for lookup)
    pub session_id: String,
    /// URL of the hosted payment page
    pub session_url: String,
}

/// Payment gateway trait.
///
/// Abstraction over the hosted-checkout provider so handlers and tests
/// can run against [`MockPaymentGateway`].
pub trait PaymentGateway: Send + Sync {
    /// Open a hosted checkout session for an order.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] when the gateway is unreachable,
    /// rejects the request, or responds with garbage.
    fn create_session(
        &self,
        request: SessionRequest,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<HostedSession>> + Send>>;
}

// ============================================================================
// Production client
// ============================================================================

/// JSON body sent to the gateway's session endpoint.
#[derive(Debug, Serialize)]
struct CreateSessionBody<'a> {
    success_url: &'a str,
    cancel_url: &'a str,
    customer_email: &'a str,
    metadata: SessionMetadata,
    line_items: &'a [SessionLineItem],
}

#[derive(Debug, Serialize)]
struct SessionMetadata {
    order_id: String,
}

/// JSON body the gateway answers with.
#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    id: String,
    url: String,
}

/// HTTP client for the hosted-checkout provider.
#[derive(Clone, Debug)]
pub struct HostedCheckoutClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl HostedCheckoutClient {
    /// Creates a client for the gateway at `api_base`, authenticating
    /// with `secret_key`.
    #[must_use]
    pub fn new(api_base: String, secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base,
            secret_key,
        }
    }
}

impl PaymentGateway for HostedCheckoutClient {
    fn create_session(
        &self,
        request: SessionRequest,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<HostedSession>> + Send>> {
        let http = self.http.clone();
        let url = format!("{}/v1/checkout/sessions", self.api_base);
        let secret_key = self.secret_key.clone();

        Box::pin(async move {
            let body = CreateSessionBody {
                success_url: &request.success_url,
                cancel_url: &request.cancel_url,
                customer_email: &request.customer_email,
                metadata: SessionMetadata {
                    order_id: request.order_id.to_string(),
                },
                line_items: &request.line_items,
            };

            let response = http
                .post(&url)
                .bearer_auth(&secret_key)
                .json(&body)
                .send()
                .await
                .map_err(|err| GatewayError::Request(err.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(GatewayError::Rejected {
                    status: status.as_u16(),
                    message,
                });
            }

            let session: CreateSessionResponse = response
                .json()
                .await
                .map_err(|_| GatewayError::MalformedResponse)?;

            tracing::info!(
                order_id = %request.order_id,
                session_id = %session.id,
                "Hosted checkout session created"
            );

            Ok(HostedSession {
                session_id: session.id,
                session_url: session.url,
            })
        })
    }
}

// ============================================================================
// Mock gateway
// ============================================================================

/// Mock payment gateway (always succeeds) for development and tests.
#[derive(Clone, Debug, Default)]
pub struct MockPaymentGateway;

impl MockPaymentGateway {
    /// Creates a new mock payment gateway
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new())
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn create_session(
        &self,
        request: SessionRequest,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<HostedSession>> + Send>> {
        Box::pin(async move {
            let session_id = format!("mock_cs_{}", uuid::Uuid::new_v4().simple());

            tracing::info!(
                order_id = %request.order_id,
                session_id = %session_id,
                amount = request.total().map_or(0, |m| m.cents()),
                "Mock checkout session created"
            );

            Ok(HostedSession {
                session_url: format!("https://checkout.example.test/pay/{session_id}"),
                session_id,
            })
        })
    }
}
