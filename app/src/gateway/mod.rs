//! Payment gateway adapter.
//!
//! The sole bridge between this service and the hosted payment provider:
//!
//! - [`session`] - creating hosted checkout sessions (one gateway line
//!   item per order line item, amounts in integer minor units, order id
//!   carried as opaque metadata)
//! - [`signature`] - authenticating inbound webhook payloads. This is the
//!   only authentication boundary between the public internet and
//!   state-changing fulfillment logic; nothing else in a request is
//!   trusted before the signature verifies.
//! - [`events`] - the closed union of gateway event kinds the reconciler
//!   handles, with an explicit `Ignored` variant for everything else

pub mod events;
pub mod session;
pub mod signature;

pub use events::{EventParseError, GatewayEvent};
pub use session::{
    GatewayError, GatewayResult, HostedCheckoutClient, HostedSession, MockPaymentGateway,
    PaymentGateway, SessionLineItem, SessionRequest,
};
pub use signature::{SignatureError, WebhookVerifier};
