//! Marquee - a checkout-to-fulfillment service.
//!
//! Marquee records order intents before payment, opens hosted checkout
//! sessions at a payment gateway, and applies the gateway's signed
//! asynchronous events to order and inventory state through an
//! idempotent reconciler.
//!
//! # Architecture
//!
//! ```text
//! client ──POST /api/checkout──► OrderReducer (pending order, prices frozen)
//!    │                                │
//!    │                        gateway session created,
//!    │                        order id in metadata
//!    ▼                                │
//! hosted payment page ◄───────────────┘
//!    │
//!    │  (out of band, at-least-once)
//!    ▼
//! POST /webhooks/payment ──verify signature──► GatewayEvent
//!                                                  │
//!                                                  ▼
//!                                        FulfillmentReducer
//!                                 (one idempotent transition per event:
//!                                  order status + inventory delta)
//! ```
//!
//! # Key guarantees
//!
//! - **Prices are snapshotted** into the order at creation time and never
//!   recomputed from the live offering.
//! - **Webhook transitions are idempotent**: redelivered events reduce to
//!   no-ops, so `quantity_sold` can never double-count.
//! - **Free checkouts never touch the gateway**: zero-subtotal orders
//!   fulfill synchronously in the same transition that records them.
//! - **The availability check is advisory**: concurrent pending orders
//!   are not deducted, trading strict reservation for checkout
//!   availability. Whoever pays first wins; the documented oversell race
//!   is accepted, not hidden.
//! - **Orders are never deleted**: every transition is archived as the
//!   audit trail.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregates;
pub mod api;
pub mod archive;
pub mod cart;
pub mod config;
pub mod gateway;
pub mod metrics;
pub mod server;
pub mod store;
pub mod types;

pub use aggregates::{
    CatalogAction, CatalogReducer, FulfillmentAction, FulfillmentReducer, OrderAction,
    OrderReducer,
};
pub use config::Config;
pub use store::{CheckoutStore, Disposition};
pub use types::*;
