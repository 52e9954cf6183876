//! Application state for the checkout HTTP server.
//!
//! Contains the shared resources handlers need: the checkout store, the
//! payment gateway, the webhook verifier, the order archive (for the
//! readiness probe), the clock, and the loaded configuration.

use crate::archive::OrderArchive;
use crate::config::Config;
use crate::gateway::{PaymentGateway, WebhookVerifier};
use crate::store::CheckoutStore;
use marquee_core::environment::Clock;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via Arc) for each request.
#[derive(Clone)]
pub struct AppState {
    /// The checkout store (aggregate state + dispatch)
    pub store: Arc<CheckoutStore>,

    /// Payment gateway for hosted-session creation
    pub gateway: Arc<dyn PaymentGateway>,

    /// Webhook signature verifier
    pub verifier: Arc<WebhookVerifier>,

    /// Order archive, used by the readiness probe
    pub archive: Arc<dyn OrderArchive>,

    /// Clock, used when checking signature timestamps
    pub clock: Arc<dyn Clock>,

    /// Loaded configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates a new application state.
    #[must_use]
    pub fn new(
        store: Arc<CheckoutStore>,
        gateway: Arc<dyn PaymentGateway>,
        verifier: Arc<WebhookVerifier>,
        archive: Arc<dyn OrderArchive>,
        clock: Arc<dyn Clock>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            gateway,
            verifier,
            archive,
            clock,
            config,
        }
    }
}
