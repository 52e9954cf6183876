//! Checkout store: serialized dispatch over the workflow reducers.
//!
//! The store owns the shared [`CheckoutState`] behind a `tokio` RwLock
//! and runs every reducer transition under the write guard. That guard is
//! this implementation's "single serializable transaction keyed by order
//! id": concurrent webhook deliveries serialize here, so the reducers'
//! status guards are race-free and an order transition commits together
//! with its inventory delta.
//!
//! After each order-affecting transition the store archives the order
//! snapshot write-through, best-effort: archive failures are logged,
//! never surfaced to the gateway.

use crate::aggregates::{
    CatalogAction, CatalogEnvironment, CatalogReducer, FulfillmentAction, FulfillmentEnvironment,
    FulfillmentReducer, OrderAction, OrderEnvironment, OrderReducer,
};
use crate::archive::OrderArchive;
use crate::gateway::GatewayEvent;
use crate::types::{
    CheckoutError, CheckoutState, CustomerInfo, Money, Offering, OfferingId, OfferingKind, Order,
    OrderId, Selection, TicketType, TicketTypeId,
};
use marquee_core::environment::Clock;
use marquee_core::reducer::Reducer;
use std::sync::Arc;
use tokio::sync::RwLock;

/// What applying a gateway event actually did.
///
/// The webhook endpoint acknowledges all of these with `200`; the
/// disposition only drives logging and metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// A transition was applied
    Applied,
    /// The event repeated a completed transition (redelivery) or arrived
    /// late for a terminal order; nothing changed
    NoOp,
    /// No order matched the event's identifiers; benign, not transient
    UnknownOrder,
    /// The event kind is not one the reconciler handles
    Ignored,
}

impl Disposition {
    /// Metrics/log label for this disposition
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::NoOp => "no_op",
            Self::UnknownOrder => "unknown_order",
            Self::Ignored => "ignored",
        }
    }
}

/// Store for the checkout workflow.
pub struct CheckoutStore {
    state: Arc<RwLock<CheckoutState>>,
    catalog_reducer: CatalogReducer,
    order_reducer: OrderReducer,
    fulfillment_reducer: FulfillmentReducer,
    catalog_env: CatalogEnvironment,
    order_env: OrderEnvironment,
    fulfillment_env: FulfillmentEnvironment,
    archive: Arc<dyn OrderArchive>,
}

impl CheckoutStore {
    /// Creates a store with the given clock and order archive.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, archive: Arc<dyn OrderArchive>) -> Self {
        Self {
            state: Arc::new(RwLock::new(CheckoutState::new())),
            catalog_reducer: CatalogReducer::new(),
            order_reducer: OrderReducer::new(),
            fulfillment_reducer: FulfillmentReducer::new(),
            catalog_env: CatalogEnvironment::new(clock.clone()),
            order_env: OrderEnvironment::new(clock.clone()),
            fulfillment_env: FulfillmentEnvironment::new(clock),
            archive,
        }
    }

    // ========================================================================
    // Catalog operations
    // ========================================================================

    /// Creates a draft offering.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] when validation fails.
    pub async fn create_offering(
        &self,
        title: String,
        kind: OfferingKind,
        base_price: Money,
        capacity: Option<u32>,
    ) -> Result<Offering, CheckoutError> {
        let offering_id = OfferingId::new();
        let mut state = self.state.write().await;
        let _effects = self.catalog_reducer.reduce(
            &mut state,
            CatalogAction::CreateOffering {
                offering_id,
                title,
                kind,
                base_price,
                capacity,
            },
            &self.catalog_env,
        );

        state.offering(&offering_id).cloned().ok_or_else(|| {
            state
                .last_error
                .clone()
                .unwrap_or(CheckoutError::UnknownOffering(offering_id))
        })
    }

    /// Adds a ticket type to an event offering.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] when the offering does not exist.
    pub async fn add_ticket_type(
        &self,
        offering_id: OfferingId,
        name: String,
        unit_price: Money,
        quantity: u32,
        max_per_order: u32,
    ) -> Result<TicketType, CheckoutError> {
        let ticket_type_id = TicketTypeId::new();
        let mut state = self.state.write().await;
        let _effects = self.catalog_reducer.reduce(
            &mut state,
            CatalogAction::AddTicketType {
                offering_id,
                ticket_type_id,
                name,
                unit_price,
                quantity,
                max_per_order,
            },
            &self.catalog_env,
        );

        state
            .offering(&offering_id)
            .and_then(|offering| offering.ticket_type(&ticket_type_id))
            .cloned()
            .ok_or_else(|| {
                state
                    .last_error
                    .clone()
                    .unwrap_or(CheckoutError::UnknownOffering(offering_id))
            })
    }

    /// Publishes an offering.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] when the offering does not exist.
    pub async fn publish_offering(&self, offering_id: OfferingId) -> Result<(), CheckoutError> {
        self.catalog_command(CatalogAction::PublishOffering { offering_id })
            .await
    }

    /// Withdraws an offering from sale.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] when the offering does not exist.
    pub async fn archive_offering(&self, offering_id: OfferingId) -> Result<(), CheckoutError> {
        self.catalog_command(CatalogAction::ArchiveOffering { offering_id })
            .await
    }

    /// Toggles a ticket type's active flag.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] when the offering or ticket type does
    /// not exist.
    pub async fn set_ticket_type_active(
        &self,
        offering_id: OfferingId,
        ticket_type_id: TicketTypeId,
        active: bool,
    ) -> Result<(), CheckoutError> {
        self.catalog_command(CatalogAction::SetTicketTypeActive {
            offering_id,
            ticket_type_id,
            active,
        })
        .await
    }

    async fn catalog_command(&self, action: CatalogAction) -> Result<(), CheckoutError> {
        let mut state = self.state.write().await;
        let _effects = self
            .catalog_reducer
            .reduce(&mut state, action, &self.catalog_env);
        match state.last_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Pending-order store operations
    // ========================================================================

    /// Records a pending order, snapshotting prices at this instant.
    ///
    /// Zero-subtotal orders fulfill synchronously in the same transition
    /// (free-offering short-circuit); the caller sees them come back
    /// already `Paid`/`Confirmed`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] when validation fails; nothing is
    /// recorded in that case.
    pub async fn open_order(
        &self,
        selections: Vec<Selection>,
        customer: CustomerInfo,
    ) -> Result<Order, CheckoutError> {
        let order_id = OrderId::new();
        let order = {
            let mut state = self.state.write().await;
            let _effects = self.order_reducer.reduce(
                &mut state,
                OrderAction::OpenOrder {
                    order_id,
                    selections,
                    customer,
                },
                &self.order_env,
            );

            state.order(&order_id).cloned().ok_or_else(|| {
                state
                    .last_error
                    .clone()
                    .unwrap_or(CheckoutError::UnknownOrder(order_id))
            })?
        };

        self.archive_order(&order).await;
        Ok(order)
    }

    /// Attaches the hosted session id to an order (idempotent).
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::UnknownOrder`] when the order does not
    /// exist. Callers treat failures as best-effort: the reconciler can
    /// still find the order via gateway metadata.
    pub async fn attach_payment_session(
        &self,
        order_id: OrderId,
        session_id: String,
    ) -> Result<(), CheckoutError> {
        let order = {
            let mut state = self.state.write().await;
            let _effects = self.order_reducer.reduce(
                &mut state,
                OrderAction::AttachPaymentSession {
                    order_id,
                    session_id,
                },
                &self.order_env,
            );

            if let Some(error) = state.last_error.clone() {
                return Err(error);
            }
            state.order(&order_id).cloned()
        };

        if let Some(order) = order {
            self.archive_order(&order).await;
        }
        Ok(())
    }

    // ========================================================================
    // Fulfillment reconciliation
    // ========================================================================

    /// Applies a verified gateway event as exactly one reducer
    /// transition, and reports what happened.
    pub async fn apply_gateway_event(&self, event: GatewayEvent) -> Disposition {
        let action = match event {
            GatewayEvent::SessionCompleted {
                session_id,
                payment_intent_id,
                order_id,
            } => FulfillmentAction::SessionCompleted {
                session_id,
                payment_intent_id,
                order_id,
            },
            GatewayEvent::SessionExpired {
                session_id,
                order_id,
            } => FulfillmentAction::SessionExpired {
                session_id,
                order_id,
            },
            GatewayEvent::PaymentFailed { payment_intent_id } => {
                FulfillmentAction::PaymentFailed { payment_intent_id }
            }
            GatewayEvent::ChargeRefunded {
                payment_intent_id,
                amount_refunded,
            } => FulfillmentAction::ChargeRefunded {
                payment_intent_id,
                amount_refunded,
            },
            GatewayEvent::Ignored { kind } => {
                tracing::debug!(%kind, "Disregarding unhandled gateway event kind");
                return Disposition::Ignored;
            }
        };

        let (disposition, updated) = {
            let mut state = self.state.write().await;
            let order_id = Self::resolve_order(&state, &action);
            let before = order_id.and_then(|id| state.order(&id).cloned());

            let _effects =
                self.fulfillment_reducer
                    .reduce(&mut state, action, &self.fulfillment_env);

            let after = order_id.and_then(|id| state.order(&id).cloned());
            match (before, after) {
                (None, _) => (Disposition::UnknownOrder, None),
                (Some(before), Some(after)) if before == after => (Disposition::NoOp, None),
                (Some(_), after) => (Disposition::Applied, after),
            }
        };

        if let Some(order) = updated {
            self.archive_order(&order).await;
        }
        disposition
    }

    /// Resolves which order an event targets: completed/expired sessions
    /// carry the order id as metadata; failures and refunds are located
    /// through the payment-intent index.
    fn resolve_order(state: &CheckoutState, action: &FulfillmentAction) -> Option<OrderId> {
        match action {
            FulfillmentAction::SessionCompleted { order_id, .. }
            | FulfillmentAction::SessionExpired { order_id, .. } => Some(*order_id),
            FulfillmentAction::PaymentFailed {
                payment_intent_id, ..
            }
            | FulfillmentAction::ChargeRefunded {
                payment_intent_id, ..
            } => state.orders_by_intent.get(payment_intent_id).copied(),
            _ => None,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Gets an offering snapshot by id
    pub async fn offering(&self, id: OfferingId) -> Option<Offering> {
        self.state.read().await.offering(&id).cloned()
    }

    /// All offerings, in unspecified order
    pub async fn offerings(&self) -> Vec<Offering> {
        self.state.read().await.offerings.values().cloned().collect()
    }

    /// Gets an order snapshot by id
    pub async fn order(&self, id: OrderId) -> Option<Order> {
        self.state.read().await.order(&id).cloned()
    }

    /// Exact-match order lookup by checkout session id
    pub async fn order_by_session(&self, session_id: &str) -> Option<Order> {
        self.state.read().await.order_by_session(session_id).cloned()
    }

    /// Snapshot of the full state (tests and diagnostics)
    pub async fn state(&self) -> CheckoutState {
        self.state.read().await.clone()
    }

    // ========================================================================
    // Archival
    // ========================================================================

    async fn archive_order(&self, order: &Order) {
        if let Err(error) = self.archive.record(order).await {
            tracing::warn!(
                order_id = %order.id,
                %error,
                "Failed to archive order snapshot; continuing"
            );
        }
    }
}
