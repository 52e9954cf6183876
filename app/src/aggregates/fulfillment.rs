//! Fulfillment aggregate: the reconciler state machine.
//!
//! Applies verified gateway events to order and inventory state. Legal
//! transitions:
//!
//! ```text
//! pending ──(session completed)──► confirmed/paid ──(full refund)──► cancelled/refunded
//!    │                                   │
//!    └──(session expired)──► cancelled   └──(partial refund)──► confirmed/refunded
//! ```
//!
//! No other transitions exist. An event arriving for an order already in a
//! terminal state for that event kind is a no-op, not an error; that is
//! what makes the reconciler safe under at-least-once webhook delivery.
//! Each transition carries its inventory delta in the same event
//! application, so a redelivered webhook can never double-count
//! `quantity_sold`.
//!
//! The reconciler never recomputes monetary totals from gateway data: it
//! reads back identifiers and the refunded amount, compares the refunded
//! amount to the charge snapshotted on the order, and applies deltas that
//! were fixed at order-creation time.

use crate::types::{CheckoutState, Money, OrderId, OrderStatus, PaymentStatus};
use chrono::{DateTime, Utc};
use marquee_core::{SmallVec, effect::Effect, environment::Clock, reducer::Reducer};
use marquee_macros::Action;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the Fulfillment aggregate.
///
/// Commands correspond one-to-one with the verified gateway event kinds;
/// events record the transition actually applied.
#[derive(Action, Clone, Debug, Serialize, Deserialize)]
pub enum FulfillmentAction {
    // Commands (one per verified gateway event kind)
    /// A hosted checkout session completed with payment
    #[command]
    SessionCompleted {
        /// Hosted session id
        session_id: String,
        /// Gateway payment-intent id to store on the order
        payment_intent_id: String,
        /// Order id carried in the session metadata
        order_id: OrderId,
    },

    /// A hosted checkout session expired unpaid
    #[command]
    SessionExpired {
        /// Hosted session id
        session_id: String,
        /// Order id carried in the session metadata
        order_id: OrderId,
    },

    /// A payment intent failed
    #[command]
    PaymentFailed {
        /// Payment-intent id to locate the order by
        payment_intent_id: String,
    },

    /// A charge was refunded (fully or partially)
    #[command]
    ChargeRefunded {
        /// Payment-intent id to locate the order by
        payment_intent_id: String,
        /// Cumulative refunded amount reported by the gateway
        amount_refunded: Money,
    },

    // Events
    /// An order was confirmed: paid, intent stored, inventory committed
    #[event]
    OrderConfirmed {
        /// Order ID
        order_id: OrderId,
        /// Stored payment-intent id
        payment_intent_id: String,
        /// When confirmed
        confirmed_at: DateTime<Utc>,
    },

    /// A pending order's session expired: failed and cancelled
    #[event]
    OrderExpired {
        /// Order ID
        order_id: OrderId,
        /// When expired
        expired_at: DateTime<Utc>,
    },

    /// A payment failure was recorded; `status` is left untouched
    #[event]
    PaymentMarkedFailed {
        /// Order ID
        order_id: OrderId,
        /// When recorded
        failed_at: DateTime<Utc>,
    },

    /// A refund was applied; full refunds cancel and release inventory
    #[event]
    OrderRefunded {
        /// Order ID
        order_id: OrderId,
        /// Cumulative refunded amount
        amount_refunded: Money,
        /// When applied
        refunded_at: DateTime<Utc>,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the Fulfillment aggregate
#[derive(Clone)]
pub struct FulfillmentEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
}

impl FulfillmentEnvironment {
    /// Creates a new `FulfillmentEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Fulfillment aggregate.
///
/// Every command is guarded by the order's current `payment_status`, so
/// redelivered webhooks reduce to no-ops. Lookup misses are logged and
/// swallowed: missing orders are not transient, and surfacing an error
/// would only trigger pointless gateway retries.
#[derive(Clone, Debug, Default)]
pub struct FulfillmentReducer;

impl FulfillmentReducer {
    /// Creates a new `FulfillmentReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Applies an event to state.
    ///
    /// This is the only place (besides the free-order short-circuit) that
    /// mutates the ledger's sold counters.
    fn apply_event(state: &mut CheckoutState, action: &FulfillmentAction) {
        match action {
            FulfillmentAction::OrderConfirmed {
                order_id,
                payment_intent_id,
                confirmed_at,
            } => {
                let items = if let Some(order) = state.orders.get_mut(order_id) {
                    order.payment_status = PaymentStatus::Paid;
                    order.status = OrderStatus::Confirmed;
                    order.payment_intent_id = Some(payment_intent_id.clone());
                    order.purchased_at = Some(*confirmed_at);
                    order.updated_at = *confirmed_at;
                    order.line_items.clone()
                } else {
                    return;
                };
                state
                    .orders_by_intent
                    .insert(payment_intent_id.clone(), *order_id);
                state.commit_sale(&items);
            }

            FulfillmentAction::OrderExpired {
                order_id,
                expired_at,
            } => {
                // No inventory change: none was committed for a pending order
                if let Some(order) = state.orders.get_mut(order_id) {
                    order.payment_status = PaymentStatus::Failed;
                    order.status = OrderStatus::Cancelled;
                    order.updated_at = *expired_at;
                }
            }

            FulfillmentAction::PaymentMarkedFailed {
                order_id,
                failed_at,
            } => {
                if let Some(order) = state.orders.get_mut(order_id) {
                    order.payment_status = PaymentStatus::Failed;
                    order.updated_at = *failed_at;
                }
            }

            FulfillmentAction::OrderRefunded {
                order_id,
                amount_refunded,
                refunded_at,
            } => {
                let full_refund_items = if let Some(order) = state.orders.get_mut(order_id) {
                    let already_cancelled = order.status == OrderStatus::Cancelled;
                    order.payment_status = PaymentStatus::Refunded;
                    order.amount_refunded = *amount_refunded;
                    order.refunded_at = Some(*refunded_at);
                    order.updated_at = *refunded_at;
                    if *amount_refunded >= order.total && !already_cancelled {
                        order.status = OrderStatus::Cancelled;
                        Some(order.line_items.clone())
                    } else {
                        // Partial refund: status stays Confirmed, inventory kept
                        None
                    }
                } else {
                    return;
                };
                if let Some(items) = full_refund_items {
                    state.release_sale(&items);
                }
            }

            // Commands don't modify state
            FulfillmentAction::SessionCompleted { .. }
            | FulfillmentAction::SessionExpired { .. }
            | FulfillmentAction::PaymentFailed { .. }
            | FulfillmentAction::ChargeRefunded { .. } => {}
        }
    }
}

impl Reducer for FulfillmentReducer {
    type State = CheckoutState;
    type Action = FulfillmentAction;
    type Environment = FulfillmentEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per gateway event kind
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Checkout Session Completed ==========
            FulfillmentAction::SessionCompleted {
                session_id,
                payment_intent_id,
                order_id,
            } => {
                let Some(order) = state.orders.get(&order_id) else {
                    tracing::warn!(
                        %order_id,
                        %session_id,
                        "Completed session references unknown order; acknowledging"
                    );
                    return SmallVec::new();
                };

                // Redelivery guard: a paid order must not double-count
                if order.payment_status != PaymentStatus::Pending {
                    tracing::debug!(
                        %order_id,
                        payment_status = ?order.payment_status,
                        "Session completion redelivered for non-pending order; no-op"
                    );
                    return SmallVec::new();
                }

                Self::apply_event(
                    state,
                    &FulfillmentAction::OrderConfirmed {
                        order_id,
                        payment_intent_id,
                        confirmed_at: env.clock.now(),
                    },
                );
                tracing::info!(%order_id, %session_id, "Order confirmed");
                SmallVec::new()
            }

            // ========== Checkout Session Expired ==========
            FulfillmentAction::SessionExpired {
                session_id,
                order_id,
            } => {
                let Some(order) = state.orders.get(&order_id) else {
                    tracing::warn!(
                        %order_id,
                        %session_id,
                        "Expired session references unknown order; acknowledging"
                    );
                    return SmallVec::new();
                };

                // A late expiry after completion must not downgrade the order
                if order.payment_status != PaymentStatus::Pending {
                    tracing::debug!(
                        %order_id,
                        payment_status = ?order.payment_status,
                        "Session expiry for non-pending order; no-op"
                    );
                    return SmallVec::new();
                }

                Self::apply_event(
                    state,
                    &FulfillmentAction::OrderExpired {
                        order_id,
                        expired_at: env.clock.now(),
                    },
                );
                tracing::info!(%order_id, %session_id, "Order cancelled on session expiry");
                SmallVec::new()
            }

            // ========== Payment Intent Failed ==========
            FulfillmentAction::PaymentFailed { payment_intent_id } => {
                let Some(order) = state.order_by_intent(&payment_intent_id) else {
                    tracing::warn!(
                        %payment_intent_id,
                        "Payment failure references unknown order; acknowledging"
                    );
                    return SmallVec::new();
                };
                let order_id = order.id;

                if matches!(
                    order.payment_status,
                    PaymentStatus::Failed | PaymentStatus::Refunded
                ) {
                    tracing::debug!(%order_id, "Payment failure redelivered; no-op");
                    return SmallVec::new();
                }

                Self::apply_event(
                    state,
                    &FulfillmentAction::PaymentMarkedFailed {
                        order_id,
                        failed_at: env.clock.now(),
                    },
                );
                tracing::info!(%order_id, %payment_intent_id, "Payment marked failed");
                SmallVec::new()
            }

            // ========== Charge Refunded ==========
            FulfillmentAction::ChargeRefunded {
                payment_intent_id,
                amount_refunded,
            } => {
                let Some(order) = state.order_by_intent(&payment_intent_id) else {
                    tracing::warn!(
                        %payment_intent_id,
                        "Refund references unknown order; acknowledging"
                    );
                    return SmallVec::new();
                };
                let order_id = order.id;

                // The refunded amount is cumulative: a redelivery carries
                // the same amount, an escalation (second partial, or
                // partial then full) carries a larger one.
                if order.payment_status == PaymentStatus::Refunded
                    && amount_refunded <= order.amount_refunded
                {
                    tracing::debug!(%order_id, "Refund redelivered; no-op");
                    return SmallVec::new();
                }
                if !matches!(
                    order.payment_status,
                    PaymentStatus::Paid | PaymentStatus::Refunded
                ) {
                    tracing::warn!(
                        %order_id,
                        payment_status = ?order.payment_status,
                        "Refund for unpaid order; acknowledging without transition"
                    );
                    return SmallVec::new();
                }

                Self::apply_event(
                    state,
                    &FulfillmentAction::OrderRefunded {
                        order_id,
                        amount_refunded,
                        refunded_at: env.clock.now(),
                    },
                );
                tracing::info!(
                    %order_id,
                    %payment_intent_id,
                    amount_refunded = amount_refunded.cents(),
                    "Refund applied"
                );
                SmallVec::new()
            }

            // ========== Events (replayed) ==========
            event => {
                Self::apply_event(state, &event);
                SmallVec::new()
            }
        }
    }
}
