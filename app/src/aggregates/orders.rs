//! Orders aggregate: the pending-order store.
//!
//! Records an order intent durably *before* the customer leaves for the
//! gateway's hosted page. Validation here is the advisory capacity check:
//! `quantity - quantity_sold`, with concurrent pending orders deliberately
//! not deducted. The real scarcity decision happens at fulfillment time,
//! for whoever pays first.
//!
//! Free orders (zero subtotal) never touch the payment gateway: the same
//! transition that opens the order marks it paid and commits inventory
//! synchronously.

use crate::types::{
    CheckoutError, CheckoutState, CustomerInfo, LineItem, Money, Order, OrderId, Selection,
};
use chrono::{DateTime, Utc};
use marquee_core::{SmallVec, effect::Effect, environment::Clock, reducer::Reducer};
use marquee_macros::Action;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the Orders aggregate
#[derive(Action, Clone, Debug, Serialize, Deserialize)]
pub enum OrderAction {
    // Commands
    /// Open a new pending order from validated selections
    #[command]
    OpenOrder {
        /// Order ID, generated before payment
        order_id: OrderId,
        /// Requested selections
        selections: Vec<Selection>,
        /// Customer contact fields
        customer: CustomerInfo,
    },

    /// Attach the hosted checkout session id to an order.
    ///
    /// Idempotent: re-attaching the same session id is a no-op.
    #[command]
    AttachPaymentSession {
        /// Order to attach to
        order_id: OrderId,
        /// Hosted checkout session id
        session_id: String,
    },

    // Events
    /// A pending order was recorded
    #[event]
    OrderOpened {
        /// The full order snapshot (prices already frozen)
        order: Order,
    },

    /// A zero-subtotal order fulfilled synchronously, bypassing the
    /// gateway
    #[event]
    FreeOrderFulfilled {
        /// Order ID
        order_id: OrderId,
        /// When it fulfilled
        fulfilled_at: DateTime<Utc>,
    },

    /// A checkout session was attached to an order
    #[event]
    PaymentSessionAttached {
        /// Order ID
        order_id: OrderId,
        /// Hosted checkout session id
        session_id: String,
        /// When attached
        attached_at: DateTime<Utc>,
    },

    /// Validation failed
    #[event]
    ValidationFailed {
        /// The validation error
        error: CheckoutError,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the Orders aggregate
#[derive(Clone)]
pub struct OrderEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
}

impl OrderEnvironment {
    /// Creates a new `OrderEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Orders aggregate
#[derive(Clone, Debug, Default)]
pub struct OrderReducer;

impl OrderReducer {
    /// Creates a new `OrderReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates selections against the catalog and snapshots them into
    /// line items with frozen prices.
    ///
    /// This is the advisory `reserveCapacity` check: availability is
    /// `quantity - quantity_sold` at this instant. Other pending orders
    /// are not deducted, so two racing checkouts can both pass for the
    /// last unit.
    ///
    /// # Errors
    ///
    /// Returns the first [`CheckoutError`] a selection trips over.
    pub fn snapshot_selections(
        state: &CheckoutState,
        selections: &[Selection],
    ) -> Result<(Vec<LineItem>, Money), CheckoutError> {
        if selections.is_empty() {
            return Err(CheckoutError::EmptyOrder);
        }

        let mut line_items = Vec::with_capacity(selections.len());
        for selection in selections {
            if selection.quantity == 0 {
                return Err(CheckoutError::ZeroQuantity);
            }

            let offering = state
                .offering(&selection.offering_id)
                .ok_or(CheckoutError::UnknownOffering(selection.offering_id))?;
            if !offering.is_published() {
                return Err(CheckoutError::OfferingNotPublished {
                    title: offering.title.clone(),
                });
            }

            let line_item = match selection.ticket_type_id {
                Some(ticket_type_id) => {
                    let ticket_type = offering
                        .ticket_type(&ticket_type_id)
                        .ok_or(CheckoutError::UnknownTicketType(ticket_type_id))?;
                    if !ticket_type.active {
                        return Err(CheckoutError::TicketTypeInactive {
                            name: ticket_type.name.clone(),
                        });
                    }
                    if selection.quantity > ticket_type.max_per_order {
                        return Err(CheckoutError::ExceedsMaxPerOrder {
                            name: ticket_type.name.clone(),
                            max: ticket_type.max_per_order,
                        });
                    }
                    if !ticket_type.has_availability(selection.quantity) {
                        return Err(CheckoutError::SoldOut {
                            name: ticket_type.name.clone(),
                            requested: selection.quantity,
                            available: ticket_type.available(),
                        });
                    }
                    LineItem {
                        offering_id: offering.id,
                        ticket_type_id: Some(ticket_type_id),
                        description: format!("{} ({})", offering.title, ticket_type.name),
                        unit_price: ticket_type.unit_price,
                        quantity: selection.quantity,
                    }
                }
                None => {
                    if !offering.ticket_types.is_empty() {
                        return Err(CheckoutError::TicketTypeRequired {
                            title: offering.title.clone(),
                        });
                    }
                    if let Some(remaining) = offering.remaining_capacity() {
                        if remaining < selection.quantity {
                            return Err(CheckoutError::SoldOut {
                                name: offering.title.clone(),
                                requested: selection.quantity,
                                available: remaining,
                            });
                        }
                    }
                    LineItem {
                        offering_id: offering.id,
                        ticket_type_id: None,
                        description: offering.title.clone(),
                        unit_price: offering.base_price,
                        quantity: selection.quantity,
                    }
                }
            };
            line_items.push(line_item);
        }

        let subtotal = line_items
            .iter()
            .try_fold(Money::ZERO, |acc, item| {
                acc.checked_add(item.line_total()?)
            })
            .ok_or(CheckoutError::AmountOverflow)?;

        Ok((line_items, subtotal))
    }

    /// Applies an event to state
    fn apply_event(state: &mut CheckoutState, action: &OrderAction) {
        match action {
            OrderAction::OrderOpened { order } => {
                state.orders.insert(order.id, order.clone());
                state.last_error = None;
            }

            OrderAction::FreeOrderFulfilled {
                order_id,
                fulfilled_at,
            } => {
                let items = if let Some(order) = state.orders.get_mut(order_id) {
                    order.payment_status = crate::types::PaymentStatus::Paid;
                    order.status = crate::types::OrderStatus::Confirmed;
                    order.purchased_at = Some(*fulfilled_at);
                    order.updated_at = *fulfilled_at;
                    order.line_items.clone()
                } else {
                    return;
                };
                state.commit_sale(&items);
                state.last_error = None;
            }

            OrderAction::PaymentSessionAttached {
                order_id,
                session_id,
                attached_at,
            } => {
                if let Some(order) = state.orders.get_mut(order_id) {
                    order.checkout_session_id = Some(session_id.clone());
                    order.updated_at = *attached_at;
                }
                state.orders_by_session.insert(session_id.clone(), *order_id);
                state.last_error = None;
            }

            OrderAction::ValidationFailed { error } => {
                state.last_error = Some(error.clone());
            }

            // Commands don't modify state
            OrderAction::OpenOrder { .. } | OrderAction::AttachPaymentSession { .. } => {}
        }
    }

    fn fail(state: &mut CheckoutState, error: CheckoutError) {
        Self::apply_event(state, &OrderAction::ValidationFailed { error });
    }
}

impl Reducer for OrderReducer {
    type State = CheckoutState;
    type Action = OrderAction;
    type Environment = OrderEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Open Order ==========
            OrderAction::OpenOrder {
                order_id,
                selections,
                customer,
            } => {
                let (line_items, subtotal) =
                    match Self::snapshot_selections(state, &selections) {
                        Ok(snapshot) => snapshot,
                        Err(error) => {
                            Self::fail(state, error);
                            return SmallVec::new();
                        }
                    };

                let now = env.clock.now();
                let order = Order::new(order_id, line_items, subtotal, customer, now);
                let is_free = order.is_free();

                Self::apply_event(state, &OrderAction::OrderOpened { order });

                // Zero subtotal: fulfill without the gateway, committing
                // inventory in the same transition.
                if is_free {
                    Self::apply_event(
                        state,
                        &OrderAction::FreeOrderFulfilled {
                            order_id,
                            fulfilled_at: now,
                        },
                    );
                }

                SmallVec::new()
            }

            // ========== Attach Payment Session ==========
            OrderAction::AttachPaymentSession {
                order_id,
                session_id,
            } => {
                let Some(order) = state.orders.get(&order_id) else {
                    Self::fail(state, CheckoutError::UnknownOrder(order_id));
                    return SmallVec::new();
                };

                // Idempotent: re-attaching the same session is a no-op.
                if order.checkout_session_id.as_deref() == Some(session_id.as_str()) {
                    state.last_error = None;
                    return SmallVec::new();
                }

                Self::apply_event(
                    state,
                    &OrderAction::PaymentSessionAttached {
                        order_id,
                        session_id,
                        attached_at: env.clock.now(),
                    },
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
