//! Catalog aggregate: offering management.
//!
//! Creates offerings, attaches ticket types, and moves offerings through
//! their publication lifecycle. The sold counters on these records form
//! the inventory ledger, but nothing here mutates them: sales are
//! committed and released only by the order and fulfillment reducers.

use crate::types::{
    CheckoutError, CheckoutState, Money, Offering, OfferingId, OfferingKind, PublicationStatus,
    TicketType, TicketTypeId,
};
use chrono::{DateTime, Utc};
use marquee_core::{SmallVec, effect::Effect, environment::Clock, reducer::Reducer};
use marquee_macros::Action;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the Catalog aggregate
#[derive(Action, Clone, Debug, Serialize, Deserialize)]
pub enum CatalogAction {
    // Commands
    /// Create a new draft offering
    #[command]
    CreateOffering {
        /// Offering ID
        offering_id: OfferingId,
        /// Display title
        title: String,
        /// Event or course
        kind: OfferingKind,
        /// Base price (courses; zero = free)
        base_price: Money,
        /// Enrollment capacity for courses
        capacity: Option<u32>,
    },

    /// Add a ticket type to an event offering
    #[command]
    AddTicketType {
        /// Offering to attach to
        offering_id: OfferingId,
        /// Ticket type ID
        ticket_type_id: TicketTypeId,
        /// Display name
        name: String,
        /// Price per ticket
        unit_price: Money,
        /// Total sellable quantity
        quantity: u32,
        /// Per-order cap
        max_per_order: u32,
    },

    /// Publish an offering (make it purchasable)
    #[command]
    PublishOffering {
        /// Offering to publish
        offering_id: OfferingId,
    },

    /// Withdraw an offering from sale
    #[command]
    ArchiveOffering {
        /// Offering to archive
        offering_id: OfferingId,
    },

    /// Toggle whether a ticket type is on sale
    #[command]
    SetTicketTypeActive {
        /// Offering the ticket type belongs to
        offering_id: OfferingId,
        /// Ticket type to toggle
        ticket_type_id: TicketTypeId,
        /// New active flag
        active: bool,
    },

    // Events
    /// An offering was created
    #[event]
    OfferingCreated {
        /// Offering ID
        offering_id: OfferingId,
        /// Display title
        title: String,
        /// Event or course
        kind: OfferingKind,
        /// Base price
        base_price: Money,
        /// Enrollment capacity
        capacity: Option<u32>,
        /// When created
        created_at: DateTime<Utc>,
    },

    /// A ticket type was added
    #[event]
    TicketTypeAdded {
        /// Offering it was added to
        offering_id: OfferingId,
        /// The full ticket type record
        ticket_type: TicketType,
    },

    /// An offering became purchasable
    #[event]
    OfferingPublished {
        /// Offering ID
        offering_id: OfferingId,
    },

    /// An offering was withdrawn from sale
    #[event]
    OfferingArchived {
        /// Offering ID
        offering_id: OfferingId,
    },

    /// A ticket type's active flag changed
    #[event]
    TicketTypeActiveSet {
        /// Offering ID
        offering_id: OfferingId,
        /// Ticket type ID
        ticket_type_id: TicketTypeId,
        /// New active flag
        active: bool,
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

/// Environment dependencies for the Catalog aggregate
#[derive(Clone)]
pub struct CatalogEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
}

impl CatalogEnvironment {
    /// Creates a new `CatalogEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Catalog aggregate
#[derive(Clone, Debug, Default)]
pub struct CatalogReducer;

impl CatalogReducer {
    /// Creates a new `CatalogReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Applies an event to state
    fn apply_event(state: &mut CheckoutState, action: &CatalogAction) {
        match action {
            CatalogAction::OfferingCreated {
                offering_id,
                title,
                kind,
                base_price,
                capacity,
                created_at,
            } => {
                let offering = Offering::new(
                    *offering_id,
                    title.clone(),
                    *kind,
                    *base_price,
                    *capacity,
                    *created_at,
                );
                state.offerings.insert(*offering_id, offering);
                state.last_error = None;
            }

            CatalogAction::TicketTypeAdded {
                offering_id,
                ticket_type,
            } => {
                if let Some(offering) = state.offerings.get_mut(offering_id) {
                    offering.ticket_types.push(ticket_type.clone());
                }
                state.last_error = None;
            }

            CatalogAction::OfferingPublished { offering_id } => {
                if let Some(offering) = state.offerings.get_mut(offering_id) {
                    offering.status = PublicationStatus::Published;
                }
                state.last_error = None;
            }

            CatalogAction::OfferingArchived { offering_id } => {
                if let Some(offering) = state.offerings.get_mut(offering_id) {
                    offering.status = PublicationStatus::Archived;
                }
                state.last_error = None;
            }

            CatalogAction::TicketTypeActiveSet {
                offering_id,
                ticket_type_id,
                active,
            } => {
                if let Some(ticket_type) = state
                    .offerings
                    .get_mut(offering_id)
                    .and_then(|o| o.ticket_type_mut(ticket_type_id))
                {
                    ticket_type.active = *active;
                }
                state.last_error = None;
            }

            CatalogAction::ValidationFailed { error } => {
                state.last_error = Some(error.clone());
            }

            // Commands don't modify state
            CatalogAction::CreateOffering { .. }
            | CatalogAction::AddTicketType { .. }
            | CatalogAction::PublishOffering { .. }
            | CatalogAction::ArchiveOffering { .. }
            | CatalogAction::SetTicketTypeActive { .. } => {}
        }
    }

    fn fail(state: &mut CheckoutState, error: CheckoutError) {
        Self::apply_event(state, &CatalogAction::ValidationFailed { error });
    }
}

impl Reducer for CatalogReducer {
    type State = CheckoutState;
    type Action = CatalogAction;
    type Environment = CatalogEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CatalogAction::CreateOffering {
                offering_id,
                title,
                kind,
                base_price,
                capacity,
            } => {
                if state.offerings.contains_key(&offering_id) {
                    Self::fail(state, CheckoutError::DuplicateOffering(offering_id));
                    return SmallVec::new();
                }

                let created = CatalogAction::OfferingCreated {
                    offering_id,
                    title,
                    kind,
                    base_price,
                    capacity,
                    created_at: env.clock.now(),
                };
                Self::apply_event(state, &created);
                SmallVec::new()
            }

            CatalogAction::AddTicketType {
                offering_id,
                ticket_type_id,
                name,
                unit_price,
                quantity,
                max_per_order,
            } => {
                if !state.offerings.contains_key(&offering_id) {
                    Self::fail(state, CheckoutError::UnknownOffering(offering_id));
                    return SmallVec::new();
                }

                let added = CatalogAction::TicketTypeAdded {
                    offering_id,
                    ticket_type: TicketType::new(
                        ticket_type_id,
                        name,
                        unit_price,
                        quantity,
                        max_per_order,
                    ),
                };
                Self::apply_event(state, &added);
                SmallVec::new()
            }

            CatalogAction::PublishOffering { offering_id } => {
                if !state.offerings.contains_key(&offering_id) {
                    Self::fail(state, CheckoutError::UnknownOffering(offering_id));
                    return SmallVec::new();
                }

                Self::apply_event(state, &CatalogAction::OfferingPublished { offering_id });
                SmallVec::new()
            }

            CatalogAction::ArchiveOffering { offering_id } => {
                if !state.offerings.contains_key(&offering_id) {
                    Self::fail(state, CheckoutError::UnknownOffering(offering_id));
                    return SmallVec::new();
                }

                Self::apply_event(state, &CatalogAction::OfferingArchived { offering_id });
                SmallVec::new()
            }

            CatalogAction::SetTicketTypeActive {
                offering_id,
                ticket_type_id,
                active,
            } => {
                let Some(offering) = state.offerings.get(&offering_id) else {
                    Self::fail(state, CheckoutError::UnknownOffering(offering_id));
                    return SmallVec::new();
                };
                if offering.ticket_type(&ticket_type_id).is_none() {
                    Self::fail(state, CheckoutError::UnknownTicketType(ticket_type_id));
                    return SmallVec::new();
                }

                Self::apply_event(
                    state,
                    &CatalogAction::TicketTypeActiveSet {
                        offering_id,
                        ticket_type_id,
                        active,
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use marquee_core::environment::SystemClock;
    use marquee_testing::{ReducerTest, assertions};

    fn create_test_env() -> CatalogEnvironment {
        CatalogEnvironment::new(Arc::new(SystemClock))
    }

    #[test]
    fn test_create_and_publish_offering() {
        let offering_id = OfferingId::new();

        let state = ReducerTest::new(CatalogReducer::new())
            .with_env(create_test_env())
            .given_state(CheckoutState::new())
            .when_action(CatalogAction::CreateOffering {
                offering_id,
                title: "Spring Gala".to_string(),
                kind: OfferingKind::Event,
                base_price: Money::ZERO,
                capacity: None,
            })
            .then_state(move |state| {
                let offering = state.offering(&offering_id).unwrap();
                assert_eq!(offering.status, PublicationStatus::Draft);
                assert!(state.last_error.is_none());
            })
            .then_effects(assertions::assert_no_effects)
            .run();

        ReducerTest::new(CatalogReducer::new())
            .with_env(create_test_env())
            .given_state(state)
            .when_action(CatalogAction::PublishOffering { offering_id })
            .then_state(move |state| {
                assert!(state.offering(&offering_id).unwrap().is_published());
            })
            .run();
    }

    #[test]
    fn test_duplicate_offering_rejected() {
        let offering_id = OfferingId::new();
        let mut state = CheckoutState::new();
        state.offerings.insert(
            offering_id,
            Offering::new(
                offering_id,
                "Spring Gala".to_string(),
                OfferingKind::Event,
                Money::ZERO,
                None,
                Utc::now(),
            ),
        );

        ReducerTest::new(CatalogReducer::new())
            .with_env(create_test_env())
            .given_state(state)
            .when_action(CatalogAction::CreateOffering {
                offering_id,
                title: "Spring Gala".to_string(),
                kind: OfferingKind::Event,
                base_price: Money::ZERO,
                capacity: None,
            })
            .then_state(move |state| {
                assert_eq!(
                    state.last_error,
                    Some(CheckoutError::DuplicateOffering(offering_id))
                );
            })
            .run();
    }

    #[test]
    fn test_add_ticket_type_to_missing_offering_fails() {
        let offering_id = OfferingId::new();

        ReducerTest::new(CatalogReducer::new())
            .with_env(create_test_env())
            .given_state(CheckoutState::new())
            .when_action(CatalogAction::AddTicketType {
                offering_id,
                ticket_type_id: TicketTypeId::new(),
                name: "General".to_string(),
                unit_price: Money::from_cents(2500),
                quantity: 100,
                max_per_order: 8,
            })
            .then_state(move |state| {
                assert_eq!(
                    state.last_error,
                    Some(CheckoutError::UnknownOffering(offering_id))
                );
            })
            .run();
    }

    #[test]
    fn test_set_ticket_type_active_toggles_flag() {
        let offering_id = OfferingId::new();
        let ticket_type_id = TicketTypeId::new();
        let mut offering = Offering::new(
            offering_id,
            "Spring Gala".to_string(),
            OfferingKind::Event,
            Money::ZERO,
            None,
            Utc::now(),
        );
        offering.ticket_types.push(TicketType::new(
            ticket_type_id,
            "General".to_string(),
            Money::from_cents(2500),
            100,
            8,
        ));
        let mut state = CheckoutState::new();
        state.offerings.insert(offering_id, offering);

        ReducerTest::new(CatalogReducer::new())
            .with_env(create_test_env())
            .given_state(state)
            .when_action(CatalogAction::SetTicketTypeActive {
                offering_id,
                ticket_type_id,
                active: false,
            })
            .then_state(move |state| {
                let offering = state.offering(&offering_id).unwrap();
                assert!(!offering.ticket_type(&ticket_type_id).unwrap().active);
            })
            .run();
    }

    #[test]
    fn test_action_classification() {
        let action = CatalogAction::PublishOffering {
            offering_id: OfferingId::new(),
        };
        assert!(action.is_command());
        assert!(!action.is_event());

        let event = CatalogAction::OfferingPublished {
            offering_id: OfferingId::new(),
        };
        assert!(event.is_event());
        assert_eq!(event.event_type(), "catalog.offering_published");
    }
}
