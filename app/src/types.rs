//! Domain types for the Marquee checkout-to-fulfillment workflow.
//!
//! This module contains the value objects, entities, and aggregate state
//! for the workflow: offerings and their ticket types (the inventory
//! ledger), orders (the pending-order store's records and the audit
//! trail), and the shared [`CheckoutState`] the reducers operate on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an offering (an event or a course)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferingId(Uuid);

impl OfferingId {
    /// Creates a new random `OfferingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `OfferingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OfferingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OfferingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ticket type within an event offering
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketTypeId(Uuid);

impl TicketTypeId {
    /// Creates a new random `TicketTypeId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `TicketTypeId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TicketTypeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an order.
///
/// Generated before payment: the order exists and is discoverable even if
/// the hosted payment session is abandoned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new random `OrderId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `OrderId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (minor-currency units, never floating point)
// ============================================================================

/// Represents money in integer minor-currency units (cents).
///
/// All monetary amounts in the workflow (ticket prices, order subtotals,
/// refunded amounts) are carried in this type. Line-item prices are
/// snapshotted into orders at creation time and never recomputed from the
/// live offering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole dollars.
    ///
    /// Returns `None` if the conversion would overflow.
    #[must_use]
    pub const fn from_dollars(dollars: u64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Subtracts two money amounts (returns `None` if the result would be
    /// negative)
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        if self.0 >= other.0 {
            Some(Self(self.0 - other.0))
        } else {
            None
        }
    }

    /// Multiplies money by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Offerings and Ticket Types (the inventory ledger records)
// ============================================================================

/// What kind of purchasable unit an offering is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferingKind {
    /// A ticketed event; capacity lives on its ticket types
    Event,
    /// A course; capacity (if any) lives on the offering itself
    Course,
}

/// Publication lifecycle of an offering
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicationStatus {
    /// Being configured, not purchasable
    Draft,
    /// Visible and purchasable
    Published,
    /// Withdrawn from sale
    Archived,
}

/// A priced variant of an event offering with its own capacity.
///
/// `quantity_sold` is the authoritative sold counter. It is incremented
/// only when the fulfillment reconciler confirms an order (or a free order
/// fulfills synchronously) and decremented only on full refund, floored at
/// zero. No other code path mutates it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketType {
    /// Unique ticket type identifier
    pub id: TicketTypeId,
    /// Display name (e.g. "General Admission", "VIP")
    pub name: String,
    /// Price per ticket
    pub unit_price: Money,
    /// Total sellable quantity
    pub quantity: u32,
    /// Tickets sold so far
    pub quantity_sold: u32,
    /// Maximum tickets of this type per order
    pub max_per_order: u32,
    /// Whether this type is currently on sale
    pub active: bool,
}

impl TicketType {
    /// Creates a new `TicketType` with nothing sold yet
    #[must_use]
    pub const fn new(
        id: TicketTypeId,
        name: String,
        unit_price: Money,
        quantity: u32,
        max_per_order: u32,
    ) -> Self {
        Self {
            id,
            name,
            unit_price,
            quantity,
            quantity_sold: 0,
            max_per_order,
            active: true,
        }
    }

    /// Remaining advisory availability: `quantity - quantity_sold`.
    ///
    /// Advisory because concurrent pending orders are not deducted; the
    /// check is only applied at order-creation time.
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.quantity.saturating_sub(self.quantity_sold)
    }

    /// Checks whether the requested quantity passes the advisory check
    #[must_use]
    pub const fn has_availability(&self, quantity: u32) -> bool {
        self.available() >= quantity
    }

    /// Records a confirmed sale. No capacity re-check happens here: a paid
    /// customer is never rejected by the ledger.
    pub(crate) const fn record_sale(&mut self, quantity: u32) {
        self.quantity_sold = self.quantity_sold.saturating_add(quantity);
    }

    /// Returns previously sold tickets to the pool, floored at zero.
    pub(crate) const fn release_sale(&mut self, quantity: u32) {
        self.quantity_sold = self.quantity_sold.saturating_sub(quantity);
    }
}

/// A purchasable unit: a ticketed event or a course.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offering {
    /// Unique offering identifier
    pub id: OfferingId,
    /// Display title
    pub title: String,
    /// Event or course
    pub kind: OfferingKind,
    /// Base price. Courses are priced here; event pricing lives on the
    /// ticket types. Zero means free.
    pub base_price: Money,
    /// Publication lifecycle status
    pub status: PublicationStatus,
    /// Ticket types (events only; empty for courses)
    pub ticket_types: Vec<TicketType>,
    /// Enrollment capacity for courses (`None` = unlimited)
    pub capacity: Option<u32>,
    /// Seats/enrollments sold at the offering level (courses)
    pub quantity_sold: u32,
    /// When the offering was created
    pub created_at: DateTime<Utc>,
}

impl Offering {
    /// Creates a new draft `Offering`
    #[must_use]
    pub const fn new(
        id: OfferingId,
        title: String,
        kind: OfferingKind,
        base_price: Money,
        capacity: Option<u32>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            kind,
            base_price,
            status: PublicationStatus::Draft,
            ticket_types: Vec::new(),
            capacity,
            quantity_sold: 0,
            created_at,
        }
    }

    /// Whether purchasing this offering costs nothing at the base price
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.base_price.is_zero()
    }

    /// Whether this offering is visible and purchasable
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.status == PublicationStatus::Published
    }

    /// Looks up a ticket type by id
    #[must_use]
    pub fn ticket_type(&self, id: &TicketTypeId) -> Option<&TicketType> {
        self.ticket_types.iter().find(|tt| tt.id == *id)
    }

    pub(crate) fn ticket_type_mut(&mut self, id: &TicketTypeId) -> Option<&mut TicketType> {
        self.ticket_types.iter_mut().find(|tt| tt.id == *id)
    }

    /// Remaining offering-level availability (course enrollments).
    ///
    /// `None` means unlimited.
    #[must_use]
    pub fn remaining_capacity(&self) -> Option<u32> {
        self.capacity.map(|cap| cap.saturating_sub(self.quantity_sold))
    }
}

// ============================================================================
// Orders
// ============================================================================

/// Customer contact fields captured at checkout
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    /// Full name
    pub name: String,
    /// Email address (an indexed lookup field)
    pub email: String,
}

/// A single line of an order.
///
/// Unit prices are snapshotted at order-creation time and never recomputed
/// from the live offering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Offering being purchased
    pub offering_id: OfferingId,
    /// Ticket type (events; `None` for course enrollments)
    pub ticket_type_id: Option<TicketTypeId>,
    /// Snapshot of the offering title / ticket type name at order time
    pub description: String,
    /// Snapshot of the unit price at order time
    pub unit_price: Money,
    /// Quantity purchased
    pub quantity: u32,
}

impl LineItem {
    /// `unit_price × quantity`, `None` on overflow
    #[must_use]
    pub const fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

/// Payment lifecycle of an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Recorded, payment not confirmed
    Pending,
    /// Payment confirmed by a verified gateway event
    Paid,
    /// Session expired or payment failed
    Failed,
    /// A refund event was applied (full or partial)
    Refunded,
}

/// Fulfillment lifecycle of an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Awaiting payment
    Pending,
    /// Fulfilled
    Confirmed,
    /// Expired, failed, or fully refunded
    Cancelled,
}

/// One checkout attempt and its outcome record.
///
/// Orders are never deleted; they are the audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier, generated before payment
    pub id: OrderId,
    /// Snapshotted line items
    pub line_items: Vec<LineItem>,
    /// Sum of line totals at creation time
    pub subtotal: Money,
    /// Discount applied (reserved; always zero in this workflow)
    pub discount: Money,
    /// Amount the customer is charged
    pub total: Money,
    /// Customer contact fields
    pub customer: CustomerInfo,
    /// Payment lifecycle
    pub payment_status: PaymentStatus,
    /// Fulfillment lifecycle
    pub status: OrderStatus,
    /// Hosted checkout session id, once attached
    pub checkout_session_id: Option<String>,
    /// Gateway payment-intent id, stored when payment confirms
    pub payment_intent_id: Option<String>,
    /// Total amount refunded so far
    pub amount_refunded: Money,
    /// When the order was created
    pub created_at: DateTime<Utc>,
    /// When the order was last transitioned
    pub updated_at: DateTime<Utc>,
    /// When payment confirmed
    pub purchased_at: Option<DateTime<Utc>>,
    /// When the refund event was applied
    pub refunded_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Creates a new `pending` order from snapshotted line items.
    #[must_use]
    pub const fn new(
        id: OrderId,
        line_items: Vec<LineItem>,
        subtotal: Money,
        customer: CustomerInfo,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            line_items,
            subtotal,
            discount: Money::ZERO,
            total: subtotal,
            customer,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            checkout_session_id: None,
            payment_intent_id: None,
            amount_refunded: Money::ZERO,
            created_at,
            updated_at: created_at,
            purchased_at: None,
            refunded_at: None,
        }
    }

    /// Whether this order charges nothing (free-offering short-circuit)
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.total.is_zero()
    }

    /// Whether a refund event covered the full charged amount
    #[must_use]
    pub fn is_fully_refunded(&self) -> bool {
        self.payment_status == PaymentStatus::Refunded && self.amount_refunded >= self.total
    }

    /// Derived read: refunded, but for less than the charged amount.
    ///
    /// Partial refunds leave `status` at `Confirmed`; this flag is how
    /// callers distinguish that case.
    #[must_use]
    pub fn is_partially_refunded(&self) -> bool {
        self.payment_status == PaymentStatus::Refunded && self.amount_refunded < self.total
    }
}

/// A requested line of a checkout, before validation and price snapshot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Offering to purchase
    pub offering_id: OfferingId,
    /// Ticket type within the offering (required for events)
    pub ticket_type_id: Option<TicketTypeId>,
    /// Requested quantity
    pub quantity: u32,
}

// ============================================================================
// Errors
// ============================================================================

/// Validation and lookup errors surfaced by the checkout workflow.
///
/// These are the synchronously-surfaced errors of the taxonomy: rendered
/// inline in the checkout UI, never retried automatically.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum CheckoutError {
    /// The selected offering does not exist
    #[error("offering {0} not found")]
    UnknownOffering(OfferingId),

    /// The offering exists but is not purchasable
    #[error("offering '{title}' is not published")]
    OfferingNotPublished {
        /// Offering title
        title: String,
    },

    /// The selected ticket type does not exist on the offering
    #[error("ticket type {0} not found")]
    UnknownTicketType(TicketTypeId),

    /// An event offering was selected without a ticket type
    #[error("a ticket type is required for '{title}'")]
    TicketTypeRequired {
        /// Offering title
        title: String,
    },

    /// The ticket type is not currently on sale
    #[error("'{name}' is not currently on sale")]
    TicketTypeInactive {
        /// Ticket type name
        name: String,
    },

    /// Advisory availability check failed
    #[error("'{name}' is sold out: requested {requested}, {available} available")]
    SoldOut {
        /// Ticket type or offering name
        name: String,
        /// Requested quantity
        requested: u32,
        /// Advisory availability at check time
        available: u32,
    },

    /// Per-order cap exceeded
    #[error("'{name}' allows at most {max} per order")]
    ExceedsMaxPerOrder {
        /// Ticket type name
        name: String,
        /// The cap
        max: u32,
    },

    /// Quantity of zero requested
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// No line items in the checkout request
    #[error("order must contain at least one line item")]
    EmptyOrder,

    /// Checked money arithmetic overflowed
    #[error("order amount overflows")]
    AmountOverflow,

    /// Order lookup failed
    #[error("order {0} not found")]
    UnknownOrder(OrderId),

    /// An offering with this id already exists
    #[error("offering {0} already exists")]
    DuplicateOffering(OfferingId),
}

// ============================================================================
// Aggregate State
// ============================================================================

/// Shared state for the checkout workflow.
///
/// Offerings (with their sold counters, the inventory ledger) and orders
/// live in one state so the fulfillment reconciler can apply an order
/// transition and its inventory delta as a single unit. The secondary maps
/// are the exact-match lookup indexes: checkout-session id and
/// payment-intent id, mirroring the indexed fields of the persisted
/// layout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutState {
    /// All offerings indexed by id
    pub offerings: HashMap<OfferingId, Offering>,
    /// All orders indexed by id
    pub orders: HashMap<OrderId, Order>,
    /// Order lookup by hosted checkout session id
    pub orders_by_session: HashMap<String, OrderId>,
    /// Order lookup by gateway payment-intent id
    pub orders_by_intent: HashMap<String, OrderId>,
    /// Last validation error recorded by a reducer
    pub last_error: Option<CheckoutError>,
}

impl CheckoutState {
    /// Creates a new empty `CheckoutState`
    #[must_use]
    pub fn new() -> Self {
        Self {
            offerings: HashMap::new(),
            orders: HashMap::new(),
            orders_by_session: HashMap::new(),
            orders_by_intent: HashMap::new(),
            last_error: None,
        }
    }

    /// Gets an offering by id
    #[must_use]
    pub fn offering(&self, id: &OfferingId) -> Option<&Offering> {
        self.offerings.get(id)
    }

    /// Gets an order by id
    #[must_use]
    pub fn order(&self, id: &OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    /// Exact-match lookup by checkout session id
    #[must_use]
    pub fn order_by_session(&self, session_id: &str) -> Option<&Order> {
        self.orders_by_session
            .get(session_id)
            .and_then(|id| self.orders.get(id))
    }

    /// Exact-match lookup by payment-intent id
    #[must_use]
    pub fn order_by_intent(&self, payment_intent_id: &str) -> Option<&Order> {
        self.orders_by_intent
            .get(payment_intent_id)
            .and_then(|id| self.orders.get(id))
    }

    /// Number of orders recorded (orders are never deleted)
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Commits a confirmed sale to the ledger: increments the sold counter
    /// on each line item's ticket type (or on the offering for course
    /// enrollments). Called only from reducer event application.
    pub(crate) fn commit_sale(&mut self, line_items: &[LineItem]) {
        for item in line_items {
            let Some(offering) = self.offerings.get_mut(&item.offering_id) else {
                continue;
            };
            match item.ticket_type_id {
                Some(ticket_type_id) => {
                    if let Some(ticket_type) = offering.ticket_type_mut(&ticket_type_id) {
                        ticket_type.record_sale(item.quantity);
                    }
                }
                None => {
                    offering.quantity_sold = offering.quantity_sold.saturating_add(item.quantity);
                }
            }
        }
    }

    /// Releases a fully refunded sale back to the ledger, flooring each
    /// counter at zero. Called only from reducer event application.
    pub(crate) fn release_sale(&mut self, line_items: &[LineItem]) {
        for item in line_items {
            let Some(offering) = self.offerings.get_mut(&item.offering_id) else {
                continue;
            };
            match item.ticket_type_id {
                Some(ticket_type_id) => {
                    if let Some(ticket_type) = offering.ticket_type_mut(&ticket_type_id) {
                        ticket_type.release_sale(item.quantity);
                    }
                }
                None => {
                    offering.quantity_sold = offering.quantity_sold.saturating_sub(item.quantity);
                }
            }
        }
    }
}

impl Default for CheckoutState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_checked_arithmetic() {
        let five = Money::from_cents(500);
        let three = Money::from_cents(300);
        assert_eq!(five.checked_add(three), Some(Money::from_cents(800)));
        assert_eq!(five.checked_sub(three), Some(Money::from_cents(200)));
        assert_eq!(three.checked_sub(five), None);
        assert_eq!(three.checked_multiply(4), Some(Money::from_cents(1200)));
        assert_eq!(Money::from_cents(u64::MAX).checked_multiply(2), None);
    }

    #[test]
    fn money_display_renders_cents() {
        assert_eq!(Money::from_cents(12305).to_string(), "$123.05");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn ticket_type_availability_is_advisory_difference() {
        let mut tt = TicketType::new(
            TicketTypeId::new(),
            "General".to_string(),
            Money::from_cents(2500),
            10,
            4,
        );
        assert_eq!(tt.available(), 10);
        tt.record_sale(9);
        assert_eq!(tt.available(), 1);
        assert!(tt.has_availability(1));
        assert!(!tt.has_availability(2));
    }

    #[test]
    fn release_sale_floors_at_zero() {
        let mut tt = TicketType::new(
            TicketTypeId::new(),
            "General".to_string(),
            Money::from_cents(2500),
            10,
            4,
        );
        tt.record_sale(2);
        tt.release_sale(5);
        assert_eq!(tt.quantity_sold, 0);
        assert_eq!(tt.available(), 10);
    }

    #[test]
    fn order_refund_reads() {
        let customer = CustomerInfo {
            name: "Dana".to_string(),
            email: "dana@example.com".to_string(),
        };
        let mut order = Order::new(
            OrderId::new(),
            vec![],
            Money::from_cents(5000),
            customer,
            Utc::now(),
        );
        order.payment_status = PaymentStatus::Refunded;
        order.amount_refunded = Money::from_cents(2000);
        assert!(order.is_partially_refunded());
        assert!(!order.is_fully_refunded());

        order.amount_refunded = Money::from_cents(5000);
        assert!(order.is_fully_refunded());
        assert!(!order.is_partially_refunded());
    }

    #[test]
    fn state_indexes_resolve_orders() {
        let mut state = CheckoutState::new();
        let order_id = OrderId::new();
        let customer = CustomerInfo {
            name: "Dana".to_string(),
            email: "dana@example.com".to_string(),
        };
        let order = Order::new(order_id, vec![], Money::ZERO, customer, Utc::now());
        state.orders.insert(order_id, order);
        state.orders_by_session.insert("cs_1".to_string(), order_id);
        state.orders_by_intent.insert("pi_1".to_string(), order_id);

        assert!(state.order_by_session("cs_1").is_some());
        assert!(state.order_by_intent("pi_1").is_some());
        assert!(state.order_by_session("cs_2").is_none());
    }
}
