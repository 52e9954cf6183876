//! Client-local cart: the ephemeral pre-order value object.
//!
//! A cart is an ordered sequence of prospective line items keyed by
//! offering + ticket type. It is not authoritative: it exists purely to
//! assemble a checkout request, is persisted only in client-side storage
//! (hence the `serde` derives), is never synchronized across devices, and
//! is never a source of truth for inventory. It sits entirely outside the
//! workflow's consistency guarantees.

use crate::types::{Money, OfferingId, Selection, TicketTypeId};
use serde::{Deserialize, Serialize};

/// One prospective line in a cart
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Offering to purchase
    pub offering_id: OfferingId,
    /// Ticket type within the offering (events)
    pub ticket_type_id: Option<TicketTypeId>,
    /// Display title captured when the line was added
    pub title: String,
    /// Unit price captured when the line was added (display only; the
    /// order snapshots live prices at creation time)
    pub unit_price: Money,
    /// Requested quantity
    pub quantity: u32,
}

/// An ephemeral, ordered collection of prospective line items.
///
/// Lifecycle: created empty, mutated by add/remove/quantity changes,
/// cleared on successful checkout or explicitly by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates an empty cart
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Adds a line, merging quantities when the offering + ticket type key
    /// already exists. Insertion order of first appearance is preserved.
    pub fn add(&mut self, line: CartLine) {
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.offering_id == line.offering_id && l.ticket_type_id == line.ticket_type_id)
        {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            self.lines.push(line);
        }
    }

    /// Removes the line for the given key, if present
    pub fn remove(&mut self, offering_id: &OfferingId, ticket_type_id: Option<&TicketTypeId>) {
        self.lines.retain(|l| {
            !(l.offering_id == *offering_id && l.ticket_type_id.as_ref() == ticket_type_id)
        });
    }

    /// Sets the quantity for the given key. A quantity of zero removes the
    /// line.
    pub fn set_quantity(
        &mut self,
        offering_id: &OfferingId,
        ticket_type_id: Option<&TicketTypeId>,
        quantity: u32,
    ) {
        if quantity == 0 {
            self.remove(offering_id, ticket_type_id);
            return;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| {
            l.offering_id == *offering_id && l.ticket_type_id.as_ref() == ticket_type_id
        }) {
            line.quantity = quantity;
        }
    }

    /// Empties the cart
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Lines in insertion order
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Number of distinct lines
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Display subtotal from the captured unit prices; `None` on overflow
    #[must_use]
    pub fn subtotal(&self) -> Option<Money> {
        self.lines.iter().try_fold(Money::ZERO, |acc, line| {
            acc.checked_add(line.unit_price.checked_multiply(line.quantity)?)
        })
    }

    /// Converts the cart into the checkout request's selections
    #[must_use]
    pub fn to_selections(&self) -> Vec<Selection> {
        self.lines
            .iter()
            .map(|line| Selection {
                offering_id: line.offering_id,
                ticket_type_id: line.ticket_type_id,
                quantity: line.quantity,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(offering_id: OfferingId, ticket_type_id: Option<TicketTypeId>, qty: u32) -> CartLine {
        CartLine {
            offering_id,
            ticket_type_id,
            title: "General".to_string(),
            unit_price: Money::from_cents(2500),
            quantity: qty,
        }
    }

    #[test]
    fn add_merges_by_offering_and_ticket_type() {
        let offering_id = OfferingId::new();
        let ticket_type_id = TicketTypeId::new();
        let mut cart = Cart::new();

        cart.add(line(offering_id, Some(ticket_type_id), 1));
        cart.add(line(offering_id, Some(ticket_type_id), 2));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn same_offering_different_ticket_types_stay_distinct() {
        let offering_id = OfferingId::new();
        let mut cart = Cart::new();

        cart.add(line(offering_id, Some(TicketTypeId::new()), 1));
        cart.add(line(offering_id, Some(TicketTypeId::new()), 1));

        assert_eq!(cart.len(), 2);
    }

    #[test]
    fn set_quantity_zero_removes_the_line() {
        let offering_id = OfferingId::new();
        let ticket_type_id = TicketTypeId::new();
        let mut cart = Cart::new();

        cart.add(line(offering_id, Some(ticket_type_id), 2));
        cart.set_quantity(&offering_id, Some(&ticket_type_id), 0);

        assert!(cart.is_empty());
    }

    #[test]
    fn subtotal_sums_captured_prices() {
        let mut cart = Cart::new();
        cart.add(line(OfferingId::new(), None, 2));
        cart.add(line(OfferingId::new(), None, 1));

        assert_eq!(cart.subtotal(), Some(Money::from_cents(7500)));
    }

    #[test]
    fn clear_empties_and_serde_round_trips() {
        let mut cart = Cart::new();
        cart.add(line(OfferingId::new(), None, 1));

        let stored = serde_json::to_string(&cart).ok();
        assert!(stored.is_some());

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Some(Money::ZERO));
    }
}
