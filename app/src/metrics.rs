//! Metrics registration for the checkout workflow.
//!
//! Counters are recorded through the `metrics` facade; wire an exporter
//! in the deployment if scraping is wanted.

use metrics::describe_counter;

/// Describes the workflow's counters. Call once at startup.
pub fn register() {
    describe_counter!(
        "checkout_orders_opened_total",
        "Orders recorded as pending (or fulfilled free) at checkout time"
    );
    describe_counter!(
        "webhook_events_total",
        "Verified gateway events, labeled by kind and disposition"
    );
    describe_counter!(
        "webhook_rejected_total",
        "Webhook payloads rejected before processing, labeled by reason"
    );
}
