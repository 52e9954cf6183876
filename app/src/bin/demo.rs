//! Demo: drives the checkout workflow end to end in process.
//!
//! Creates an event offering and a free course, runs a free checkout, a
//! paid checkout confirmed by a simulated gateway event, and a full
//! refund. Useful for eyeballing the transitions without a gateway.

use marquee::archive::NullOrderArchive;
use marquee::gateway::GatewayEvent;
use marquee::store::CheckoutStore;
use marquee::types::{CustomerInfo, Money, OfferingKind, Selection};
use marquee_core::environment::SystemClock;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("info,marquee=debug")
        .init();

    let store = CheckoutStore::new(Arc::new(SystemClock), Arc::new(NullOrderArchive));

    // Catalog
    let gala = store
        .create_offering(
            "Spring Gala".to_string(),
            OfferingKind::Event,
            Money::ZERO,
            None,
        )
        .await?;
    let general = store
        .add_ticket_type(
            gala.id,
            "General".to_string(),
            Money::from_cents(2500),
            10,
            4,
        )
        .await?;
    store.publish_offering(gala.id).await?;

    let course = store
        .create_offering(
            "Intro to Watercolor".to_string(),
            OfferingKind::Course,
            Money::ZERO,
            Some(20),
        )
        .await?;
    store.publish_offering(course.id).await?;

    let customer = CustomerInfo {
        name: "Dana".to_string(),
        email: "dana@example.com".to_string(),
    };

    // Free checkout: fulfills synchronously, no gateway involved
    let free_order = store
        .open_order(
            vec![Selection {
                offering_id: course.id,
                ticket_type_id: None,
                quantity: 1,
            }],
            customer.clone(),
        )
        .await?;
    tracing::info!(
        order_id = %free_order.id,
        payment_status = ?free_order.payment_status,
        "Free checkout fulfilled"
    );

    // Paid checkout: pending until the gateway confirms
    let paid_order = store
        .open_order(
            vec![Selection {
                offering_id: gala.id,
                ticket_type_id: Some(general.id),
                quantity: 2,
            }],
            customer,
        )
        .await?;
    store
        .attach_payment_session(paid_order.id, "cs_demo".to_string())
        .await?;

    // Simulated gateway confirmation (idempotent: applied twice)
    let completed = GatewayEvent::SessionCompleted {
        session_id: "cs_demo".to_string(),
        payment_intent_id: "pi_demo".to_string(),
        order_id: paid_order.id,
    };
    let first = store.apply_gateway_event(completed.clone()).await;
    let second = store.apply_gateway_event(completed).await;
    tracing::info!(?first, ?second, "Completion delivered twice");

    // Full refund releases both tickets
    let refund = store
        .apply_gateway_event(GatewayEvent::ChargeRefunded {
            payment_intent_id: "pi_demo".to_string(),
            amount_refunded: paid_order.total,
        })
        .await;
    tracing::info!(?refund, "Refund applied");

    let offering = store.offering(gala.id).await;
    if let Some(offering) = offering {
        for tt in &offering.ticket_types {
            tracing::info!(
                ticket_type = %tt.name,
                sold = tt.quantity_sold,
                available = tt.available(),
                "Final inventory"
            );
        }
    }

    Ok(())
}
