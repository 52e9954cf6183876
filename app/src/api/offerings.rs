//! Offering management and availability endpoints.
//!
//! - `POST /api/offerings` - create a draft offering
//! - `POST /api/offerings/:id/ticket-types` - add a ticket type
//! - `POST /api/offerings/:id/publish` - make an offering purchasable
//! - `GET /api/offerings` - list offerings
//! - `GET /api/offerings/:id/availability` - advisory availability read

use super::into_app_error;
use crate::server::state::AppState;
use crate::types::{Money, Offering, OfferingId, OfferingKind, PublicationStatus};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use marquee_web::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create an offering.
#[derive(Debug, Deserialize)]
pub struct CreateOfferingRequest {
    /// Display title
    pub title: String,
    /// `event` or `course`
    pub kind: OfferingKindRequest,
    /// Base price in minor-currency units (courses; zero = free)
    #[serde(default)]
    pub base_price_cents: u64,
    /// Enrollment capacity (courses; omit for unlimited)
    pub capacity: Option<u32>,
}

/// Offering kind from the client.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferingKindRequest {
    /// A ticketed event
    Event,
    /// A course
    Course,
}

impl From<OfferingKindRequest> for OfferingKind {
    fn from(kind: OfferingKindRequest) -> Self {
        match kind {
            OfferingKindRequest::Event => Self::Event,
            OfferingKindRequest::Course => Self::Course,
        }
    }
}

/// Request to add a ticket type to an event offering.
#[derive(Debug, Deserialize)]
pub struct AddTicketTypeRequest {
    /// Display name
    pub name: String,
    /// Price per ticket in minor-currency units
    pub unit_price_cents: u64,
    /// Total sellable quantity
    pub quantity: u32,
    /// Per-order cap
    pub max_per_order: u32,
}

/// Offering details.
#[derive(Debug, Serialize)]
pub struct OfferingResponse {
    /// Offering ID
    pub id: Uuid,
    /// Display title
    pub title: String,
    /// Publication status
    pub status: PublicationStatus,
    /// Base price in minor-currency units
    pub base_price_cents: u64,
    /// Ticket types
    pub ticket_types: Vec<TicketTypeResponse>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// Ticket type details.
#[derive(Debug, Serialize)]
pub struct TicketTypeResponse {
    /// Ticket type ID
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Price per ticket in minor-currency units
    pub unit_price_cents: u64,
    /// Total sellable quantity
    pub quantity: u32,
    /// Tickets sold
    pub quantity_sold: u32,
    /// Per-order cap
    pub max_per_order: u32,
    /// Whether the type is on sale
    pub active: bool,
}

impl From<&Offering> for OfferingResponse {
    fn from(offering: &Offering) -> Self {
        Self {
            id: *offering.id.as_uuid(),
            title: offering.title.clone(),
            status: offering.status,
            base_price_cents: offering.base_price.cents(),
            ticket_types: offering
                .ticket_types
                .iter()
                .map(|tt| TicketTypeResponse {
                    id: *tt.id.as_uuid(),
                    name: tt.name.clone(),
                    unit_price_cents: tt.unit_price.cents(),
                    quantity: tt.quantity,
                    quantity_sold: tt.quantity_sold,
                    max_per_order: tt.max_per_order,
                    active: tt.active,
                })
                .collect(),
            created_at: offering.created_at,
        }
    }
}

/// Offerings list.
#[derive(Debug, Serialize)]
pub struct ListOfferingsResponse {
    /// Offerings
    pub offerings: Vec<OfferingResponse>,
    /// Total count
    pub total: usize,
}

/// Advisory availability for one offering.
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    /// Offering ID
    pub offering_id: Uuid,
    /// Per-ticket-type availability (events)
    pub ticket_types: Vec<TicketTypeAvailability>,
    /// Remaining offering-level capacity (courses; `null` = unlimited)
    pub remaining_capacity: Option<u32>,
}

/// Advisory availability for one ticket type.
#[derive(Debug, Serialize)]
pub struct TicketTypeAvailability {
    /// Ticket type ID
    pub ticket_type_id: Uuid,
    /// Display name
    pub name: String,
    /// `quantity - quantity_sold` at read time (advisory only)
    pub available: u32,
    /// Whether the type is on sale
    pub active: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a draft offering.
///
/// # Errors
///
/// `4xx` on validation failure.
pub async fn create_offering(
    State(state): State<AppState>,
    Json(request): Json<CreateOfferingRequest>,
) -> Result<(StatusCode, Json<OfferingResponse>), AppError> {
    if request.title.trim().is_empty() {
        return Err(AppError::bad_request("Offering title is required"));
    }

    let offering = state
        .store
        .create_offering(
            request.title.trim().to_string(),
            request.kind.into(),
            Money::from_cents(request.base_price_cents),
            request.capacity,
        )
        .await
        .map_err(into_app_error)?;

    Ok((StatusCode::CREATED, Json((&offering).into())))
}

/// Add a ticket type to an event offering.
///
/// # Errors
///
/// `404` for unknown offerings, `4xx` on validation failure.
pub async fn add_ticket_type(
    State(state): State<AppState>,
    Path(offering_id): Path<Uuid>,
    Json(request): Json<AddTicketTypeRequest>,
) -> Result<(StatusCode, Json<TicketTypeResponse>), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::bad_request("Ticket type name is required"));
    }
    if request.quantity == 0 {
        return Err(AppError::validation("Ticket quantity must be at least 1"));
    }
    if request.max_per_order == 0 {
        return Err(AppError::validation("Per-order cap must be at least 1"));
    }

    let ticket_type = state
        .store
        .add_ticket_type(
            OfferingId::from_uuid(offering_id),
            request.name.trim().to_string(),
            Money::from_cents(request.unit_price_cents),
            request.quantity,
            request.max_per_order,
        )
        .await
        .map_err(into_app_error)?;

    Ok((
        StatusCode::CREATED,
        Json(TicketTypeResponse {
            id: *ticket_type.id.as_uuid(),
            name: ticket_type.name,
            unit_price_cents: ticket_type.unit_price.cents(),
            quantity: ticket_type.quantity,
            quantity_sold: ticket_type.quantity_sold,
            max_per_order: ticket_type.max_per_order,
            active: ticket_type.active,
        }),
    ))
}

/// Publish an offering.
///
/// # Errors
///
/// `404` for unknown offerings.
pub async fn publish_offering(
    State(state): State<AppState>,
    Path(offering_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .publish_offering(OfferingId::from_uuid(offering_id))
        .await
        .map_err(into_app_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// List all offerings.
pub async fn list_offerings(State(state): State<AppState>) -> Json<ListOfferingsResponse> {
    let offerings = state.store.offerings().await;
    Json(ListOfferingsResponse {
        total: offerings.len(),
        offerings: offerings.iter().map(Into::into).collect(),
    })
}

/// Advisory availability read for an offering.
///
/// # Errors
///
/// `404` for unknown offerings.
pub async fn get_availability(
    State(state): State<AppState>,
    Path(offering_id): Path<Uuid>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let offering = state
        .store
        .offering(OfferingId::from_uuid(offering_id))
        .await
        .ok_or_else(|| AppError::not_found("Offering", offering_id))?;

    Ok(Json(AvailabilityResponse {
        offering_id: *offering.id.as_uuid(),
        ticket_types: offering
            .ticket_types
            .iter()
            .map(|tt| TicketTypeAvailability {
                ticket_type_id: *tt.id.as_uuid(),
                name: tt.name.clone(),
                available: tt.available(),
                active: tt.active,
            })
            .collect(),
        remaining_capacity: offering.remaining_capacity(),
    }))
}
