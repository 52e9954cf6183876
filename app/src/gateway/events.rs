//! Inbound gateway events.
//!
//! The gateway delivers loosely-typed JSON envelopes; this module narrows
//! them into a closed tagged union over the event kinds the reconciler
//! actually handles. Every other kind lands in [`GatewayEvent::Ignored`]:
//! never a catch-all dynamic dispatch, and never silently dropped before
//! the handler has a chance to log it.
//!
//! Events are parsed only *after* signature verification; nothing here
//! authenticates anything.

use crate::types::{Money, OrderId};
use serde::Deserialize;
use uuid::Uuid;

/// A verified, narrowed gateway event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayEvent {
    /// `checkout.session.completed`: payment confirmed
    SessionCompleted {
        /// Hosted session id
        session_id: String,
        /// Gateway payment-intent id
        payment_intent_id: String,
        /// Order id from the session metadata
        order_id: OrderId,
    },

    /// `checkout.session.expired`: the hosted session lapsed unpaid
    SessionExpired {
        /// Hosted session id
        session_id: String,
        /// Order id from the session metadata
        order_id: OrderId,
    },

    /// `payment_intent.payment_failed`
    PaymentFailed {
        /// Gateway payment-intent id
        payment_intent_id: String,
    },

    /// `charge.refunded`: full or partial; the reconciler decides which
    /// by comparing amounts
    ChargeRefunded {
        /// Gateway payment-intent id
        payment_intent_id: String,
        /// Cumulative refunded amount in minor units
        amount_refunded: Money,
    },

    /// Any event kind the reconciler does not handle
    Ignored {
        /// The raw event kind string
        kind: String,
    },
}

/// Why a payload could not be narrowed into a [`GatewayEvent`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EventParseError {
    /// The body was not valid JSON or did not match the envelope shape
    #[error("payload is not a valid event envelope: {0}")]
    Envelope(String),

    /// A handled event kind was missing a required field
    #[error("{kind} event is missing required field {field}")]
    MissingField {
        /// The event kind
        kind: String,
        /// The field that was absent or malformed
        field: &'static str,
    },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    data: DataEnvelope,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SessionObject {
    id: String,
    #[serde(default)]
    payment_intent: Option<String>,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    order_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct IntentObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChargeObject {
    #[serde(default)]
    payment_intent: Option<String>,
    #[serde(default)]
    amount_refunded: u64,
}

impl GatewayEvent {
    /// Narrows a verified raw payload into an event.
    ///
    /// # Errors
    ///
    /// Returns [`EventParseError`] when the envelope is not JSON, or when
    /// a *handled* kind is missing a field the reconciler needs (a
    /// completed session without an `order_id` in its metadata cannot be
    /// reconciled and is malformed, not ignorable).
    pub fn from_payload(payload: &[u8]) -> Result<Self, EventParseError> {
        let envelope: Envelope = serde_json::from_slice(payload)
            .map_err(|err| EventParseError::Envelope(err.to_string()))?;

        match envelope.kind.as_str() {
            "checkout.session.completed" => {
                let object: SessionObject = deserialize_object(&envelope.kind, envelope.data.object)?;
                let order_id = object.metadata.order_id.ok_or(EventParseError::MissingField {
                    kind: envelope.kind.clone(),
                    field: "metadata.order_id",
                })?;
                let payment_intent_id =
                    object.payment_intent.ok_or(EventParseError::MissingField {
                        kind: envelope.kind.clone(),
                        field: "payment_intent",
                    })?;
                Ok(Self::SessionCompleted {
                    session_id: object.id,
                    payment_intent_id,
                    order_id: OrderId::from_uuid(order_id),
                })
            }

            "checkout.session.expired" => {
                let object: SessionObject = deserialize_object(&envelope.kind, envelope.data.object)?;
                let order_id = object.metadata.order_id.ok_or(EventParseError::MissingField {
                    kind: envelope.kind.clone(),
                    field: "metadata.order_id",
                })?;
                Ok(Self::SessionExpired {
                    session_id: object.id,
                    order_id: OrderId::from_uuid(order_id),
                })
            }

            "payment_intent.payment_failed" => {
                let object: IntentObject = deserialize_object(&envelope.kind, envelope.data.object)?;
                Ok(Self::PaymentFailed {
                    payment_intent_id: object.id,
                })
            }

            "charge.refunded" => {
                let object: ChargeObject = deserialize_object(&envelope.kind, envelope.data.object)?;
                let payment_intent_id =
                    object.payment_intent.ok_or(EventParseError::MissingField {
                        kind: envelope.kind.clone(),
                        field: "payment_intent",
                    })?;
                Ok(Self::ChargeRefunded {
                    payment_intent_id,
                    amount_refunded: Money::from_cents(object.amount_refunded),
                })
            }

            _ => Ok(Self::Ignored {
                kind: envelope.kind,
            }),
        }
    }

    /// The event kind as a metrics/log label.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::SessionCompleted { .. } => "session_completed",
            Self::SessionExpired { .. } => "session_expired",
            Self::PaymentFailed { .. } => "payment_failed",
            Self::ChargeRefunded { .. } => "charge_refunded",
            Self::Ignored { .. } => "ignored",
        }
    }
}

fn deserialize_object<T: serde::de::DeserializeOwned>(
    kind: &str,
    object: serde_json::Value,
) -> Result<T, EventParseError> {
    serde_json::from_value(object).map_err(|_| EventParseError::MissingField {
        kind: kind.to_string(),
        field: "data.object",
    })
}
