//! Provider-agnostic payment event types.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::pricing::SeatSelection;

#[derive(Debug, Clone, Error)]
pub enum PaymentEventError {
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),
}

/// What a provider event asks the gateway to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventType {
    ChargeSucceeded,
    ChargeFailed,
    Unsupported(String),
}

impl PaymentEventType {
    fn from_wire(event: &str) -> Self {
        // Accept the event names the common gateways emit for the same
        // two outcomes.
        match event {
            "charge.succeeded" | "charge.success" | "payment_intent.succeeded" => {
                PaymentEventType::ChargeSucceeded
            }
            "charge.failed" | "payment_intent.payment_failed" => PaymentEventType::ChargeFailed,
            other => PaymentEventType::Unsupported(other.to_string()),
        }
    }
}

/// Checkout-session metadata: enough to create the booking when payment
/// succeeded before any booking existed.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutMetadata {
    pub user_id: Uuid,
    pub showing_id: Uuid,
    pub seats: Vec<SeatSelection>,
}

/// A payment confirmation to reconcile against exactly one booking.
/// Ephemeral: owned by the gateway for the duration of processing, not
/// persisted beyond the idempotency record it produces.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub transaction_id: String,
    pub event_type: PaymentEventType,
    /// Amount the provider captured, minor currency units.
    pub amount: i64,
    pub booking_ref: Option<Uuid>,
    pub metadata: Option<CheckoutMetadata>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    id: String,
    event: String,
    amount: i64,
    #[serde(default)]
    booking_ref: Option<Uuid>,
    #[serde(default)]
    metadata: Option<CheckoutMetadata>,
}

impl PaymentEvent {
    /// Parse the raw webhook body. Signature verification happens
    /// before this is called; parse failures are client errors.
    pub fn from_webhook_body(body: &[u8]) -> Result<Self, PaymentEventError> {
        let envelope: WebhookEnvelope = serde_json::from_slice(body)
            .map_err(|e| PaymentEventError::InvalidPayload(e.to_string()))?;
        if envelope.id.trim().is_empty() {
            return Err(PaymentEventError::InvalidPayload(
                "transaction id must not be empty".to_string(),
            ));
        }
        if envelope.amount <= 0 {
            return Err(PaymentEventError::InvalidPayload(format!(
                "amount must be positive, got {}",
                envelope.amount
            )));
        }
        Ok(Self {
            transaction_id: envelope.id,
            event_type: PaymentEventType::from_wire(&envelope.event),
            amount: envelope.amount,
            booking_ref: envelope.booking_ref,
            metadata: envelope.metadata,
            received_at: Utc::now(),
        })
    }
}
