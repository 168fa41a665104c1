//! Payment webhook ingress.
//!
//! The raw body is verified against the `x-webhook-signature` header
//! before it is parsed or anything is touched. Replays answer 200 like
//! first deliveries so the provider stops retrying; an amount mismatch
//! answers 422 and leaves the booking pending.

use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use tracing::{info, warn};

use super::AppState;
use crate::error::AppError;
use crate::payments::signature::verify_hmac_sha512_hex;
use crate::payments::types::PaymentEvent;
use crate::services::ReconcileOutcome;

/// POST /api/payments/webhook
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get("x-webhook-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            warn!("Webhook rejected: missing signature header");
            AppError::SignatureInvalid
        })?;

    if !verify_hmac_sha512_hex(body.as_bytes(), &state.webhook_secret, signature) {
        warn!("Webhook rejected: signature verification failed");
        return Err(AppError::SignatureInvalid);
    }

    let event = PaymentEvent::from_webhook_body(body.as_bytes())?;
    let transaction_id = event.transaction_id.clone();

    let status = match state.gateway.reconcile(event).await? {
        ReconcileOutcome::Applied(_) => "applied",
        ReconcileOutcome::Replayed(_) => "replayed",
        ReconcileOutcome::FailureRecorded(_) => "failure_recorded",
        ReconcileOutcome::Ignored(_) => "ignored",
    };
    info!(transaction_id = %transaction_id, status, "Webhook processed");
    Ok(Json(serde_json::json!({ "status": status })))
}
