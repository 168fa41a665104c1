//! HTTP surface: booking endpoints, seat availability, the payment
//! webhook and health.

pub mod bookings;
pub mod showings;
pub mod webhooks;

use axum::{
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::inventory::SeatLedger;
use crate::services::{BookingManager, ReconciliationGateway};
use crate::store::booking_repository::BookingRepository;
use crate::store::showing_repository::ShowingRepository;

/// Shared handler state. Everything is `Arc`'d; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub showings: Arc<ShowingRepository>,
    pub bookings: Arc<BookingRepository>,
    pub ledger: Arc<SeatLedger>,
    pub manager: Arc<BookingManager>,
    pub gateway: Arc<ReconciliationGateway>,
    pub webhook_secret: String,
}

/// Uniform success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// Caller identity. Authentication mechanics live upstream; the
/// verified user id arrives in the `x-user-id` header.
pub fn authenticated_user(headers: &HeaderMap) -> Result<Uuid, AppError> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or(AppError::Unauthorized)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/bookings",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route("/api/bookings/{id}", get(bookings::get_booking))
        .route("/api/showings", get(showings::list_showings))
        .route("/api/showings/{id}/seats", get(showings::seat_availability))
        .route("/api/payments/webhook", post(webhooks::handle_webhook))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn user_header_is_required_and_must_be_a_uuid() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            authenticated_user(&headers),
            Err(AppError::Unauthorized)
        ));

        headers.insert("x-user-id", HeaderValue::from_static("not-a-uuid"));
        assert!(matches!(
            authenticated_user(&headers),
            Err(AppError::Unauthorized)
        ));

        let id = Uuid::new_v4();
        headers.insert(
            "x-user-id",
            HeaderValue::from_str(&id.to_string()).unwrap(),
        );
        assert_eq!(authenticated_user(&headers).unwrap(), id);
    }
}
