//! Booking endpoints.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{authenticated_user, ApiResponse, AppState};
use crate::error::AppError;
use crate::pricing::SeatSelection;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub showing_id: Uuid,
    pub seats: Vec<SeatSelection>,
    /// Pre-authorized provider payment reference, when the client
    /// confirmed payment before booking.
    #[serde(default)]
    pub payment_ref: Option<String>,
}

/// POST /api/bookings
pub async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = authenticated_user(&headers)?;
    let booking = state
        .manager
        .create_booking(
            user_id,
            request.showing_id,
            request.seats,
            request.payment_ref,
        )
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(booking)))
}

/// GET /api/bookings
pub async fn list_bookings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user_id = authenticated_user(&headers)?;
    let bookings = state.bookings.list_for_user(user_id).await;
    Ok(ApiResponse::ok(bookings))
}

/// GET /api/bookings/{id}
pub async fn get_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = authenticated_user(&headers)?;
    let booking = state
        .bookings
        .get(booking_id)
        .await
        // Another user's booking looks like a missing one.
        .filter(|booking| booking.user_id == user_id)
        .ok_or(AppError::BookingNotFound(booking_id))?;
    Ok(ApiResponse::ok(booking))
}
