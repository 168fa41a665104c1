//! Showing catalog endpoints (read-only, stale-tolerant).

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;

use super::{ApiResponse, AppState};
use crate::error::AppError;
use crate::inventory::SeatAvailability;
use crate::store::showing_repository::Showing;

#[derive(Debug, Serialize)]
pub struct SeatMapResponse {
    pub showing: Showing,
    pub availability: SeatAvailability,
}

/// GET /api/showings
pub async fn list_showings(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::ok(state.showings.list().await)
}

/// GET /api/showings/{id}/seats
pub async fn seat_availability(
    State(state): State<AppState>,
    Path(showing_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let showing = state
        .showings
        .get(showing_id)
        .await
        .ok_or(AppError::ShowingNotFound(showing_id))?;
    let availability = state.ledger.availability(showing_id).await?;
    Ok(ApiResponse::ok(SeatMapResponse {
        showing,
        availability,
    }))
}
