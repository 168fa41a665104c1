//! Unified application error type.
//!
//! Every fallible path funnels into [`AppError`], which carries the
//! machine-readable [`ErrorCode`], the HTTP status mapping, and whether
//! the client may retry. Handlers convert it to the standard JSON error
//! response in `middleware::error`.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::inventory::InventoryError;
use crate::payments::types::PaymentEventError;
use crate::pricing::PricingError;
use crate::store::StoreError;

/// Stable error codes for programmatic client handling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    #[serde(rename = "SHOWING_NOT_FOUND")]
    ShowingNotFound,
    #[serde(rename = "BOOKING_NOT_FOUND")]
    BookingNotFound,
    #[serde(rename = "INVALID_SEAT_SELECTION")]
    InvalidSeatSelection,
    #[serde(rename = "SEAT_UNAVAILABLE")]
    SeatUnavailable,
    #[serde(rename = "RESERVATION_TIMEOUT")]
    ReservationTimeout,
    #[serde(rename = "AMOUNT_MISMATCH")]
    AmountMismatch,
    #[serde(rename = "SIGNATURE_INVALID")]
    SignatureInvalid,
    #[serde(rename = "DUPLICATE_PAYMENT_REF")]
    DuplicatePaymentRef,
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
    #[serde(rename = "UNAUTHORIZED")]
    Unauthorized,
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("showing {0} not found")]
    ShowingNotFound(Uuid),
    #[error("booking {0} not found")]
    BookingNotFound(Uuid),
    #[error("invalid seat selection: {reason}")]
    InvalidSeatSelection { reason: String },
    #[error("seats no longer available: {}", seats.join(", "))]
    SeatUnavailable { seats: Vec<String> },
    #[error("reservation contention, please retry")]
    ReservationTimeout,
    #[error("payment amount {received} does not match booking total {expected}")]
    AmountMismatch { expected: i64, received: i64 },
    #[error("webhook signature could not be verified")]
    SignatureInvalid,
    #[error("payment reference {0} was already applied to another booking")]
    DuplicatePaymentRef(String),
    #[error("{message}")]
    Validation { message: String },
    #[error("missing or invalid caller identity")]
    Unauthorized,
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::ShowingNotFound(_) => ErrorCode::ShowingNotFound,
            AppError::BookingNotFound(_) => ErrorCode::BookingNotFound,
            AppError::InvalidSeatSelection { .. } => ErrorCode::InvalidSeatSelection,
            AppError::SeatUnavailable { .. } => ErrorCode::SeatUnavailable,
            AppError::ReservationTimeout => ErrorCode::ReservationTimeout,
            AppError::AmountMismatch { .. } => ErrorCode::AmountMismatch,
            AppError::SignatureInvalid => ErrorCode::SignatureInvalid,
            AppError::DuplicatePaymentRef(_) => ErrorCode::DuplicatePaymentRef,
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::Unauthorized => ErrorCode::Unauthorized,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ShowingNotFound(_) | AppError::BookingNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidSeatSelection { .. } | AppError::Validation { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::SeatUnavailable { .. } | AppError::DuplicatePaymentRef(_) => {
                StatusCode::CONFLICT
            }
            AppError::ReservationTimeout => StatusCode::SERVICE_UNAVAILABLE,
            AppError::AmountMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::SignatureInvalid | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller may retry the same request. Seat contention
    /// counts: the caller can re-pick seats or retry after releases.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::ReservationTimeout
                | AppError::SeatUnavailable { .. }
                | AppError::Internal(_)
        )
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        AppError::InvalidSeatSelection {
            reason: err.to_string(),
        }
    }
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::SeatUnavailable { seats } => AppError::SeatUnavailable { seats },
            InventoryError::LockTimeout => AppError::ReservationTimeout,
            InventoryError::ShowingNotRegistered(id) => AppError::ShowingNotFound(id),
            InventoryError::EmptySeatSet
            | InventoryError::DuplicateSeat(_)
            | InventoryError::UnknownSeat(_) => AppError::InvalidSeatSelection {
                reason: err.to_string(),
            },
            InventoryError::UnknownReservation(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ShowingNotFound(id) => AppError::ShowingNotFound(id),
            StoreError::BookingNotFound(id) => AppError::BookingNotFound(id),
        }
    }
}

impl From<PaymentEventError> for AppError {
    fn from(err: PaymentEventError) -> Self {
        AppError::Validation {
            message: err.to_string(),
        }
    }
}
