//! Booking transaction manager.
//!
//! Orchestrates one booking as a unit of work: validate the showing,
//! price the seats, hold them in the inventory ledger, persist the
//! booking, commit the hold (seats become sold), then the best-effort
//! tail (counter update, confirmation notification). Steps before the
//! hold commit are hard preconditions; nothing is persisted when any of
//! them fails. The tail never rolls a booking back.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::inventory::SeatLedger;
use crate::pricing::{self, PricingConfig, SeatSelection};
use crate::services::notification::{
    NotificationDispatcher, NotificationKind, NotificationRequest,
};
use crate::store::booking_repository::{Booking, BookingRepository, PaymentStatus};
use crate::store::idempotency_repository::{ClaimOutcome, IdempotencyRepository};
use crate::store::showing_repository::ShowingRepository;

pub struct BookingManager {
    showings: Arc<ShowingRepository>,
    bookings: Arc<BookingRepository>,
    idempotency: Arc<IdempotencyRepository>,
    ledger: Arc<SeatLedger>,
    pricing: PricingConfig,
    notifier: NotificationDispatcher,
}

impl BookingManager {
    pub fn new(
        showings: Arc<ShowingRepository>,
        bookings: Arc<BookingRepository>,
        idempotency: Arc<IdempotencyRepository>,
        ledger: Arc<SeatLedger>,
        pricing: PricingConfig,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            showings,
            bookings,
            idempotency,
            ledger,
            pricing,
            notifier,
        }
    }

    /// Create a booking for `user_id` on `showing_id`.
    ///
    /// With `payment_ref` set (a pre-authorized provider reference) the
    /// booking is persisted as `Completed` and the reference is claimed
    /// in the idempotency store, so a later webhook for the same
    /// transaction replays instead of double-applying. Without it the
    /// booking starts `Pending` and waits for reconciliation.
    ///
    /// Not idempotent: resubmitting the same request books seats again
    /// (and fails on availability). Payment-driven idempotency lives in
    /// the reconciliation gateway.
    pub async fn create_booking(
        &self,
        user_id: Uuid,
        showing_id: Uuid,
        selections: Vec<SeatSelection>,
        payment_ref: Option<String>,
    ) -> Result<Booking, AppError> {
        let showing = self
            .showings
            .get(showing_id)
            .await
            .ok_or(AppError::ShowingNotFound(showing_id))?;

        let total_amount = pricing::quote(&selections, &showing.price_table, &self.pricing)?;

        let seat_ids: Vec<String> = selections.iter().map(|s| s.seat_id.clone()).collect();
        let token = self.ledger.hold(showing_id, &seat_ids).await?;

        let booking_id = Uuid::new_v4();
        let mut payment_status = PaymentStatus::Pending;
        if let Some(reference) = payment_ref.as_deref() {
            // Claim before persisting: a duplicate reference aborts the
            // whole operation with nothing written and the hold undone.
            match self.idempotency.claim(reference, booking_id).await {
                ClaimOutcome::Claimed => payment_status = PaymentStatus::Completed,
                ClaimOutcome::AlreadyApplied(existing) => {
                    if let Err(err) = self.ledger.release(&token).await {
                        warn!(error = %err, "Failed to release hold after duplicate payment ref");
                    }
                    warn!(
                        payment_ref = reference,
                        existing_booking = %existing,
                        "Rejected booking with already-applied payment reference"
                    );
                    return Err(AppError::DuplicatePaymentRef(reference.to_string()));
                }
            }
        }

        let booking = Booking {
            id: booking_id,
            user_id,
            showing_id,
            seats: selections,
            total_amount,
            payment_status,
            payment_ref,
            reminded: false,
            created_at: Utc::now(),
        };
        self.bookings.insert(booking.clone()).await;

        // The hold is ours and the booking is persisted; commit turns
        // the seats Sold. Failure here means the sweeper reclaimed the
        // hold out from under us, which the TTL makes effectively
        // unreachable within one request.
        if let Err(err) = self.ledger.commit(&token).await {
            warn!(booking_id = %booking_id, error = %err, "Hold vanished before commit");
            let _ = self
                .bookings
                .set_payment_status(booking_id, PaymentStatus::Failed, None)
                .await;
            return Err(AppError::Internal(
                "reservation expired before it could be finalized".to_string(),
            ));
        }

        // Best-effort tail: a missed counter update is a reporting
        // defect, not a booking failure.
        if let Err(err) = self
            .showings
            .increment_booking_count(showing_id, booking.seats.len() as u32)
            .await
        {
            warn!(showing_id = %showing_id, error = %err, "Failed to update booking counter");
        }

        info!(
            booking_id = %booking.id,
            user_id = %user_id,
            showing_id = %showing_id,
            seats = booking.seats.len(),
            amount = total_amount,
            status = ?booking.payment_status,
            "Booking created"
        );

        // Confirmation goes out once per booking: here when payment was
        // collected inline, otherwise when reconciliation completes it.
        if booking.payment_status == PaymentStatus::Completed {
            self.notifier.dispatch(NotificationRequest {
                kind: NotificationKind::Confirmation,
                booking: booking.clone(),
                movie_title: showing.movie_title.clone(),
                starts_at: showing.starts_at,
            });
        }

        Ok(booking)
    }
}
