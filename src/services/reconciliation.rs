//! Payment reconciliation gateway.
//!
//! Maps provider payment events to exactly one booking exactly once.
//! The idempotency store is consulted before any work and claimed
//! atomically before any state transition, so duplicate and concurrent
//! webhook deliveries collapse to a single completion and a single
//! notification. Both provider paths (confirmation for an existing
//! booking, checkout-session events that create the booking) run
//! through this one contract.

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::AppError;
use crate::payments::types::{PaymentEvent, PaymentEventType};
use crate::services::booking_manager::BookingManager;
use crate::services::notification::{
    NotificationDispatcher, NotificationKind, NotificationRequest,
};
use crate::store::booking_repository::{Booking, BookingRepository, PaymentStatus};
use crate::store::idempotency_repository::{ClaimOutcome, IdempotencyRepository};
use crate::store::showing_repository::ShowingRepository;

/// How an event was applied.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// First delivery: the booking's payment state advanced.
    Applied(Booking),
    /// The transaction id was seen before; nothing changed.
    Replayed(Booking),
    /// A charge failure was recorded against the booking.
    FailureRecorded(Booking),
    /// Event type the gateway does not act on.
    Ignored(String),
}

impl ReconcileOutcome {
    pub fn booking(&self) -> Option<&Booking> {
        match self {
            ReconcileOutcome::Applied(b)
            | ReconcileOutcome::Replayed(b)
            | ReconcileOutcome::FailureRecorded(b) => Some(b),
            ReconcileOutcome::Ignored(_) => None,
        }
    }
}

pub struct ReconciliationGateway {
    bookings: Arc<BookingRepository>,
    showings: Arc<ShowingRepository>,
    idempotency: Arc<IdempotencyRepository>,
    manager: Arc<BookingManager>,
    notifier: NotificationDispatcher,
}

impl ReconciliationGateway {
    pub fn new(
        bookings: Arc<BookingRepository>,
        showings: Arc<ShowingRepository>,
        idempotency: Arc<IdempotencyRepository>,
        manager: Arc<BookingManager>,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            bookings,
            showings,
            idempotency,
            manager,
            notifier,
        }
    }

    pub async fn reconcile(&self, event: PaymentEvent) -> Result<ReconcileOutcome, AppError> {
        // Replay fast path. A record means the event was fully applied
        // once already; answer with the same booking, zero side effects.
        if let Some(booking_id) = self.idempotency.get(&event.transaction_id).await {
            let booking = self.bookings.get(booking_id).await.ok_or_else(|| {
                AppError::Internal(format!(
                    "idempotency record for {} points at missing booking {booking_id}",
                    event.transaction_id
                ))
            })?;
            info!(
                transaction_id = %event.transaction_id,
                booking_id = %booking.id,
                "Payment event replayed, no further effect"
            );
            return Ok(ReconcileOutcome::Replayed(booking));
        }

        match event.event_type {
            PaymentEventType::ChargeSucceeded => self.apply_success(event).await,
            PaymentEventType::ChargeFailed => self.apply_failure(event).await,
            PaymentEventType::Unsupported(ref kind) => {
                warn!(
                    transaction_id = %event.transaction_id,
                    event_type = %kind,
                    "Ignoring unsupported payment event type"
                );
                Ok(ReconcileOutcome::Ignored(kind.clone()))
            }
        }
    }

    async fn apply_success(&self, event: PaymentEvent) -> Result<ReconcileOutcome, AppError> {
        let booking = self.resolve_or_create_booking(&event).await?;

        // Zero tolerance: the charged amount must equal the computed
        // total or the booking stays pending for manual review.
        if event.amount != booking.total_amount {
            warn!(
                transaction_id = %event.transaction_id,
                booking_id = %booking.id,
                expected = booking.total_amount,
                received = event.amount,
                "Amount mismatch, payment left unreconciled for manual review"
            );
            return Err(AppError::AmountMismatch {
                expected: booking.total_amount,
                received: event.amount,
            });
        }

        // The claim is the single atomic arbiter for this transaction
        // id: exactly one concurrent delivery proceeds past it.
        match self
            .idempotency
            .claim(&event.transaction_id, booking.id)
            .await
        {
            ClaimOutcome::AlreadyApplied(existing) => {
                let booking = self.bookings.get(existing).await.ok_or_else(|| {
                    AppError::Internal(format!(
                        "idempotency record for {} points at missing booking {existing}",
                        event.transaction_id
                    ))
                })?;
                Ok(ReconcileOutcome::Replayed(booking))
            }
            ClaimOutcome::Claimed => {
                let updated = self
                    .bookings
                    .set_payment_status(
                        booking.id,
                        PaymentStatus::Completed,
                        Some(event.transaction_id.clone()),
                    )
                    .await?;
                info!(
                    transaction_id = %event.transaction_id,
                    booking_id = %updated.id,
                    amount = event.amount,
                    "Payment reconciled, booking completed"
                );
                self.send_confirmation(&updated).await;
                Ok(ReconcileOutcome::Applied(updated))
            }
        }
    }

    async fn apply_failure(&self, event: PaymentEvent) -> Result<ReconcileOutcome, AppError> {
        // Failures never create bookings; without an existing booking
        // there is nothing to record.
        let booking = match event.booking_ref {
            Some(reference) => match self.bookings.get(reference).await {
                Some(booking) => booking,
                None => {
                    warn!(
                        transaction_id = %event.transaction_id,
                        booking_ref = %reference,
                        "Charge failure for unknown booking, ignoring"
                    );
                    return Ok(ReconcileOutcome::Ignored("charge.failed".to_string()));
                }
            },
            None => return Ok(ReconcileOutcome::Ignored("charge.failed".to_string())),
        };

        match self
            .idempotency
            .claim(&event.transaction_id, booking.id)
            .await
        {
            ClaimOutcome::AlreadyApplied(existing) => {
                let booking = self.bookings.get(existing).await.ok_or_else(|| {
                    AppError::Internal(format!(
                        "idempotency record for {} points at missing booking {existing}",
                        event.transaction_id
                    ))
                })?;
                Ok(ReconcileOutcome::Replayed(booking))
            }
            ClaimOutcome::Claimed => {
                let updated = self
                    .bookings
                    .set_payment_status(booking.id, PaymentStatus::Failed, None)
                    .await?;
                warn!(
                    transaction_id = %event.transaction_id,
                    booking_id = %updated.id,
                    "Charge failure recorded"
                );
                Ok(ReconcileOutcome::FailureRecorded(updated))
            }
        }
    }

    /// Locate the booking the event refers to, or create it from
    /// checkout-session metadata when the provider charged before a
    /// booking existed.
    async fn resolve_or_create_booking(&self, event: &PaymentEvent) -> Result<Booking, AppError> {
        if let Some(reference) = event.booking_ref {
            if let Some(booking) = self.bookings.get(reference).await {
                return Ok(booking);
            }
            if event.metadata.is_none() {
                return Err(AppError::BookingNotFound(reference));
            }
        }

        let metadata = event.metadata.as_ref().ok_or_else(|| AppError::Validation {
            message: "payment event carries neither booking_ref nor checkout metadata".to_string(),
        })?;

        info!(
            transaction_id = %event.transaction_id,
            showing_id = %metadata.showing_id,
            "Creating booking from checkout-session event"
        );
        // Concurrent duplicates of a creation event are serialized by
        // the seat ledger: the loser fails on availability and the
        // provider's retry then takes the replay fast path.
        self.manager
            .create_booking(
                metadata.user_id,
                metadata.showing_id,
                metadata.seats.clone(),
                None,
            )
            .await
    }

    async fn send_confirmation(&self, booking: &Booking) {
        match self.showings.get(booking.showing_id).await {
            Some(showing) => self.notifier.dispatch(NotificationRequest {
                kind: NotificationKind::Confirmation,
                booking: booking.clone(),
                movie_title: showing.movie_title,
                starts_at: showing.starts_at,
            }),
            None => warn!(
                booking_id = %booking.id,
                showing_id = %booking.showing_id,
                "Showing missing for confirmation notification"
            ),
        }
    }
}
