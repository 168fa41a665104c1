//! Booking repository.
//!
//! Bookings are created by the booking manager, have their payment
//! status advanced by the reconciliation gateway and their reminded
//! flag flipped by the reminder worker, and are never deleted (audit
//! retention). The reminded flag only moves `false -> true`, through a
//! compare-and-set so overlapping reminder sweeps cannot double-send.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::StoreError;
use crate::pricing::SeatSelection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub showing_id: Uuid,
    pub seats: Vec<SeatSelection>,
    /// Total charged, minor currency units, as computed by the pricing
    /// engine at creation time.
    pub total_amount: i64,
    pub payment_status: PaymentStatus,
    /// Provider payment reference, when one is known. Doubles as the
    /// idempotency key linking this booking to its payment event.
    pub payment_ref: Option<String>,
    pub reminded: bool,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn seat_ids(&self) -> Vec<String> {
        self.seats.iter().map(|s| s.seat_id.clone()).collect()
    }
}

#[derive(Default)]
pub struct BookingRepository {
    inner: RwLock<HashMap<Uuid, Booking>>,
}

impl BookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, booking: Booking) {
        let mut inner = self.inner.write().await;
        inner.insert(booking.id, booking);
    }

    pub async fn get(&self, booking_id: Uuid) -> Option<Booking> {
        let inner = self.inner.read().await;
        inner.get(&booking_id).cloned()
    }

    /// Caller's bookings, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Vec<Booking> {
        let inner = self.inner.read().await;
        let mut bookings: Vec<Booking> = inner
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bookings
    }

    pub async fn set_payment_status(
        &self,
        booking_id: Uuid,
        status: PaymentStatus,
        payment_ref: Option<String>,
    ) -> Result<Booking, StoreError> {
        let mut inner = self.inner.write().await;
        let booking = inner
            .get_mut(&booking_id)
            .ok_or(StoreError::BookingNotFound(booking_id))?;
        booking.payment_status = status;
        if payment_ref.is_some() {
            booking.payment_ref = payment_ref;
        }
        Ok(booking.clone())
    }

    /// Flip `reminded` from false to true. Returns `true` only for the
    /// caller that performed the transition; every later (or
    /// concurrent) caller sees `false` and must not send a reminder.
    pub async fn try_mark_reminded(&self, booking_id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        match inner.get_mut(&booking_id) {
            Some(booking) if !booking.reminded => {
                booking.reminded = true;
                true
            }
            _ => false,
        }
    }

    /// Completed bookings that have not been reminded yet. The reminder
    /// worker joins these against showing start times.
    pub async fn unreminded_completed(&self) -> Vec<Booking> {
        let inner = self.inner.read().await;
        inner
            .values()
            .filter(|b| !b.reminded && b.payment_status == PaymentStatus::Completed)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::SeatTier;
    use std::sync::Arc;

    fn booking(user_id: Uuid, status: PaymentStatus) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            user_id,
            showing_id: Uuid::new_v4(),
            seats: vec![SeatSelection {
                seat_id: "A1".to_string(),
                tier: SeatTier::Regular,
                price: 280,
            }],
            total_amount: 355,
            payment_status: status,
            payment_ref: None,
            reminded: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn reminded_flag_is_monotonic() {
        let repo = BookingRepository::new();
        let b = booking(Uuid::new_v4(), PaymentStatus::Completed);
        let id = b.id;
        repo.insert(b).await;

        assert!(repo.try_mark_reminded(id).await);
        assert!(!repo.try_mark_reminded(id).await);
        assert!(!repo.try_mark_reminded(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn concurrent_reminder_cas_has_single_winner() {
        let repo = Arc::new(BookingRepository::new());
        let b = booking(Uuid::new_v4(), PaymentStatus::Completed);
        let id = b.id;
        repo.insert(b).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move { repo.try_mark_reminded(id).await }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn unreminded_selection_excludes_pending_and_reminded() {
        let repo = BookingRepository::new();
        let pending = booking(Uuid::new_v4(), PaymentStatus::Pending);
        let done = booking(Uuid::new_v4(), PaymentStatus::Completed);
        let done_id = done.id;
        let already = booking(Uuid::new_v4(), PaymentStatus::Completed);
        let already_id = already.id;
        repo.insert(pending).await;
        repo.insert(done).await;
        repo.insert(already).await;
        assert!(repo.try_mark_reminded(already_id).await);

        let due = repo.unreminded_completed().await;
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, done_id);
    }

    #[tokio::test]
    async fn list_for_user_is_newest_first() {
        let repo = BookingRepository::new();
        let user = Uuid::new_v4();
        let mut older = booking(user, PaymentStatus::Completed);
        older.created_at = Utc::now() - chrono::Duration::minutes(10);
        let older_id = older.id;
        let newer = booking(user, PaymentStatus::Pending);
        let newer_id = newer.id;
        repo.insert(older).await;
        repo.insert(newer).await;
        repo.insert(booking(Uuid::new_v4(), PaymentStatus::Pending)).await;

        let mine = repo.list_for_user(user).await;
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, newer_id);
        assert_eq!(mine[1].id, older_id);
    }

    #[tokio::test]
    async fn payment_status_update_keeps_existing_ref_when_none_given() {
        let repo = BookingRepository::new();
        let b = booking(Uuid::new_v4(), PaymentStatus::Pending);
        let id = b.id;
        repo.insert(b).await;

        let updated = repo
            .set_payment_status(id, PaymentStatus::Completed, Some("tx_1".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.payment_status, PaymentStatus::Completed);
        assert_eq!(updated.payment_ref.as_deref(), Some("tx_1"));

        let again = repo
            .set_payment_status(id, PaymentStatus::Failed, None)
            .await
            .unwrap();
        assert_eq!(again.payment_ref.as_deref(), Some("tx_1"));
    }
}
