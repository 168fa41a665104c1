//! Idempotency record store.
//!
//! One record per provider transaction id, mapping it to the booking it
//! was applied to. `claim` is the per-key critical section that makes
//! webhook reconciliation exactly-once: under concurrent duplicate
//! deliveries exactly one caller observes `Claimed`, everyone else gets
//! the winner's booking id back.

use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This caller owns the transaction id; it must perform the single
    /// state transition (and notification) for the event.
    Claimed,
    /// The transaction id was already applied to the given booking.
    AlreadyApplied(Uuid),
}

#[derive(Default)]
pub struct IdempotencyRepository {
    inner: Mutex<HashMap<String, Uuid>>,
}

impl IdempotencyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fast-path lookup used before any reconciliation work.
    pub async fn get(&self, transaction_id: &str) -> Option<Uuid> {
        let inner = self.inner.lock().await;
        inner.get(transaction_id).copied()
    }

    /// Atomically create the record for `transaction_id` unless one
    /// exists. The lock is held only for the map insert, so the
    /// critical section is bounded by local memory latency.
    pub async fn claim(&self, transaction_id: &str, booking_id: Uuid) -> ClaimOutcome {
        let mut inner = self.inner.lock().await;
        match inner.get(transaction_id) {
            Some(existing) => ClaimOutcome::AlreadyApplied(*existing),
            None => {
                inner.insert(transaction_id.to_string(), booking_id);
                ClaimOutcome::Claimed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn first_claim_wins_replay_sees_original_booking() {
        let repo = IdempotencyRepository::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        assert_eq!(repo.get("tx_1").await, None);
        assert_eq!(repo.claim("tx_1", first).await, ClaimOutcome::Claimed);
        assert_eq!(
            repo.claim("tx_1", second).await,
            ClaimOutcome::AlreadyApplied(first)
        );
        assert_eq!(repo.get("tx_1").await, Some(first));

        // Different transaction id is independent.
        assert_eq!(repo.claim("tx_2", second).await, ClaimOutcome::Claimed);
    }

    #[tokio::test]
    async fn concurrent_claims_have_exactly_one_winner() {
        let repo = Arc::new(IdempotencyRepository::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.claim("tx_race", Uuid::new_v4()).await
            }));
        }

        let mut winners = 0;
        let mut applied_to = None;
        for handle in handles {
            match handle.await.unwrap() {
                ClaimOutcome::Claimed => winners += 1,
                ClaimOutcome::AlreadyApplied(id) => {
                    // Every loser must see the same winning booking.
                    assert!(applied_to.is_none() || applied_to == Some(id));
                    applied_to = Some(id);
                }
            }
        }
        assert_eq!(winners, 1);
    }
}
