//! Seat inventory ledger.
//!
//! Single owner of every showing's seat map. Each seat moves through
//! `Free -> Held -> Sold`, with `Held -> Free` as the release path; a
//! `Sold` seat returns to `Free` only through an explicit cancellation
//! (the transition exists in the state machine, the operation is not
//! exposed yet).
//!
//! `hold` is the one concurrency-critical operation in the service:
//! under concurrent requests for overlapping seat sets exactly one
//! caller wins any given seat. Conflicts are serialized by a mutex per
//! showing, never coarser, so unrelated showings stay independent. Lock
//! acquisition is bounded by a timeout and fails retryable instead of
//! hanging the connection.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// State of a single seat within one showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatState {
    Free,
    Held { since: DateTime<Utc> },
    Sold,
}

impl SeatState {
    pub fn label(&self) -> &'static str {
        match self {
            SeatState::Free => "free",
            SeatState::Held { .. } => "held",
            SeatState::Sold => "sold",
        }
    }
}

/// Proof of a successful `hold`. Redeemed exactly once, via `commit`
/// (seats become `Sold`) or `release` (seats return to `Free`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationToken {
    pub id: Uuid,
    pub showing_id: Uuid,
    pub seats: Vec<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("showing {0} is not registered with the inventory ledger")]
    ShowingNotRegistered(Uuid),
    #[error("seats unavailable: {}", seats.join(", "))]
    SeatUnavailable { seats: Vec<String> },
    #[error("unknown seat {0} for this showing")]
    UnknownSeat(String),
    #[error("seat {0} requested more than once")]
    DuplicateSeat(String),
    #[error("no seats requested")]
    EmptySeatSet,
    #[error("timed out waiting for the showing's reservation lock")]
    LockTimeout,
    #[error("reservation {0} is not active")]
    UnknownReservation(Uuid),
}

/// Availability snapshot for one showing. Read-only and stale-tolerant;
/// taken under the same lock but held only long enough to copy counts.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SeatAvailability {
    pub free: u32,
    pub held: u32,
    pub sold: u32,
    pub seats: HashMap<String, &'static str>,
}

struct ActiveHold {
    seats: Vec<String>,
    since: DateTime<Utc>,
}

struct SeatMap {
    seats: HashMap<String, SeatState>,
    holds: HashMap<Uuid, ActiveHold>,
}

impl SeatMap {
    fn new(seat_ids: Vec<String>) -> Self {
        Self {
            seats: seat_ids.into_iter().map(|id| (id, SeatState::Free)).collect(),
            holds: HashMap::new(),
        }
    }
}

/// Per-showing seat maps behind per-showing mutexes.
pub struct SeatLedger {
    registry: RwLock<HashMap<Uuid, Arc<Mutex<SeatMap>>>>,
    lock_timeout: Duration,
}

impl SeatLedger {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            registry: RwLock::new(HashMap::new()),
            lock_timeout,
        }
    }

    /// Install a seat map for a showing. Idempotent: re-registering an
    /// existing showing leaves its live seat states untouched.
    pub async fn register_showing(&self, showing_id: Uuid, seat_ids: Vec<String>) {
        let mut registry = self.registry.write().await;
        registry
            .entry(showing_id)
            .or_insert_with(|| Arc::new(Mutex::new(SeatMap::new(seat_ids))));
    }

    async fn seat_map(&self, showing_id: Uuid) -> Result<Arc<Mutex<SeatMap>>, InventoryError> {
        let registry = self.registry.read().await;
        registry
            .get(&showing_id)
            .cloned()
            .ok_or(InventoryError::ShowingNotRegistered(showing_id))
    }

    async fn lock_seat_map(
        &self,
        map: Arc<Mutex<SeatMap>>,
    ) -> Result<OwnedMutexGuard<SeatMap>, InventoryError> {
        tokio::time::timeout(self.lock_timeout, map.lock_owned())
            .await
            .map_err(|_| InventoryError::LockTimeout)
    }

    /// Atomically place a hold on every requested seat, or fail leaving
    /// the map untouched. Partial holds never happen: the free-check for
    /// the whole set and the transition run under one lock acquisition.
    pub async fn hold(
        &self,
        showing_id: Uuid,
        seat_ids: &[String],
    ) -> Result<ReservationToken, InventoryError> {
        if seat_ids.is_empty() {
            return Err(InventoryError::EmptySeatSet);
        }
        for (i, seat) in seat_ids.iter().enumerate() {
            if seat_ids[..i].contains(seat) {
                return Err(InventoryError::DuplicateSeat(seat.clone()));
            }
        }

        let map = self.seat_map(showing_id).await?;
        let mut guard = self.lock_seat_map(map).await?;

        let mut taken = Vec::new();
        for seat in seat_ids {
            match guard.seats.get(seat) {
                None => return Err(InventoryError::UnknownSeat(seat.clone())),
                Some(SeatState::Free) => {}
                Some(_) => taken.push(seat.clone()),
            }
        }
        if !taken.is_empty() {
            return Err(InventoryError::SeatUnavailable { seats: taken });
        }

        let since = Utc::now();
        for seat in seat_ids {
            guard.seats.insert(seat.clone(), SeatState::Held { since });
        }
        let token = ReservationToken {
            id: Uuid::new_v4(),
            showing_id,
            seats: seat_ids.to_vec(),
        };
        guard.holds.insert(
            token.id,
            ActiveHold {
                seats: token.seats.clone(),
                since,
            },
        );
        Ok(token)
    }

    /// Finalize a hold: every held seat becomes `Sold`.
    pub async fn commit(&self, token: &ReservationToken) -> Result<(), InventoryError> {
        self.settle(token, SeatState::Sold).await
    }

    /// Abandon a hold: every held seat returns to `Free`.
    pub async fn release(&self, token: &ReservationToken) -> Result<(), InventoryError> {
        self.settle(token, SeatState::Free).await
    }

    // Settling an existing hold must not fail on contention the way a
    // new hold may: the seats are already owned, so take the plain lock.
    async fn settle(
        &self,
        token: &ReservationToken,
        target: SeatState,
    ) -> Result<(), InventoryError> {
        let map = self.seat_map(token.showing_id).await?;
        let mut guard = map.lock().await;

        let hold = guard
            .holds
            .remove(&token.id)
            .ok_or(InventoryError::UnknownReservation(token.id))?;
        for seat in &hold.seats {
            guard.seats.insert(seat.clone(), target);
        }
        Ok(())
    }

    /// Free every hold older than `ttl`. Recovery path for a crash
    /// between `hold` succeeding and the booking record being persisted;
    /// run periodically by the hold sweeper worker.
    pub async fn release_stale_holds(&self, ttl: Duration) -> Vec<ReservationToken> {
        let maps: Vec<(Uuid, Arc<Mutex<SeatMap>>)> = {
            let registry = self.registry.read().await;
            registry.iter().map(|(id, m)| (*id, m.clone())).collect()
        };

        let cutoff = Utc::now()
            - ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::seconds(300));
        let mut released = Vec::new();

        for (showing_id, map) in maps {
            let mut guard: MutexGuard<'_, SeatMap> = map.lock().await;
            let stale: Vec<Uuid> = guard
                .holds
                .iter()
                .filter(|(_, hold)| hold.since < cutoff)
                .map(|(id, _)| *id)
                .collect();
            for hold_id in stale {
                if let Some(hold) = guard.holds.remove(&hold_id) {
                    for seat in &hold.seats {
                        guard.seats.insert(seat.clone(), SeatState::Free);
                    }
                    warn!(
                        showing_id = %showing_id,
                        reservation_id = %hold_id,
                        seats = ?hold.seats,
                        "Released stale seat hold"
                    );
                    released.push(ReservationToken {
                        id: hold_id,
                        showing_id,
                        seats: hold.seats,
                    });
                }
            }
        }

        if !released.is_empty() {
            info!(count = released.len(), "Stale hold sweep released reservations");
        }
        released
    }

    /// Current seat counts and per-seat states for one showing.
    pub async fn availability(&self, showing_id: Uuid) -> Result<SeatAvailability, InventoryError> {
        let map = self.seat_map(showing_id).await?;
        let guard = map.lock().await;

        let mut snapshot = SeatAvailability {
            free: 0,
            held: 0,
            sold: 0,
            seats: HashMap::with_capacity(guard.seats.len()),
        };
        for (seat, state) in &guard.seats {
            match state {
                SeatState::Free => snapshot.free += 1,
                SeatState::Held { .. } => snapshot.held += 1,
                SeatState::Sold => snapshot.sold += 1,
            }
            snapshot.seats.insert(seat.clone(), state.label());
        }
        Ok(snapshot)
    }
}
