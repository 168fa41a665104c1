//! In-memory persistence layer.
//!
//! Repositories keep the same shape the service would have over a
//! transactional store: entity structs, narrow methods, `Result`
//! returns. Durability and replication are explicitly out of scope;
//! the correctness contract is the invariants each repository enforces
//! (single idempotency record per transaction id, monotonic reminded
//! flag, bookings never deleted).

pub mod booking_repository;
pub mod idempotency_repository;
pub mod showing_repository;

use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::inventory::SeatLedger;
use crate::pricing::PriceTable;
use showing_repository::{Showing, ShowingRepository};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("showing {0} not found")]
    ShowingNotFound(Uuid),
    #[error("booking {0} not found")]
    BookingNotFound(Uuid),
}

/// Seat identifiers for a showing: rows A.. with ten seats per row,
/// `A1..A10, B1..B10, ...` up to `capacity`.
pub fn seat_ids_for_capacity(capacity: u32) -> Vec<String> {
    let mut ids = Vec::with_capacity(capacity as usize);
    for index in 0..capacity {
        let row = (b'A' + (index / 10) as u8) as char;
        let number = index % 10 + 1;
        ids.push(format!("{row}{number}"));
    }
    ids
}

/// Seed a small demo catalog and register its seat maps with the
/// ledger. Runs at startup behind the `SEED_DEMO_DATA` flag.
pub async fn seed_demo_catalog(
    showings: &Arc<ShowingRepository>,
    ledger: &Arc<SeatLedger>,
) -> Vec<Uuid> {
    let demo = [
        ("Interstellar", "Screen 1", 48, PriceTable::default()),
        (
            "The Grand Budapest Hotel",
            "Screen 2",
            30,
            PriceTable {
                premium: 450,
                regular: 300,
                economy: 220,
            },
        ),
    ];

    let mut ids = Vec::new();
    for (title, theater, hours_ahead, price_table) in demo {
        let showing = Showing::new(
            title.to_string(),
            theater.to_string(),
            chrono::Utc::now() + chrono::Duration::hours(hours_ahead),
            100,
            price_table,
        );
        let showing_id = showing.id;
        ledger
            .register_showing(showing_id, seat_ids_for_capacity(showing.capacity))
            .await;
        showings.insert(showing).await;
        ids.push(showing_id);
    }
    ids
}
