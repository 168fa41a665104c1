//! Showing catalog repository.
//!
//! Read-mostly lookup of showing metadata (title, theater, start time,
//! price table) plus the best-effort aggregate booking counter. Seat
//! states live in the inventory ledger, not here.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::StoreError;
use crate::pricing::PriceTable;

/// A scheduled screening: movie, theater, start time, capacity and the
/// per-tier price table callers are quoted against.
#[derive(Debug, Clone, Serialize)]
pub struct Showing {
    pub id: Uuid,
    pub movie_title: String,
    pub theater: String,
    pub starts_at: DateTime<Utc>,
    pub capacity: u32,
    pub price_table: PriceTable,
    /// Aggregate count of seats booked, maintained best-effort for
    /// reporting. Not a correctness input anywhere.
    pub booking_count: u64,
    pub created_at: DateTime<Utc>,
}

impl Showing {
    pub fn new(
        movie_title: String,
        theater: String,
        starts_at: DateTime<Utc>,
        capacity: u32,
        price_table: PriceTable,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            movie_title,
            theater,
            starts_at,
            capacity,
            price_table,
            booking_count: 0,
            created_at: Utc::now(),
        }
    }
}

#[derive(Default)]
pub struct ShowingRepository {
    inner: RwLock<HashMap<Uuid, Showing>>,
}

impl ShowingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, showing: Showing) {
        let mut inner = self.inner.write().await;
        inner.insert(showing.id, showing);
    }

    pub async fn get(&self, showing_id: Uuid) -> Option<Showing> {
        let inner = self.inner.read().await;
        inner.get(&showing_id).cloned()
    }

    pub async fn list(&self) -> Vec<Showing> {
        let inner = self.inner.read().await;
        let mut showings: Vec<Showing> = inner.values().cloned().collect();
        showings.sort_by_key(|s| s.starts_at);
        showings
    }

    /// Bump the aggregate booking counter. Callers treat a failure here
    /// as a reporting defect, not a booking failure.
    pub async fn increment_booking_count(
        &self,
        showing_id: Uuid,
        seats: u32,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let showing = inner
            .get_mut(&showing_id)
            .ok_or(StoreError::ShowingNotFound(showing_id))?;
        showing.booking_count += u64::from(seats);
        Ok(showing.booking_count)
    }
}
