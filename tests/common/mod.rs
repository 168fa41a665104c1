#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use cinebook_backend::api::{build_router, AppState};
use cinebook_backend::inventory::SeatLedger;
use cinebook_backend::pricing::{PriceTable, PricingConfig, SeatSelection, SeatTier};
use cinebook_backend::services::notification::{
    NotificationChannel, NotificationDispatcher, NotificationError, NotificationMessage,
};
use cinebook_backend::services::{BookingManager, ReconciliationGateway};
use cinebook_backend::store::booking_repository::BookingRepository;
use cinebook_backend::store::idempotency_repository::IdempotencyRepository;
use cinebook_backend::store::showing_repository::{Showing, ShowingRepository};
use cinebook_backend::store::seat_ids_for_capacity;

pub const WEBHOOK_SECRET: &str = "test-webhook-secret-0123456789";

/// Counts every successfully delivered notification.
pub struct CountingChannel {
    pub delivered: Arc<AtomicU32>,
}

#[async_trait]
impl NotificationChannel for CountingChannel {
    async fn deliver(&self, _message: &NotificationMessage) -> Result<(), NotificationError> {
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct TestHarness {
    pub showings: Arc<ShowingRepository>,
    pub bookings: Arc<BookingRepository>,
    pub idempotency: Arc<IdempotencyRepository>,
    pub ledger: Arc<SeatLedger>,
    pub manager: Arc<BookingManager>,
    pub gateway: Arc<ReconciliationGateway>,
    pub notifier: NotificationDispatcher,
    pub delivered: Arc<AtomicU32>,
    notification_handle: JoinHandle<()>,
}

impl TestHarness {
    pub fn new() -> Self {
        let showings = Arc::new(ShowingRepository::new());
        let bookings = Arc::new(BookingRepository::new());
        let idempotency = Arc::new(IdempotencyRepository::new());
        let ledger = Arc::new(SeatLedger::new(Duration::from_secs(1)));

        let delivered = Arc::new(AtomicU32::new(0));
        let (notifier, notification_handle) = NotificationDispatcher::start(
            Arc::new(CountingChannel {
                delivered: delivered.clone(),
            }),
            64,
            1,
        );

        let manager = Arc::new(BookingManager::new(
            showings.clone(),
            bookings.clone(),
            idempotency.clone(),
            ledger.clone(),
            PricingConfig::default(),
            notifier.clone(),
        ));
        let gateway = Arc::new(ReconciliationGateway::new(
            bookings.clone(),
            showings.clone(),
            idempotency.clone(),
            manager.clone(),
            notifier.clone(),
        ));

        Self {
            showings,
            bookings,
            idempotency,
            ledger,
            manager,
            gateway,
            notifier,
            delivered,
            notification_handle,
        }
    }

    /// Insert a showing starting `starts_in` from now and register its
    /// seat map with the ledger.
    pub async fn add_showing(&self, starts_in: ChronoDuration, capacity: u32) -> Showing {
        let showing = Showing::new(
            "Interstellar".to_string(),
            "Screen 1".to_string(),
            Utc::now() + starts_in,
            capacity,
            PriceTable::default(),
        );
        self.ledger
            .register_showing(showing.id, seat_ids_for_capacity(capacity))
            .await;
        self.showings.insert(showing.clone()).await;
        showing
    }

    pub fn router(&self) -> axum::Router {
        build_router(AppState {
            showings: self.showings.clone(),
            bookings: self.bookings.clone(),
            ledger: self.ledger.clone(),
            manager: self.manager.clone(),
            gateway: self.gateway.clone(),
            webhook_secret: WEBHOOK_SECRET.to_string(),
        })
    }

    /// Tear everything down, wait for the notification queue to drain,
    /// and return how many notifications were actually delivered.
    pub async fn finish(self) -> u32 {
        let TestHarness {
            manager,
            gateway,
            notifier,
            notification_handle,
            delivered,
            ..
        } = self;
        drop(gateway);
        drop(manager);
        drop(notifier);
        notification_handle.await.expect("notification worker panicked");
        delivered.load(Ordering::SeqCst)
    }
}

pub fn economy(seat_id: &str) -> SeatSelection {
    SeatSelection {
        seat_id: seat_id.to_string(),
        tier: SeatTier::Economy,
        price: 200,
    }
}

pub fn regular(seat_id: &str) -> SeatSelection {
    SeatSelection {
        seat_id: seat_id.to_string(),
        tier: SeatTier::Regular,
        price: 280,
    }
}

pub fn user() -> Uuid {
    Uuid::new_v4()
}
