//! Showtime reminder worker.
//!
//! Periodically finds completed, un-reminded bookings whose showing
//! starts within the lookahead window and dispatches one reminder per
//! booking. The `reminded` flag is flipped with a compare-and-set
//! *before* the reminder is enqueued, so overlapping ticks or a crash
//! mid-sweep can lose a reminder but never duplicate one.

use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info};

use crate::services::notification::{
    NotificationDispatcher, NotificationKind, NotificationRequest,
};
use crate::store::booking_repository::BookingRepository;
use crate::store::showing_repository::ShowingRepository;

pub struct ReminderWorker {
    bookings: Arc<BookingRepository>,
    showings: Arc<ShowingRepository>,
    notifier: NotificationDispatcher,
    interval: Duration,
    lookahead: ChronoDuration,
}

impl ReminderWorker {
    pub fn new(
        bookings: Arc<BookingRepository>,
        showings: Arc<ShowingRepository>,
        notifier: NotificationDispatcher,
        interval: Duration,
        lookahead: Duration,
    ) -> Self {
        Self {
            bookings,
            showings,
            notifier,
            interval,
            lookahead: ChronoDuration::from_std(lookahead)
                .unwrap_or_else(|_| ChronoDuration::hours(1)),
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.interval);
        info!(
            interval_secs = self.interval.as_secs(),
            lookahead_secs = self.lookahead.num_seconds(),
            "Reminder worker started"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let sent = self.sweep_once().await;
                    if sent > 0 {
                        info!(sent, "Reminder sweep dispatched reminders");
                    }
                }
                _ = shutdown.changed() => {
                    info!("Reminder worker shutting down");
                    break;
                }
            }
        }
    }

    /// One sweep over due bookings. Returns the number of reminders
    /// dispatched; safe to run concurrently with itself.
    pub async fn sweep_once(&self) -> usize {
        let now = chrono::Utc::now();
        let horizon = now + self.lookahead;
        let mut sent = 0;

        for booking in self.bookings.unreminded_completed().await {
            let Some(showing) = self.showings.get(booking.showing_id).await else {
                debug!(booking_id = %booking.id, "Skipping reminder, showing missing");
                continue;
            };
            if showing.starts_at <= now || showing.starts_at > horizon {
                continue;
            }
            // CAS first: only the caller that wins the flag transition
            // may enqueue, so a second overlapping sweep sends nothing.
            if !self.bookings.try_mark_reminded(booking.id).await {
                continue;
            }
            self.notifier.dispatch(NotificationRequest {
                kind: NotificationKind::Reminder,
                booking,
                movie_title: showing.movie_title,
                starts_at: showing.starts_at,
            });
            sent += 1;
        }
        sent
    }
}
