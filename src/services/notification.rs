//! Notification dispatcher.
//!
//! Fire-and-forget delivery of confirmation and reminder messages.
//! Callers enqueue onto a bounded channel and return immediately; a
//! worker task drains the queue and delivers through a
//! [`NotificationChannel`] with a small bounded retry budget. Delivery
//! failures are logged and never surfaced to the booking flow, and a
//! full queue drops the message rather than blocking a request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::store::booking_repository::Booking;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Confirmation,
    Reminder,
}

/// Work item handed to the dispatcher by the booking manager, the
/// reconciliation gateway or the reminder worker.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub kind: NotificationKind,
    pub booking: Booking,
    pub movie_title: String,
    pub starts_at: DateTime<Utc>,
}

/// Rendered message, ready for a delivery channel.
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    pub kind: NotificationKind,
    pub user_id: Uuid,
    pub booking_id: Uuid,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Delivery backend (email, SMS, push). The production default logs the
/// message; wire integrations plug in behind this trait.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), NotificationError>;
}

/// Logs notifications with structured fields instead of sending them.
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), NotificationError> {
        info!(
            user_id = %message.user_id,
            booking_id = %message.booking_id,
            subject = %message.subject,
            "NOTIFICATION: {}",
            message.body
        );
        Ok(())
    }
}

fn render(request: &NotificationRequest) -> NotificationMessage {
    let seats = request
        .booking
        .seat_ids()
        .join(", ");
    let showtime = request.starts_at.format("%Y-%m-%d %H:%M UTC");
    let (subject, body) = match request.kind {
        NotificationKind::Confirmation => (
            "Booking Confirmation".to_string(),
            format!(
                "Your booking for {} on {} is confirmed. Seats: {}. Amount paid: {}.",
                request.movie_title, showtime, seats, request.booking.total_amount
            ),
        ),
        NotificationKind::Reminder => (
            "Showtime Reminder".to_string(),
            format!(
                "Reminder: your movie {} starts at {}. Seats: {}. Enjoy!",
                request.movie_title, showtime, seats
            ),
        ),
    };
    NotificationMessage {
        kind: request.kind,
        user_id: request.booking.user_id,
        booking_id: request.booking.id,
        subject,
        body,
    }
}

/// Handle for enqueueing notifications. Cloneable; dropping every clone
/// closes the queue and lets the worker drain and exit.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<NotificationRequest>,
}

impl NotificationDispatcher {
    /// Spawn the delivery worker and return the dispatch handle plus
    /// the worker's join handle.
    pub fn start(
        channel: Arc<dyn NotificationChannel>,
        queue_depth: usize,
        max_retries: u32,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<NotificationRequest>(queue_depth);
        let handle = tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let message = render(&request);
                deliver_with_retries(channel.as_ref(), &message, max_retries).await;
            }
        });
        (Self { tx }, handle)
    }

    /// Enqueue without blocking. A full queue drops the message with a
    /// warning; notification delivery is best-effort by contract.
    pub fn dispatch(&self, request: NotificationRequest) {
        if let Err(err) = self.tx.try_send(request) {
            warn!(error = %err, "Notification queue full, dropping message");
        }
    }
}

async fn deliver_with_retries(
    channel: &dyn NotificationChannel,
    message: &NotificationMessage,
    max_retries: u32,
) {
    for attempt in 0..=max_retries {
        match channel.deliver(message).await {
            Ok(()) => return,
            Err(err) => {
                warn!(
                    booking_id = %message.booking_id,
                    attempt = attempt + 1,
                    error = %err,
                    "Notification delivery failed"
                );
                if attempt < max_retries {
                    tokio::time::sleep(Duration::from_millis(100 << attempt)).await;
                }
            }
        }
    }
    warn!(
        booking_id = %message.booking_id,
        "Giving up on notification after retry budget exhausted"
    );
}
