//! Stale seat-hold sweeper.
//!
//! Companion recovery job: a crash between a successful hold and the
//! booking persist leaves seats `Held` with no owning booking. This
//! worker returns any hold older than the TTL to `Free`.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::info;

use crate::inventory::SeatLedger;

pub struct HoldSweeper {
    ledger: Arc<SeatLedger>,
    interval: Duration,
    ttl: Duration,
}

impl HoldSweeper {
    pub fn new(ledger: Arc<SeatLedger>, interval: Duration, ttl: Duration) -> Self {
        Self {
            ledger,
            interval,
            ttl,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.interval);
        info!(
            interval_secs = self.interval.as_secs(),
            ttl_secs = self.ttl.as_secs(),
            "Hold sweeper started"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let released = self.ledger.release_stale_holds(self.ttl).await;
                    if !released.is_empty() {
                        info!(count = released.len(), "Released orphaned seat holds");
                    }
                }
                _ = shutdown.changed() => {
                    info!("Hold sweeper shutting down");
                    break;
                }
            }
        }
    }
}
