use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use cinebook_backend::api::{build_router, AppState};
use cinebook_backend::config::AppConfig;
use cinebook_backend::inventory::SeatLedger;
use cinebook_backend::logging::init_tracing;
use cinebook_backend::services::notification::{LogChannel, NotificationDispatcher};
use cinebook_backend::services::{BookingManager, ReconciliationGateway};
use cinebook_backend::store::booking_repository::BookingRepository;
use cinebook_backend::store::idempotency_repository::IdempotencyRepository;
use cinebook_backend::store::showing_repository::ShowingRepository;
use cinebook_backend::store::seed_demo_catalog;
use cinebook_backend::workers::hold_sweeper::HoldSweeper;
use cinebook_backend::workers::reminder::ReminderWorker;

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

async fn shutdown_signal_with_notify(shutdown_tx: watch::Sender<bool>) {
    shutdown_signal().await;
    let _ = shutdown_tx.send(true);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        "Starting CineBook backend service"
    );

    // Stores and the seat ledger.
    let showings = Arc::new(ShowingRepository::new());
    let bookings = Arc::new(BookingRepository::new());
    let idempotency = Arc::new(IdempotencyRepository::new());
    let ledger = Arc::new(SeatLedger::new(config.scheduler.seat_lock_timeout));

    // Notification worker: bounded queue, bounded retries.
    let (notifier, notification_handle) = NotificationDispatcher::start(
        Arc::new(LogChannel),
        config.notifications.queue_depth,
        config.notifications.max_retries,
    );

    let manager = Arc::new(BookingManager::new(
        showings.clone(),
        bookings.clone(),
        idempotency.clone(),
        ledger.clone(),
        config.pricing,
        notifier.clone(),
    ));
    let gateway = Arc::new(ReconciliationGateway::new(
        bookings.clone(),
        showings.clone(),
        idempotency.clone(),
        manager.clone(),
        notifier.clone(),
    ));

    let seed_demo = std::env::var("SEED_DEMO_DATA")
        .unwrap_or_else(|_| "true".to_string())
        .to_lowercase()
        == "true";
    if seed_demo {
        let seeded = seed_demo_catalog(&showings, &ledger).await;
        info!(showings = seeded.len(), "Seeded demo catalog");
    }

    // Background workers share one shutdown watch channel.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reminder_worker = ReminderWorker::new(
        bookings.clone(),
        showings.clone(),
        notifier.clone(),
        config.scheduler.reminder_interval,
        config.scheduler.reminder_lookahead,
    );
    let reminder_handle = tokio::spawn(reminder_worker.run(shutdown_rx.clone()));

    let hold_sweeper = HoldSweeper::new(
        ledger.clone(),
        config.scheduler.hold_sweep_interval,
        config.scheduler.hold_ttl,
    );
    let sweeper_handle = tokio::spawn(hold_sweeper.run(shutdown_rx));

    let state = AppState {
        showings,
        bookings,
        ledger,
        manager,
        gateway,
        webhook_secret: config.webhook.secret.clone(),
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id()),
    );

    let addr = SocketAddr::from_str(&format!("{}:{}", config.server.host, config.server.port))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_with_notify(shutdown_tx))
        .await?;

    // Let the workers finish their current tick, then drain the
    // notification queue by dropping the last dispatcher handle.
    let _ = reminder_handle.await;
    let _ = sweeper_handle.await;
    drop(notifier);
    let _ = notification_handle.await;

    info!("Shutdown complete");
    Ok(())
}
