//! Payment reconciliation: idempotent replay, amount verification and
//! the checkout-session creation path.

mod common;

use chrono::Duration as ChronoDuration;
use chrono::Utc;
use common::{economy, user, TestHarness};
use uuid::Uuid;

use cinebook_backend::error::AppError;
use cinebook_backend::payments::types::{CheckoutMetadata, PaymentEvent, PaymentEventType};
use cinebook_backend::services::ReconcileOutcome;
use cinebook_backend::store::booking_repository::PaymentStatus;

fn success_event(transaction_id: &str, amount: i64, booking_ref: Option<Uuid>) -> PaymentEvent {
    PaymentEvent {
        transaction_id: transaction_id.to_string(),
        event_type: PaymentEventType::ChargeSucceeded,
        amount,
        booking_ref,
        metadata: None,
        received_at: Utc::now(),
    }
}

#[tokio::test]
async fn webhook_completes_pending_booking_exactly_once() {
    let harness = TestHarness::new();
    let showing = harness.add_showing(ChronoDuration::hours(4), 20).await;
    let booking = harness
        .manager
        .create_booking(
            user(),
            showing.id,
            vec![economy("A1"), economy("A2"), economy("A3")],
            None,
        )
        .await
        .unwrap();
    assert_eq!(booking.payment_status, PaymentStatus::Pending);

    let outcome = harness
        .gateway
        .reconcile(success_event("tx_1", 783, Some(booking.id)))
        .await
        .unwrap();
    let applied = match outcome {
        ReconcileOutcome::Applied(b) => b,
        other => panic!("expected Applied, got {other:?}"),
    };
    assert_eq!(applied.id, booking.id);
    assert_eq!(applied.payment_status, PaymentStatus::Completed);
    assert_eq!(applied.payment_ref.as_deref(), Some("tx_1"));

    // Second delivery of the identical payload: same booking, same
    // state, no extra side effects.
    let replay = harness
        .gateway
        .reconcile(success_event("tx_1", 783, Some(booking.id)))
        .await
        .unwrap();
    match replay {
        ReconcileOutcome::Replayed(b) => {
            assert_eq!(b.id, booking.id);
            assert_eq!(b.payment_status, PaymentStatus::Completed);
        }
        other => panic!("expected Replayed, got {other:?}"),
    }

    // Exactly one confirmation went out across both deliveries.
    assert_eq!(harness.finish().await, 1);
}

#[tokio::test]
async fn amount_mismatch_leaves_booking_pending() {
    let harness = TestHarness::new();
    let showing = harness.add_showing(ChronoDuration::hours(4), 20).await;
    let booking = harness
        .manager
        .create_booking(
            user(),
            showing.id,
            vec![economy("A1"), economy("A2"), economy("A3")],
            None,
        )
        .await
        .unwrap();

    let err = harness
        .gateway
        .reconcile(success_event("tx_bad", 500, Some(booking.id)))
        .await
        .unwrap_err();
    match err {
        AppError::AmountMismatch { expected, received } => {
            assert_eq!(expected, 783);
            assert_eq!(received, 500);
        }
        other => panic!("expected AmountMismatch, got {other}"),
    }

    let stored = harness.bookings.get(booking.id).await.unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Pending);

    // A later delivery with the right amount still reconciles: the
    // mismatch did not burn the transaction id.
    let outcome = harness
        .gateway
        .reconcile(success_event("tx_bad", 783, Some(booking.id)))
        .await
        .unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Applied(_)));
}

#[tokio::test]
async fn concurrent_duplicate_deliveries_complete_once() {
    let harness = TestHarness::new();
    let showing = harness.add_showing(ChronoDuration::hours(4), 20).await;
    let booking = harness
        .manager
        .create_booking(user(), showing.id, vec![economy("A1")], None)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let gateway = harness.gateway.clone();
        let booking_id = booking.id;
        handles.push(tokio::spawn(async move {
            gateway
                .reconcile(success_event("tx_race", 261, Some(booking_id)))
                .await
        }));
    }

    let mut applied = 0;
    let mut replayed = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            ReconcileOutcome::Applied(b) => {
                assert_eq!(b.id, booking.id);
                applied += 1;
            }
            ReconcileOutcome::Replayed(b) => {
                assert_eq!(b.id, booking.id);
                replayed += 1;
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(applied, 1);
    assert_eq!(replayed, 7);

    // One state transition, one notification.
    assert_eq!(harness.finish().await, 1);
}

#[tokio::test]
async fn checkout_session_event_creates_and_completes_booking() {
    let harness = TestHarness::new();
    let showing = harness.add_showing(ChronoDuration::hours(4), 20).await;
    let customer = user();

    // One economy seat: round(200 * 1.18) + 25 = 261.
    let event = PaymentEvent {
        transaction_id: "tx_session".to_string(),
        event_type: PaymentEventType::ChargeSucceeded,
        amount: 261,
        booking_ref: None,
        metadata: Some(CheckoutMetadata {
            user_id: customer,
            showing_id: showing.id,
            seats: vec![economy("A1")],
        }),
        received_at: Utc::now(),
    };

    let outcome = harness.gateway.reconcile(event.clone()).await.unwrap();
    let booking = match outcome {
        ReconcileOutcome::Applied(b) => b,
        other => panic!("expected Applied, got {other:?}"),
    };
    assert_eq!(booking.user_id, customer);
    assert_eq!(booking.payment_status, PaymentStatus::Completed);
    assert_eq!(booking.total_amount, 261);

    let availability = harness.ledger.availability(showing.id).await.unwrap();
    assert_eq!(availability.sold, 1);

    // Redelivery replays instead of booking the seat again.
    let replay = harness.gateway.reconcile(event).await.unwrap();
    match replay {
        ReconcileOutcome::Replayed(b) => assert_eq!(b.id, booking.id),
        other => panic!("expected Replayed, got {other:?}"),
    }
    assert_eq!(harness.finish().await, 1);
}

#[tokio::test]
async fn charge_failure_is_recorded_idempotently() {
    let harness = TestHarness::new();
    let showing = harness.add_showing(ChronoDuration::hours(4), 20).await;
    let booking = harness
        .manager
        .create_booking(user(), showing.id, vec![economy("A1")], None)
        .await
        .unwrap();

    let event = PaymentEvent {
        transaction_id: "tx_fail".to_string(),
        event_type: PaymentEventType::ChargeFailed,
        amount: 261,
        booking_ref: Some(booking.id),
        metadata: None,
        received_at: Utc::now(),
    };

    let outcome = harness.gateway.reconcile(event.clone()).await.unwrap();
    match outcome {
        ReconcileOutcome::FailureRecorded(b) => {
            assert_eq!(b.payment_status, PaymentStatus::Failed)
        }
        other => panic!("expected FailureRecorded, got {other:?}"),
    }

    let replay = harness.gateway.reconcile(event).await.unwrap();
    assert!(matches!(replay, ReconcileOutcome::Replayed(_)));

    // Failures never notify.
    assert_eq!(harness.finish().await, 0);
}

#[tokio::test]
async fn unresolvable_events_are_rejected_or_ignored() {
    let harness = TestHarness::new();

    // Success event for an unknown booking with no metadata.
    let missing = Uuid::new_v4();
    let err = harness
        .gateway
        .reconcile(success_event("tx_x", 100, Some(missing)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BookingNotFound(id) if id == missing));

    // Neither a booking ref nor metadata.
    let err = harness
        .gateway
        .reconcile(success_event("tx_y", 100, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    // Unsupported event types are acknowledged and dropped.
    let event = PaymentEvent {
        transaction_id: "tx_z".to_string(),
        event_type: PaymentEventType::Unsupported("refund.created".to_string()),
        amount: 100,
        booking_ref: None,
        metadata: None,
        received_at: Utc::now(),
    };
    assert!(matches!(
        harness.gateway.reconcile(event).await.unwrap(),
        ReconcileOutcome::Ignored(_)
    ));
}
