//! Business logic services.

pub mod booking_manager;
pub mod notification;
pub mod reconciliation;

pub use booking_manager::BookingManager;
pub use notification::{NotificationDispatcher, NotificationKind, NotificationRequest};
pub use reconciliation::{ReconcileOutcome, ReconciliationGateway};
