//! CineBook backend: seat booking with no-double-sell inventory,
//! idempotent payment reconciliation and best-effort notifications.

pub mod api;
pub mod config;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod middleware;
pub mod payments;
pub mod pricing;
pub mod services;
pub mod store;
pub mod workers;
