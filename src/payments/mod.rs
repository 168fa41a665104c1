//! Payment provider boundary.
//!
//! The service treats the provider as an opaque source of signed
//! `(transaction id, amount, booking ref, metadata)` tuples. Direct
//! intent confirmation and webhook-driven checkout sessions are the
//! same contract; both arrive here as a [`types::PaymentEvent`].

pub mod signature;
pub mod types;
