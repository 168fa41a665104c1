//! Background workers, each an interval loop that stops when the
//! shutdown watch channel fires.

pub mod hold_sweeper;
pub mod reminder;
