//! Ticket pricing engine.
//!
//! Pure calculation: a seat selection plus the showing's price table in,
//! a total in integer minor currency units out. Tax and the per-seat
//! booking fee come from configuration; rounding is half-up and applied
//! exactly once to the final sum so per-seat rounding drift cannot
//! accumulate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seat tier as published in a showing's price table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatTier {
    Premium,
    Regular,
    Economy,
}

impl std::fmt::Display for SeatTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeatTier::Premium => write!(f, "premium"),
            SeatTier::Regular => write!(f, "regular"),
            SeatTier::Economy => write!(f, "economy"),
        }
    }
}

/// One seat in a booking request: the seat identifier, its tier and the
/// price the client saw. The listed price is cross-checked against the
/// showing's price table so a stale client can never under-pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSelection {
    pub seat_id: String,
    pub tier: SeatTier,
    pub price: i64,
}

/// Per-tier prices for a showing, minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTable {
    pub premium: i64,
    pub regular: i64,
    pub economy: i64,
}

impl PriceTable {
    pub fn price_for(&self, tier: SeatTier) -> i64 {
        match tier {
            SeatTier::Premium => self.premium,
            SeatTier::Regular => self.regular,
            SeatTier::Economy => self.economy,
        }
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        // Defaults mirror the seeded catalog data.
        Self {
            premium: 400,
            regular: 280,
            economy: 200,
        }
    }
}

/// Pricing constants, loaded from the environment at startup.
#[derive(Debug, Clone, Copy)]
pub struct PricingConfig {
    /// Fractional tax rate applied to the seat subtotal (0.18 = 18% GST).
    pub tax_rate: f64,
    /// Flat booking fee per seat, minor currency units.
    pub fee_per_seat: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: 0.18,
            fee_per_seat: 25,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("seat selection must not be empty")]
    EmptySeatSelection,
    #[error("seat {seat_id}: listed price {listed} does not match {tier} tier price {expected}")]
    PriceMismatch {
        seat_id: String,
        tier: SeatTier,
        listed: i64,
        expected: i64,
    },
    #[error("seat {seat_id}: price must be positive, got {price}")]
    NonPositivePrice { seat_id: String, price: i64 },
}

/// Compute the total charge for a seat selection.
///
/// `round(sum(prices) * (1 + tax_rate) + fee_per_seat * seat_count)`,
/// half-up on the final sum. Deterministic for identical inputs.
pub fn quote(
    selections: &[SeatSelection],
    price_table: &PriceTable,
    config: &PricingConfig,
) -> Result<i64, PricingError> {
    if selections.is_empty() {
        return Err(PricingError::EmptySeatSelection);
    }

    let mut subtotal: i64 = 0;
    for selection in selections {
        if selection.price <= 0 {
            return Err(PricingError::NonPositivePrice {
                seat_id: selection.seat_id.clone(),
                price: selection.price,
            });
        }
        let expected = price_table.price_for(selection.tier);
        if selection.price != expected {
            return Err(PricingError::PriceMismatch {
                seat_id: selection.seat_id.clone(),
                tier: selection.tier,
                listed: selection.price,
                expected,
            });
        }
        subtotal += selection.price;
    }

    let fees = config.fee_per_seat * selections.len() as i64;
    let total = subtotal as f64 * (1.0 + config.tax_rate) + fees as f64;

    // f64::round is round-half-away-from-zero, which is half-up for the
    // non-negative totals produced here.
    Ok(total.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PriceTable {
        PriceTable {
            premium: 400,
            regular: 280,
            economy: 200,
        }
    }

    fn seat(id: &str, tier: SeatTier, price: i64) -> SeatSelection {
        SeatSelection {
            seat_id: id.to_string(),
            tier,
            price,
        }
    }

    #[test]
    fn three_economy_seats_price_to_783() {
        // 600 * 1.18 + 3 * 25 = 708 + 75 = 783
        let selections = vec![
            seat("A1", SeatTier::Economy, 200),
            seat("A2", SeatTier::Economy, 200),
            seat("A3", SeatTier::Economy, 200),
        ];
        let total = quote(&selections, &table(), &PricingConfig::default()).unwrap();
        assert_eq!(total, 783);
    }

    #[test]
    fn empty_selection_is_rejected() {
        let err = quote(&[], &table(), &PricingConfig::default()).unwrap_err();
        assert_eq!(err, PricingError::EmptySeatSelection);
    }

    #[test]
    fn listed_price_must_match_price_table() {
        let selections = vec![seat("B1", SeatTier::Premium, 280)];
        let err = quote(&selections, &table(), &PricingConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            PricingError::PriceMismatch {
                listed: 280,
                expected: 400,
                ..
            }
        ));
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let selections = vec![seat("B1", SeatTier::Regular, 0)];
        let err = quote(&selections, &table(), &PricingConfig::default()).unwrap_err();
        assert!(matches!(err, PricingError::NonPositivePrice { .. }));
    }

    #[test]
    fn rounding_is_half_up_and_applied_once() {
        // One regular seat at 280: 280 * 1.18 + 25 = 330.4 + 25 = 355.4 -> 355
        let one = vec![seat("C1", SeatTier::Regular, 280)];
        assert_eq!(quote(&one, &table(), &PricingConfig::default()).unwrap(), 355);

        // Half-up boundary: tax 0.125 on 300 = 337.5 + 25 = 362.5 -> 363
        let cfg = PricingConfig {
            tax_rate: 0.125,
            fee_per_seat: 25,
        };
        let half = vec![seat("C2", SeatTier::Economy, 200), seat("C3", SeatTier::Regular, 280)];
        let table = PriceTable {
            premium: 400,
            regular: 280,
            economy: 200,
        };
        // 480 * 1.125 + 50 = 540 + 50 = 590 (no fraction)
        assert_eq!(quote(&half, &table, &cfg).unwrap(), 590);

        // 300 * 1.125 + 25 = 337.5 + 25 = 362.5 -> 363 (half rounds up)
        let boundary_table = PriceTable {
            premium: 400,
            regular: 280,
            economy: 300,
        };
        let boundary = vec![seat("C4", SeatTier::Economy, 300)];
        assert_eq!(quote(&boundary, &boundary_table, &cfg).unwrap(), 363);

        let odd_table = PriceTable {
            premium: 400,
            regular: 280,
            economy: 202,
        };
        // 202 * 1.125 + 25 = 227.25 + 25 = 252.25 -> 252
        let odd = vec![seat("C4", SeatTier::Economy, 202)];
        assert_eq!(quote(&odd, &odd_table, &cfg).unwrap(), 252);
    }

    #[test]
    fn pricing_is_deterministic() {
        let selections = vec![
            seat("D1", SeatTier::Premium, 400),
            seat("D2", SeatTier::Economy, 200),
        ];
        let first = quote(&selections, &table(), &PricingConfig::default()).unwrap();
        for _ in 0..10 {
            let again = quote(&selections, &table(), &PricingConfig::default()).unwrap();
            assert_eq!(first, again);
        }
    }
}
