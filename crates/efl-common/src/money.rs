//! Fixed-point rounding helpers
//!
//! Every amount is carried at full `Decimal` precision and rounded only when
//! it is reported.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{MONEY_DECIMAL_PLACES, RATE_DECIMAL_PLACES};

/// Round a dollar amount to the cent, half away from zero
#[inline]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a per-kWh rate to four places, half away from zero
#[inline]
pub fn round_rate(rate: Decimal) -> Decimal {
    rate.round_dp_with_strategy(RATE_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a cents value to dollars
#[inline]
pub fn cents_to_dollars(cents: Decimal) -> Decimal {
    cents / Decimal::ONE_HUNDRED
}
