//! Currency conversion arithmetic.
//!
//! Rounding strategy for multi-currency:
//! - Monetary amounts round to 2 decimal places
//! - Derived rates (inverse, cross) round to 6 decimal places
//! - Half-up (`MidpointAwayFromZero`) everywhere, so converted amounts match
//!   what the upstream rate feed publishes

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept on monetary amounts.
pub const AMOUNT_DP: u32 = 2;

/// Decimal places kept on derived exchange rates.
pub const RATE_DP: u32 = 6;

/// Converts an amount using the given exchange rate, rounding to 2 decimal
/// places half-up.
#[must_use]
pub fn convert_amount(amount: Decimal, rate: Decimal) -> Decimal {
    (amount * rate).round_dp_with_strategy(AMOUNT_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Derives the reciprocal of a foreign→base rate, rounded to 6 decimal
/// places half-up. The input must be non-zero.
#[must_use]
pub fn invert_rate(rate: Decimal) -> Decimal {
    (Decimal::ONE / rate).round_dp_with_strategy(RATE_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Derives a cross rate from two foreign→base quotes, e.g.
/// USD→EUR = (USD→RUB) / (EUR→RUB), rounded to 6 decimal places half-up.
#[must_use]
pub fn cross_rate(from_base: Decimal, to_base: Decimal) -> Decimal {
    (from_base / to_base).round_dp_with_strategy(RATE_DP, RoundingStrategy::MidpointAwayFromZero)
}
