//! Property-based tests for conversion and rate-derivation arithmetic.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::convert::{AMOUNT_DP, RATE_DP, convert_amount, cross_rate, invert_rate};

/// Strategy for positive monetary amounts (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for positive exchange rates (0.000001 to ~180.0).
fn positive_rate() -> impl Strategy<Value = Decimal> {
    (1i64..180_000_000i64).prop_map(|v| Decimal::new(v, 6))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Converted amounts carry at most 2 decimal places.
    #[test]
    fn prop_convert_rounds_to_amount_dp(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let converted = convert_amount(amount, rate);
        prop_assert!(converted.scale() <= AMOUNT_DP);
    }

    /// Converting a positive amount at a positive rate never goes negative.
    #[test]
    fn prop_convert_preserves_sign(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        prop_assert!(convert_amount(amount, rate) >= Decimal::ZERO);
    }

    /// Conversion scales linearly up to rounding: converting `2a` differs
    /// from twice the conversion of `a` by at most one cent.
    #[test]
    fn prop_convert_is_linear_up_to_rounding(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let double = convert_amount(amount + amount, rate);
        let twice = convert_amount(amount, rate) + convert_amount(amount, rate);
        let drift = (double - twice).abs();
        prop_assert!(drift <= Decimal::new(1, AMOUNT_DP));
    }

    /// Derived rates carry at most 6 decimal places.
    #[test]
    fn prop_derived_rates_round_to_rate_dp(
        from_base in positive_rate(),
        to_base in positive_rate(),
    ) {
        prop_assert!(invert_rate(from_base).scale() <= RATE_DP);
        prop_assert!(cross_rate(from_base, to_base).scale() <= RATE_DP);
    }

    /// A cross rate of a currency against itself is exactly 1.
    #[test]
    fn prop_cross_rate_self_is_one(base in positive_rate()) {
        prop_assert_eq!(cross_rate(base, base), Decimal::ONE.round_dp(RATE_DP));
    }

    /// Inverting twice lands within rounding distance of the original for
    /// rates in the realistic band (0.01 .. 1000).
    #[test]
    fn prop_double_inversion_is_near_identity(
        rate in (10_000i64..1_000_000_000i64).prop_map(|v| Decimal::new(v, 6)),
    ) {
        let back = invert_rate(invert_rate(rate));
        let relative = ((back - rate) / rate).abs();
        // 6-dp rounding on the intermediate bounds the relative error.
        prop_assert!(relative < Decimal::new(1, 2));
    }
}
