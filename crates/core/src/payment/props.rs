//! Property-based tests for payment balance arithmetic.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use freightbook_shared::types::{Currency, PartnerId};

use super::types::{NewPayment, Payment};

fn cents(n: i64) -> Decimal {
    Decimal::new(n, 2)
}

/// A random mutation against the unallocated pool.
#[derive(Debug, Clone, Copy)]
enum Op {
    Reserve(i64),
    Release(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..50_000).prop_map(Op::Reserve),
        (1i64..50_000).prop_map(Op::Release),
    ]
}

fn payment_with_total(total_cents: i64) -> Payment {
    Payment::record(NewPayment {
        partner_id: PartnerId::new(),
        payment_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        currency: Currency::Usd,
        amount: cents(total_cents),
        processing_fees: Decimal::ZERO,
        commentary: None,
    })
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The unallocated amount stays within `[0, total]` across any
    /// sequence of reserves and releases, whether they succeed or fail.
    #[test]
    fn prop_unallocated_stays_within_bounds(
        total in 1i64..100_000,
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let mut payment = payment_with_total(total);
        for op in ops {
            let _ = match op {
                Op::Reserve(n) => payment.reserve(cents(n)),
                Op::Release(n) => payment.release(cents(n)),
            };
            prop_assert!(payment.unallocated_amount >= Decimal::ZERO);
            prop_assert!(payment.unallocated_amount <= payment.total_amount);
        }
    }

    /// A failed mutation never moves the balance.
    #[test]
    fn prop_failed_mutation_is_a_noop(
        total in 1i64..100_000,
        over in 1i64..100_000,
    ) {
        let mut payment = payment_with_total(total);
        let before = payment.unallocated_amount;

        // Overdraw by at least one cent.
        let result = payment.reserve(cents(total + over));
        prop_assert!(result.is_err());
        prop_assert_eq!(payment.unallocated_amount, before);

        let result = payment.release(cents(1));
        prop_assert!(result.is_err());
        prop_assert_eq!(payment.unallocated_amount, before);
    }

    /// Reserve-then-release of the same amount restores the exact balance
    /// (conservation, no drift).
    #[test]
    fn prop_reserve_release_roundtrip(
        total in 2i64..100_000,
        part in 1i64..100_000,
    ) {
        let part = part.min(total);
        let mut payment = payment_with_total(total);
        let before = payment.unallocated_amount;

        payment.reserve(cents(part)).unwrap();
        payment.release(cents(part)).unwrap();
        prop_assert_eq!(payment.unallocated_amount, before);
    }

    /// Allocated and unallocated always partition the total.
    #[test]
    fn prop_allocated_partitions_total(
        total in 1i64..100_000,
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let mut payment = payment_with_total(total);
        for op in ops {
            let _ = match op {
                Op::Reserve(n) => payment.reserve(cents(n)),
                Op::Release(n) => payment.release(cents(n)),
            };
            prop_assert_eq!(
                payment.allocated_amount() + payment.unallocated_amount,
                payment.total_amount
            );
        }
    }
}
