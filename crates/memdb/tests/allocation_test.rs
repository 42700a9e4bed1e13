//! Allocation and deallocation through the full engine stack.

mod common;

use common::{Harness, day};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use freightbook_core::error::EngineError;
use freightbook_core::invoice::InvoiceDirection;
use freightbook_core::ledger::ReferenceType;
use freightbook_core::store::FinanceStore;
use freightbook_shared::types::{Currency, InvoiceId, PartnerId, PaymentId};

#[tokio::test]
async fn test_same_currency_allocation_moves_both_balances() {
    let h = Harness::new();
    let payment = h.payment(Currency::Usd, dec!(200)).await;
    let invoice = h.invoice(Currency::Usd, dec!(300)).await;

    h.allocations
        .allocate(payment.id, invoice.id, dec!(100))
        .await
        .unwrap();
    let pay = h.payments.find(payment.id).await.unwrap();
    let inv = h.invoices.find(invoice.id).await.unwrap();
    assert_eq!(pay.unallocated_amount, dec!(100));
    assert_eq!(inv.paid_amount, dec!(100));

    h.allocations
        .allocate(payment.id, invoice.id, dec!(50))
        .await
        .unwrap();
    let pay = h.payments.find(payment.id).await.unwrap();
    let inv = h.invoices.find(invoice.id).await.unwrap();
    assert_eq!(pay.unallocated_amount, dec!(50));
    assert_eq!(inv.paid_amount, dec!(150));

    h.allocations
        .deallocate(payment.id, invoice.id, dec!(50))
        .await
        .unwrap();
    let pay = h.payments.find(payment.id).await.unwrap();
    let inv = h.invoices.find(invoice.id).await.unwrap();
    assert_eq!(pay.unallocated_amount, dec!(100));
    assert_eq!(inv.paid_amount, dec!(100));
}

#[tokio::test]
async fn test_same_currency_allocation_writes_one_ledger_row() {
    let h = Harness::new();
    let payment = h.payment(Currency::Usd, dec!(200)).await;
    let invoice = h.invoice(Currency::Usd, dec!(300)).await;

    let before = h.store.ledger_len().unwrap();
    h.allocations
        .allocate(payment.id, invoice.id, dec!(100))
        .await
        .unwrap();
    assert_eq!(h.store.ledger_len().unwrap(), before + 1);

    let rows = h.allocations.allocations_by_payment(payment.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.reference_type, ReferenceType::Allocation);
    assert_eq!(row.amount, dec!(100));
    assert_eq!(row.currency, Currency::Usd);
    assert_eq!(row.payment_id, Some(payment.id));
    assert_eq!(row.invoice_id, Some(invoice.id));
    assert_eq!(row.transaction_date, day());
}

#[tokio::test]
async fn test_cross_currency_allocation_converts_at_invoice_issue_date_rate() {
    // Payment 100 EUR, invoice 300 USD, EUR→USD 1.10 on the issue date.
    let h = Harness::new();
    let payment = h.payment(Currency::Eur, dec!(100)).await;
    let invoice = h.invoice(Currency::Usd, dec!(300)).await;

    h.allocations
        .allocate(payment.id, invoice.id, dec!(50))
        .await
        .unwrap();

    let pay = h.payments.find(payment.id).await.unwrap();
    let inv = h.invoices.find(invoice.id).await.unwrap();
    assert_eq!(pay.unallocated_amount, dec!(50));
    assert_eq!(inv.paid_amount, dec!(55.00));
}

#[tokio::test]
async fn test_cross_currency_allocation_writes_three_balanced_rows() {
    let h = Harness::new();
    let payment = h.payment(Currency::Eur, dec!(100)).await;
    let invoice = h.invoice(Currency::Usd, dec!(300)).await;

    // Two rows already exist for the payment and invoice themselves.
    let before = h.store.ledger_len().unwrap();
    h.allocations
        .allocate(payment.id, invoice.id, dec!(50))
        .await
        .unwrap();
    assert_eq!(h.store.ledger_len().unwrap(), before + 3);

    let legs = h
        .store
        .entries_by_payment(payment.id, Some(ReferenceType::Conversion))
        .await
        .unwrap();
    assert_eq!(legs.len(), 2);

    let eur_leg = legs.iter().find(|e| e.currency == Currency::Eur).unwrap();
    let usd_leg = legs.iter().find(|e| e.currency == Currency::Usd).unwrap();
    assert_eq!(eur_leg.amount, dec!(-50));
    assert_eq!(usd_leg.amount, dec!(55.00));
    // Conversion legs are keyed to the payment only.
    assert_eq!(eur_leg.invoice_id, None);
    assert_eq!(usd_leg.invoice_id, None);
    // In base currency the pair nets to zero: -50×99 + 55×90 = 0.
    assert_eq!(eur_leg.base_amount + usd_leg.base_amount, Decimal::ZERO);

    let allocations = h
        .allocations
        .allocations_by_invoice(invoice.id)
        .await
        .unwrap();
    assert_eq!(allocations.len(), 1);
    assert_eq!(allocations[0].amount, dec!(55.00));
    assert_eq!(allocations[0].currency, Currency::Usd);
    assert_eq!(allocations[0].payment_id, Some(payment.id));
}

#[tokio::test]
async fn test_payable_invoice_posts_negative_allocation() {
    let h = Harness::new();
    let payment = h.payment(Currency::Usd, dec!(200)).await;
    let invoice = h
        .invoice_with(InvoiceDirection::Payable, Currency::Usd, dec!(300), Some(day()))
        .await;

    h.allocations
        .allocate(payment.id, invoice.id, dec!(80))
        .await
        .unwrap();

    let rows = h.allocations.allocations_by_invoice(invoice.id).await.unwrap();
    assert_eq!(rows[0].amount, dec!(-80));
    // The paid amount itself is an unsigned magnitude.
    let inv = h.invoices.find(invoice.id).await.unwrap();
    assert_eq!(inv.paid_amount, dec!(80));

    // Deallocation negates the payable sign back to positive.
    h.allocations
        .deallocate(payment.id, invoice.id, dec!(80))
        .await
        .unwrap();
    let rows = h.allocations.allocations_by_invoice(invoice.id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].amount, dec!(80));
}

#[tokio::test]
async fn test_allocate_more_than_unallocated_fails_cleanly() {
    let h = Harness::new();
    let payment = h.payment(Currency::Usd, dec!(200)).await;
    let invoice = h.invoice(Currency::Usd, dec!(500)).await;

    let before = h.store.ledger_len().unwrap();
    let err = h
        .allocations
        .allocate(payment.id, invoice.id, dec!(200.01))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExceedsUnallocated { .. }));

    // Nothing moved, nothing was written.
    let pay = h.payments.find(payment.id).await.unwrap();
    let inv = h.invoices.find(invoice.id).await.unwrap();
    assert_eq!(pay.unallocated_amount, dec!(200));
    assert_eq!(inv.paid_amount, dec!(0));
    assert_eq!(h.store.ledger_len().unwrap(), before);
}

#[tokio::test]
async fn test_allocate_more_than_outstanding_fails_cleanly() {
    let h = Harness::new();
    let payment = h.payment(Currency::Usd, dec!(500)).await;
    let invoice = h.invoice(Currency::Usd, dec!(100)).await;

    let err = h
        .allocations
        .allocate(payment.id, invoice.id, dec!(150))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExceedsOutstanding { .. }));

    let pay = h.payments.find(payment.id).await.unwrap();
    assert_eq!(pay.unallocated_amount, dec!(500));
}

#[tokio::test]
async fn test_deallocate_more_than_allocated_fails() {
    let h = Harness::new();
    let payment = h.payment(Currency::Usd, dec!(200)).await;
    let invoice = h.invoice(Currency::Usd, dec!(300)).await;

    h.allocations
        .allocate(payment.id, invoice.id, dec!(40))
        .await
        .unwrap();
    let err = h
        .allocations
        .deallocate(payment.id, invoice.id, dec!(40.01))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoExistingAllocation { .. }));
}

#[tokio::test]
async fn test_deallocate_without_any_allocation_fails() {
    let h = Harness::new();
    let payment = h.payment(Currency::Usd, dec!(200)).await;
    let invoice = h.invoice(Currency::Usd, dec!(300)).await;

    let err = h
        .allocations
        .deallocate(payment.id, invoice.id, dec!(10))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::NoExistingAllocation {
            allocated,
            ..
        } if allocated == Decimal::ZERO
    ));
}

#[tokio::test]
async fn test_validation_failures() {
    let h = Harness::new();
    let payment = h.payment(Currency::Usd, dec!(200)).await;
    let invoice = h.invoice(Currency::Usd, dec!(300)).await;

    // Below the 0.01 minimum.
    assert!(matches!(
        h.allocations
            .allocate(payment.id, invoice.id, dec!(0.005))
            .await,
        Err(EngineError::BelowMinimum { .. })
    ));

    // Unknown payment/invoice ids.
    assert!(matches!(
        h.allocations
            .allocate(PaymentId::new(), invoice.id, dec!(10))
            .await,
        Err(EngineError::PaymentNotFound(_))
    ));
    assert!(matches!(
        h.allocations
            .allocate(payment.id, InvoiceId::new(), dec!(10))
            .await,
        Err(EngineError::InvoiceNotFound(_))
    ));
}

#[tokio::test]
async fn test_partner_mismatch_is_rejected() {
    let h = Harness::new();
    let payment = h.payment(Currency::Usd, dec!(200)).await;

    let other_partner = PartnerId::new();
    h.directory.register(other_partner);
    let foreign_invoice = h
        .invoices
        .create(freightbook_core::invoice::NewInvoice {
            direction: InvoiceDirection::Receivable,
            partner_id: other_partner,
            currency: Currency::Usd,
            total_amount: dec!(300),
            issue_date: Some(day()),
            due_date: None,
            commentary: None,
        })
        .await
        .unwrap();

    let err = h
        .allocations
        .allocate(payment.id, foreign_invoice.id, dec!(10))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ClientMismatch { .. }));
}

#[tokio::test]
async fn test_unknown_partner_blocks_allocation() {
    let h = Harness::new();
    // Payments and invoices can be recorded before the directory knows the
    // partner, but allocation requires the partner to exist.
    let ghost = PartnerId::new();
    let payment = h
        .payments
        .create(freightbook_core::payment::NewPayment {
            partner_id: ghost,
            payment_date: day(),
            currency: Currency::Usd,
            amount: dec!(200),
            processing_fees: dec!(0),
            commentary: None,
        })
        .await
        .unwrap();
    let invoice = h
        .invoices
        .create(freightbook_core::invoice::NewInvoice {
            direction: InvoiceDirection::Receivable,
            partner_id: ghost,
            currency: Currency::Usd,
            total_amount: dec!(300),
            issue_date: Some(day()),
            due_date: None,
            commentary: None,
        })
        .await
        .unwrap();

    let err = h
        .allocations
        .allocate(payment.id, invoice.id, dec!(10))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PartnerNotFound(p) if p == ghost));
}

#[tokio::test]
async fn test_directory_outage_blocks_allocation() {
    let h = Harness::new();
    let payment = h.payment(Currency::Usd, dec!(200)).await;
    let invoice = h.invoice(Currency::Usd, dec!(300)).await;

    h.directory.set_available(false);
    assert!(matches!(
        h.allocations.allocate(payment.id, invoice.id, dec!(10)).await,
        Err(EngineError::PartnerDirectoryUnavailable(_))
    ));

    // Once the directory recovers the same call goes through.
    h.directory.set_available(true);
    h.allocations
        .allocate(payment.id, invoice.id, dec!(10))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rate_date_falls_back_to_payment_date() {
    // Base-currency rows never need a quote, so the undated invoice can
    // post under "today" while the allocation row falls back to the
    // payment date.
    let h = Harness::new();
    let payment = h.payment(Currency::Rub, dec!(200)).await;
    let invoice = h
        .invoice_with(InvoiceDirection::Receivable, Currency::Rub, dec!(300), None)
        .await;

    h.allocations
        .allocate(payment.id, invoice.id, dec!(25))
        .await
        .unwrap();
    let rows = h.allocations.allocations_by_invoice(invoice.id).await.unwrap();
    // No issue date on the invoice, so the row posts under the payment date.
    assert_eq!(rows[0].transaction_date, payment.payment_date);
}

#[tokio::test]
async fn test_conservation_over_repeated_unit_cycles() {
    let h = Harness::new();
    let payment = h.payment(Currency::Usd, dec!(200)).await;
    let invoice = h.invoice(Currency::Usd, dec!(300)).await;

    for _ in 0..100 {
        h.allocations
            .allocate(payment.id, invoice.id, dec!(1))
            .await
            .unwrap();
        h.allocations
            .deallocate(payment.id, invoice.id, dec!(1))
            .await
            .unwrap();
    }

    // Exact decimal equality after 100 cycles, no drift.
    let pay = h.payments.find(payment.id).await.unwrap();
    let inv = h.invoices.find(invoice.id).await.unwrap();
    assert_eq!(pay.unallocated_amount, dec!(200));
    assert_eq!(inv.paid_amount, dec!(0));
}

#[tokio::test]
async fn test_cross_currency_conservation() {
    let h = Harness::new();
    let payment = h.payment(Currency::Eur, dec!(100)).await;
    let invoice = h.invoice(Currency::Usd, dec!(300)).await;

    h.allocations
        .allocate(payment.id, invoice.id, dec!(50))
        .await
        .unwrap();
    h.allocations
        .deallocate(payment.id, invoice.id, dec!(50))
        .await
        .unwrap();

    let pay = h.payments.find(payment.id).await.unwrap();
    let inv = h.invoices.find(invoice.id).await.unwrap();
    assert_eq!(pay.unallocated_amount, dec!(100));
    assert_eq!(inv.paid_amount, dec!(0));
}

#[tokio::test]
async fn test_finders_return_allocation_rows_only() {
    let h = Harness::new();
    let payment = h.payment(Currency::Usd, dec!(200)).await;
    let invoice = h.invoice(Currency::Usd, dec!(300)).await;

    h.allocations
        .allocate(payment.id, invoice.id, dec!(30))
        .await
        .unwrap();

    let by_partner = h.allocations.allocations_by_partner(h.partner).await.unwrap();
    assert_eq!(by_partner.len(), 1);
    assert!(
        by_partner
            .iter()
            .all(|e| e.reference_type == ReferenceType::Allocation)
    );

    // The partner's full ledger also holds the payment and invoice rows.
    let all = h.store.entries_by_partner(h.partner, None).await.unwrap();
    assert_eq!(all.len(), 3);
}
