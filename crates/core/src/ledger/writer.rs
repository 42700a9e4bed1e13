//! The ledger writer: appends movement rows with resolved base amounts.
//!
//! The writer stages rows on the caller's transaction; atomicity across
//! multiple appends is the caller's responsibility.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use freightbook_shared::types::{Currency, InvoiceId, PartnerId, PaymentId};

use super::types::{LedgerDraft, LedgerEntry};
use crate::currency::ExchangeRates;
use crate::error::EngineError;
use crate::invoice::Invoice;
use crate::payment::Payment;
use crate::store::StoreTx;

/// Appends immutable ledger rows, computing each row's base-currency
/// equivalent as of its transaction date.
#[derive(Debug, Clone)]
pub struct LedgerWriter {
    rates: ExchangeRates,
}

impl LedgerWriter {
    /// Creates a writer over the given exchange-rate service.
    #[must_use]
    pub fn new(rates: ExchangeRates) -> Self {
        Self { rates }
    }

    /// The base/reporting currency rows are normalized into.
    #[must_use]
    pub fn base_currency(&self) -> Currency {
        self.rates.base_currency()
    }

    /// Resolves the draft's base amount and stages the finished entry.
    ///
    /// Rows already in the base currency copy their amount; anything else
    /// is converted at the row's transaction date (the rate service
    /// refreshes its source once for missing dates before failing with
    /// `RateUnavailable`).
    pub async fn append(
        &self,
        tx: &mut dyn StoreTx,
        draft: LedgerDraft,
    ) -> Result<LedgerEntry, EngineError> {
        let base = self.base_currency();
        let base_amount = if draft.currency == base {
            draft.amount
        } else {
            self.rates
                .convert(draft.currency, base, draft.amount, draft.transaction_date)
                .await?
        };

        let entry = draft.into_entry(base_amount);
        debug!(
            reference = %entry.reference_type,
            partner = %entry.partner_id,
            currency = %entry.currency,
            amount = %entry.amount,
            base_amount = %entry.base_amount,
            "staging ledger row"
        );
        tx.stage_entry(entry.clone()).await?;
        Ok(entry)
    }

    /// Row for a newly recorded payment.
    pub async fn payment_recorded(
        &self,
        tx: &mut dyn StoreTx,
        payment: &Payment,
    ) -> Result<LedgerEntry, EngineError> {
        self.append(tx, LedgerDraft::for_payment(payment)).await
    }

    /// Adjustment row for an edited payment; a zero delta writes nothing.
    pub async fn payment_adjusted(
        &self,
        tx: &mut dyn StoreTx,
        payment: &Payment,
        delta: Decimal,
    ) -> Result<Option<LedgerEntry>, EngineError> {
        if delta.is_zero() {
            return Ok(None);
        }
        self.append(tx, LedgerDraft::for_payment_adjustment(payment, delta))
            .await
            .map(Some)
    }

    /// Reversal row for a cancelled payment.
    pub async fn payment_reversed(
        &self,
        tx: &mut dyn StoreTx,
        payment: &Payment,
    ) -> Result<LedgerEntry, EngineError> {
        self.append(tx, LedgerDraft::for_payment_reversal(payment))
            .await
    }

    /// Row for a newly recorded invoice.
    pub async fn invoice_recorded(
        &self,
        tx: &mut dyn StoreTx,
        invoice: &Invoice,
        on: NaiveDate,
    ) -> Result<LedgerEntry, EngineError> {
        self.append(tx, LedgerDraft::for_invoice(invoice, on)).await
    }

    /// Adjustment row for an edited invoice total; a zero delta writes
    /// nothing.
    pub async fn invoice_adjusted(
        &self,
        tx: &mut dyn StoreTx,
        invoice: &Invoice,
        delta: Decimal,
        on: NaiveDate,
    ) -> Result<Option<LedgerEntry>, EngineError> {
        if delta.is_zero() {
            return Ok(None);
        }
        self.append(tx, LedgerDraft::for_invoice_adjustment(invoice, delta, on))
            .await
            .map(Some)
    }

    /// Reversal row for a cancelled invoice.
    pub async fn invoice_reversed(
        &self,
        tx: &mut dyn StoreTx,
        invoice: &Invoice,
        on: NaiveDate,
    ) -> Result<LedgerEntry, EngineError> {
        self.append(tx, LedgerDraft::for_invoice_reversal(invoice, on))
            .await
    }

    /// Allocation row keyed to both sides.
    #[allow(clippy::too_many_arguments)]
    pub async fn allocation(
        &self,
        tx: &mut dyn StoreTx,
        partner: PartnerId,
        currency: Currency,
        signed_amount: Decimal,
        payment: PaymentId,
        invoice: InvoiceId,
        on: NaiveDate,
    ) -> Result<LedgerEntry, EngineError> {
        self.append(
            tx,
            LedgerDraft::for_allocation(partner, currency, signed_amount, payment, invoice, on),
        )
        .await
    }

    /// The two legs of a cross-currency conversion, keyed to the payment
    /// only. The legs must be in different currencies; together with the
    /// allocation row they keep the trail currency-balanced.
    #[allow(clippy::too_many_arguments)]
    pub async fn conversion_legs(
        &self,
        tx: &mut dyn StoreTx,
        partner: PartnerId,
        payment_leg: (Currency, Decimal),
        invoice_leg: (Currency, Decimal),
        payment: PaymentId,
        on: NaiveDate,
    ) -> Result<(LedgerEntry, LedgerEntry), EngineError> {
        let (payment_currency, payment_amount) = payment_leg;
        let (invoice_currency, invoice_amount) = invoice_leg;
        if payment_currency == invoice_currency {
            return Err(EngineError::CurrencyMismatch {
                expected: payment_currency,
                actual: invoice_currency,
            });
        }

        let from_leg = self
            .append(
                tx,
                LedgerDraft::for_conversion_leg(partner, payment_currency, payment_amount, payment, on),
            )
            .await?;
        let to_leg = self
            .append(
                tx,
                LedgerDraft::for_conversion_leg(partner, invoice_currency, invoice_amount, payment, on),
            )
            .await?;
        Ok((from_leg, to_leg))
    }
}
