//! Moving money between a payment and an invoice.
//!
//! One allocation touches up to five rows: the payment, the invoice, and
//! one to three ledger rows. All of them commit through a single store
//! transaction; a version conflict at commit re-runs the whole attempt
//! (fresh reads included) once before surfacing `ConcurrentModification`.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use freightbook_shared::types::{InvoiceId, PartnerId, PaymentId};

use crate::currency::ExchangeRates;
use crate::error::EngineError;
use crate::invoice::Invoice;
use crate::ledger::{LedgerEntry, LedgerWriter, ReferenceType};
use crate::payment::Payment;
use crate::retry::{Attempt, MAX_WRITE_ATTEMPTS, commit_staged};
use crate::store::{DirectoryError, FinanceStore, PartnerDirectory, StoreTx};

/// The smallest amount that can be allocated or deallocated.
pub const MIN_ALLOCATION: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// The allocate/deallocate orchestrator.
///
/// Invariant: `Allocation` ledger rows are written only here. Deallocation
/// sums those raw rows to learn how much is currently applied to an
/// invoice; no separate allocation-link table exists.
#[derive(Clone)]
pub struct AllocationService {
    store: Arc<dyn FinanceStore>,
    directory: Arc<dyn PartnerDirectory>,
    rates: ExchangeRates,
    writer: LedgerWriter,
}

impl AllocationService {
    /// Creates the orchestrator.
    pub fn new(
        store: Arc<dyn FinanceStore>,
        directory: Arc<dyn PartnerDirectory>,
        rates: ExchangeRates,
    ) -> Self {
        let writer = LedgerWriter::new(rates.clone());
        Self {
            store,
            directory,
            rates,
            writer,
        }
    }

    /// Applies `amount` (in the payment's currency) of the payment to the
    /// invoice.
    pub async fn allocate(
        &self,
        payment_id: PaymentId,
        invoice_id: InvoiceId,
        amount: Decimal,
    ) -> Result<(), EngineError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            match self.try_allocate(payment_id, invoice_id, amount).await? {
                Attempt::Done(()) => {
                    info!(payment = %payment_id, invoice = %invoice_id, %amount, "allocated");
                    return Ok(());
                }
                Attempt::Conflict => {
                    warn!(payment = %payment_id, invoice = %invoice_id, attempt,
                          "allocation lost a version race, retrying");
                }
            }
        }
        Err(EngineError::ConcurrentModification)
    }

    /// Reverses `amount` (in the payment's currency) of prior allocation
    /// between the payment and the invoice.
    pub async fn deallocate(
        &self,
        payment_id: PaymentId,
        invoice_id: InvoiceId,
        amount: Decimal,
    ) -> Result<(), EngineError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            match self.try_deallocate(payment_id, invoice_id, amount).await? {
                Attempt::Done(()) => {
                    info!(payment = %payment_id, invoice = %invoice_id, %amount, "deallocated");
                    return Ok(());
                }
                Attempt::Conflict => {
                    warn!(payment = %payment_id, invoice = %invoice_id, attempt,
                          "deallocation lost a version race, retrying");
                }
            }
        }
        Err(EngineError::ConcurrentModification)
    }

    /// All allocation rows in a partner's ledger.
    pub async fn allocations_by_partner(
        &self,
        partner: PartnerId,
    ) -> Result<Vec<LedgerEntry>, EngineError> {
        Ok(self
            .store
            .entries_by_partner(partner, Some(ReferenceType::Allocation))
            .await?)
    }

    /// All allocation rows keyed to a payment.
    pub async fn allocations_by_payment(
        &self,
        payment: PaymentId,
    ) -> Result<Vec<LedgerEntry>, EngineError> {
        Ok(self
            .store
            .entries_by_payment(payment, Some(ReferenceType::Allocation))
            .await?)
    }

    /// All allocation rows keyed to an invoice.
    pub async fn allocations_by_invoice(
        &self,
        invoice: InvoiceId,
    ) -> Result<Vec<LedgerEntry>, EngineError> {
        Ok(self
            .store
            .entries_by_invoice(invoice, Some(ReferenceType::Allocation))
            .await?)
    }

    async fn try_allocate(
        &self,
        payment_id: PaymentId,
        invoice_id: InvoiceId,
        amount: Decimal,
    ) -> Result<Attempt<()>, EngineError> {
        let mut tx = self.store.begin().await?;
        let (mut payment, mut invoice) =
            self.load_pair(tx.as_mut(), payment_id, invoice_id).await?;
        validate_pair(&payment, &invoice, amount)?;

        let rate_date = rate_date(&payment, &invoice);
        let invoice_side = self.invoice_side_amount(&payment, &invoice, amount, rate_date).await?;
        let signed = invoice_side * invoice.direction.sign();

        payment.reserve(amount)?;
        invoice.record_payment(invoice_side)?;
        tx.stage_payment(payment.clone()).await?;
        tx.stage_invoice(invoice.clone()).await?;

        if payment.currency != invoice.currency {
            // The two legs net to zero per currency; the allocation row
            // below carries the economic transfer.
            self.writer
                .conversion_legs(
                    tx.as_mut(),
                    payment.partner_id,
                    (payment.currency, -amount),
                    (invoice.currency, signed),
                    payment_id,
                    rate_date,
                )
                .await?;
        }
        self.writer
            .allocation(
                tx.as_mut(),
                payment.partner_id,
                invoice.currency,
                signed,
                payment_id,
                invoice_id,
                rate_date,
            )
            .await?;

        commit_staged(tx).await
    }

    async fn try_deallocate(
        &self,
        payment_id: PaymentId,
        invoice_id: InvoiceId,
        amount: Decimal,
    ) -> Result<Attempt<()>, EngineError> {
        let mut tx = self.store.begin().await?;
        let (mut payment, mut invoice) =
            self.load_pair(tx.as_mut(), payment_id, invoice_id).await?;
        validate_pair(&payment, &invoice, amount)?;

        let rate_date = rate_date(&payment, &invoice);
        let invoice_side = self.invoice_side_amount(&payment, &invoice, amount, rate_date).await?;
        let signed = invoice_side * invoice.direction.sign();

        // Payable rows are negative, so compare absolute values.
        let allocated: Decimal = tx
            .allocations_between(payment_id, invoice_id)
            .await?
            .iter()
            .map(|entry| entry.amount)
            .sum();
        if allocated.abs() < invoice_side {
            return Err(EngineError::NoExistingAllocation {
                requested: invoice_side,
                allocated: allocated.abs(),
            });
        }

        payment.release(amount)?;
        invoice.revert_payment(invoice_side)?;
        tx.stage_payment(payment.clone()).await?;
        tx.stage_invoice(invoice.clone()).await?;

        // Opposite of the sign a fresh same-size allocation would post.
        self.writer
            .allocation(
                tx.as_mut(),
                payment.partner_id,
                invoice.currency,
                -signed,
                payment_id,
                invoice_id,
                rate_date,
            )
            .await?;

        commit_staged(tx).await
    }

    /// Loads both rows fresh and confirms the owning partners exist.
    async fn load_pair(
        &self,
        tx: &mut dyn StoreTx,
        payment_id: PaymentId,
        invoice_id: InvoiceId,
    ) -> Result<(Payment, Invoice), EngineError> {
        let payment = tx
            .payment(payment_id)
            .await?
            .ok_or(EngineError::PaymentNotFound(payment_id))?;
        let invoice = tx
            .invoice(invoice_id)
            .await?
            .ok_or(EngineError::InvoiceNotFound(invoice_id))?;

        self.ensure_partner_exists(payment.partner_id).await?;
        if invoice.partner_id != payment.partner_id {
            self.ensure_partner_exists(invoice.partner_id).await?;
        }
        Ok((payment, invoice))
    }

    /// The amount the invoice side moves by, in the invoice's currency.
    async fn invoice_side_amount(
        &self,
        payment: &Payment,
        invoice: &Invoice,
        amount: Decimal,
        rate_date: NaiveDate,
    ) -> Result<Decimal, EngineError> {
        if payment.currency == invoice.currency {
            return Ok(amount);
        }
        let converted = self
            .rates
            .convert(payment.currency, invoice.currency, amount, rate_date)
            .await?;
        debug!(from = %payment.currency, to = %invoice.currency, %amount,
               %converted, date = %rate_date, "converted allocation amount");
        // A tiny amount can round below the ledger's minimum.
        if converted < MIN_ALLOCATION {
            return Err(EngineError::BelowMinimum {
                amount: converted,
                minimum: MIN_ALLOCATION,
            });
        }
        Ok(converted)
    }

    async fn ensure_partner_exists(&self, partner: PartnerId) -> Result<(), EngineError> {
        let exists = self.directory.exists(partner).await.map_err(|err| {
            let DirectoryError::Unavailable(reason) = err;
            warn!(%partner, %reason, "partner directory unavailable");
            EngineError::PartnerDirectoryUnavailable(reason)
        })?;
        if exists {
            Ok(())
        } else {
            Err(EngineError::PartnerNotFound(partner))
        }
    }
}

/// The date cross-currency conversion (and allocation rows) post under.
fn rate_date(payment: &Payment, invoice: &Invoice) -> NaiveDate {
    invoice.issue_date.unwrap_or(payment.payment_date)
}

/// Shared validation for allocate and deallocate.
fn validate_pair(
    payment: &Payment,
    invoice: &Invoice,
    amount: Decimal,
) -> Result<(), EngineError> {
    if payment.partner_id != invoice.partner_id {
        return Err(EngineError::ClientMismatch {
            payment_partner: payment.partner_id,
            invoice_partner: invoice.partner_id,
        });
    }
    if amount < MIN_ALLOCATION {
        return Err(EngineError::BelowMinimum {
            amount,
            minimum: MIN_ALLOCATION,
        });
    }
    Ok(())
}
