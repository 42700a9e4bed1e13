//! Invoice lifecycle operations and the paid-amount mutators.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use freightbook_shared::types::{InvoiceId, PartnerId};

use super::types::{Invoice, NewInvoice};
use crate::error::EngineError;
use crate::ledger::LedgerWriter;
use crate::retry::{Attempt, MAX_WRITE_ATTEMPTS, commit_staged};
use crate::store::FinanceStore;

/// Service for recording, editing, cancelling, and re-balancing invoices.
///
/// The balance mutators (`add_to_paid`, `subtract_from_paid`) re-read the
/// current row on every attempt and retry a lost version race once before
/// surfacing `ConcurrentModification`. They write no ledger rows.
#[derive(Clone)]
pub struct InvoiceService {
    store: Arc<dyn FinanceStore>,
    writer: LedgerWriter,
}

impl InvoiceService {
    /// Creates the service.
    pub fn new(store: Arc<dyn FinanceStore>, writer: LedgerWriter) -> Self {
        Self { store, writer }
    }

    /// Looks up an invoice.
    pub async fn find(&self, id: InvoiceId) -> Result<Invoice, EngineError> {
        self.store
            .invoice(id)
            .await?
            .ok_or(EngineError::InvoiceNotFound(id))
    }

    /// All invoices of a partner.
    pub async fn find_all_by_partner(
        &self,
        partner: PartnerId,
    ) -> Result<Vec<Invoice>, EngineError> {
        Ok(self.store.invoices_by_partner(partner).await?)
    }

    /// Records a new invoice and its ledger row in one commit.
    pub async fn create(&self, new: NewInvoice) -> Result<Invoice, EngineError> {
        let invoice = Invoice::record(new)?;
        let posted_on = ledger_date(&invoice);

        let mut tx = self.store.begin().await?;
        tx.stage_invoice(invoice.clone()).await?;
        self.writer
            .invoice_recorded(tx.as_mut(), &invoice, posted_on)
            .await?;
        match commit_staged(tx).await? {
            Attempt::Done(()) => {
                info!(invoice = %invoice.id, total = %invoice.total_amount,
                      currency = %invoice.currency, "invoice recorded");
                Ok(invoice)
            }
            // A fresh id cannot race an existing row.
            Attempt::Conflict => Err(EngineError::ConcurrentModification),
        }
    }

    /// Edits the invoiced total, writing the adjustment delta to the ledger
    /// (zero delta writes nothing).
    pub async fn adjust_total(
        &self,
        id: InvoiceId,
        total_amount: Decimal,
    ) -> Result<(), EngineError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut tx = self.store.begin().await?;
            let mut invoice = tx
                .invoice(id)
                .await?
                .ok_or(EngineError::InvoiceNotFound(id))?;
            let delta = invoice.apply_total(total_amount)?;
            let posted_on = ledger_date(&invoice);
            tx.stage_invoice(invoice.clone()).await?;
            self.writer
                .invoice_adjusted(tx.as_mut(), &invoice, delta, posted_on)
                .await?;
            match commit_staged(tx).await? {
                Attempt::Done(()) => {
                    info!(invoice = %id, %delta, "invoice total adjusted");
                    return Ok(());
                }
                Attempt::Conflict => {
                    warn!(invoice = %id, attempt, "retrying invoice adjustment");
                }
            }
        }
        Err(EngineError::ConcurrentModification)
    }

    /// Cancels an invoice without payment history, writing the reversal
    /// row.
    pub async fn cancel(&self, id: InvoiceId) -> Result<(), EngineError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut tx = self.store.begin().await?;
            let mut invoice = tx
                .invoice(id)
                .await?
                .ok_or(EngineError::InvoiceNotFound(id))?;
            invoice.cancel()?;
            let posted_on = ledger_date(&invoice);
            tx.stage_invoice(invoice.clone()).await?;
            self.writer
                .invoice_reversed(tx.as_mut(), &invoice, posted_on)
                .await?;
            match commit_staged(tx).await? {
                Attempt::Done(()) => {
                    info!(invoice = %id, "invoice cancelled");
                    return Ok(());
                }
                Attempt::Conflict => {
                    warn!(invoice = %id, attempt, "retrying invoice cancellation");
                }
            }
        }
        Err(EngineError::ConcurrentModification)
    }

    /// Applies `amount` toward the invoice's paid amount.
    pub async fn add_to_paid(&self, id: InvoiceId, amount: Decimal) -> Result<(), EngineError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut tx = self.store.begin().await?;
            let mut invoice = tx
                .invoice(id)
                .await?
                .ok_or(EngineError::InvoiceNotFound(id))?;
            invoice.record_payment(amount)?;
            tx.stage_invoice(invoice.clone()).await?;
            match commit_staged(tx).await? {
                Attempt::Done(()) => {
                    info!(invoice = %id, %amount, paid = %invoice.paid_amount,
                          "added to invoice paid amount");
                    return Ok(());
                }
                Attempt::Conflict => {
                    warn!(invoice = %id, attempt, "retrying invoice payment");
                }
            }
        }
        Err(EngineError::ConcurrentModification)
    }

    /// Reverses `amount` of the invoice's paid amount.
    pub async fn subtract_from_paid(
        &self,
        id: InvoiceId,
        amount: Decimal,
    ) -> Result<(), EngineError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut tx = self.store.begin().await?;
            let mut invoice = tx
                .invoice(id)
                .await?
                .ok_or(EngineError::InvoiceNotFound(id))?;
            invoice.revert_payment(amount)?;
            tx.stage_invoice(invoice.clone()).await?;
            match commit_staged(tx).await? {
                Attempt::Done(()) => {
                    info!(invoice = %id, %amount, paid = %invoice.paid_amount,
                          "subtracted from invoice paid amount");
                    return Ok(());
                }
                Attempt::Conflict => {
                    warn!(invoice = %id, attempt, "retrying invoice payment reversal");
                }
            }
        }
        Err(EngineError::ConcurrentModification)
    }
}

/// The business date invoice rows post under: the issue date when known,
/// otherwise today.
fn ledger_date(invoice: &Invoice) -> NaiveDate {
    invoice
        .issue_date
        .unwrap_or_else(|| Utc::now().date_naive())
}
