//! Payment lifecycle operations and the unallocated-amount mutators.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use freightbook_shared::types::{PartnerId, PaymentId};

use super::types::{NewPayment, Payment};
use crate::error::EngineError;
use crate::ledger::LedgerWriter;
use crate::retry::{Attempt, MAX_WRITE_ATTEMPTS, commit_staged};
use crate::store::FinanceStore;

/// Service for recording, editing, cancelling, and re-balancing payments.
///
/// The balance mutators (`allocate_from_payment`, `deallocate_to_payment`)
/// re-read the current row on every attempt and retry a lost version race
/// once before surfacing `ConcurrentModification`. They write no ledger
/// rows; that is the caller's contract.
#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn FinanceStore>,
    writer: LedgerWriter,
}

impl PaymentService {
    /// Creates the service.
    pub fn new(store: Arc<dyn FinanceStore>, writer: LedgerWriter) -> Self {
        Self { store, writer }
    }

    /// Looks up a payment.
    pub async fn find(&self, id: PaymentId) -> Result<Payment, EngineError> {
        self.store
            .payment(id)
            .await?
            .ok_or(EngineError::PaymentNotFound(id))
    }

    /// All payments of a partner.
    pub async fn find_all_by_partner(
        &self,
        partner: PartnerId,
    ) -> Result<Vec<Payment>, EngineError> {
        Ok(self.store.payments_by_partner(partner).await?)
    }

    /// Records a new payment and its ledger row in one commit.
    pub async fn create(&self, new: NewPayment) -> Result<Payment, EngineError> {
        let payment = Payment::record(new)?;

        let mut tx = self.store.begin().await?;
        tx.stage_payment(payment.clone()).await?;
        self.writer.payment_recorded(tx.as_mut(), &payment).await?;
        match commit_staged(tx).await? {
            Attempt::Done(()) => {
                info!(payment = %payment.id, amount = %payment.total_amount,
                      currency = %payment.currency, "payment recorded");
                Ok(payment)
            }
            // A fresh id cannot race an existing row.
            Attempt::Conflict => Err(EngineError::ConcurrentModification),
        }
    }

    /// Edits the gross amount and fees, writing the adjustment delta to the
    /// ledger (zero delta writes nothing).
    pub async fn adjust_amounts(
        &self,
        id: PaymentId,
        amount: Decimal,
        processing_fees: Decimal,
    ) -> Result<(), EngineError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut tx = self.store.begin().await?;
            let mut payment = tx
                .payment(id)
                .await?
                .ok_or(EngineError::PaymentNotFound(id))?;
            let delta = payment.apply_amounts(amount, processing_fees)?;
            tx.stage_payment(payment.clone()).await?;
            self.writer
                .payment_adjusted(tx.as_mut(), &payment, delta)
                .await?;
            match commit_staged(tx).await? {
                Attempt::Done(()) => {
                    info!(payment = %id, %delta, "payment amounts adjusted");
                    return Ok(());
                }
                Attempt::Conflict => {
                    warn!(payment = %id, attempt, "retrying payment adjustment");
                }
            }
        }
        Err(EngineError::ConcurrentModification)
    }

    /// Cancels a fully-unallocated payment, writing the reversal row.
    pub async fn cancel(&self, id: PaymentId) -> Result<(), EngineError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut tx = self.store.begin().await?;
            let mut payment = tx
                .payment(id)
                .await?
                .ok_or(EngineError::PaymentNotFound(id))?;
            payment.cancel()?;
            tx.stage_payment(payment.clone()).await?;
            self.writer.payment_reversed(tx.as_mut(), &payment).await?;
            match commit_staged(tx).await? {
                Attempt::Done(()) => {
                    info!(payment = %id, "payment cancelled");
                    return Ok(());
                }
                Attempt::Conflict => {
                    warn!(payment = %id, attempt, "retrying payment cancellation");
                }
            }
        }
        Err(EngineError::ConcurrentModification)
    }

    /// Takes `amount` out of the payment's unallocated pool.
    pub async fn allocate_from_payment(
        &self,
        id: PaymentId,
        amount: Decimal,
    ) -> Result<(), EngineError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut tx = self.store.begin().await?;
            let mut payment = tx
                .payment(id)
                .await?
                .ok_or(EngineError::PaymentNotFound(id))?;
            payment.reserve(amount)?;
            tx.stage_payment(payment.clone()).await?;
            match commit_staged(tx).await? {
                Attempt::Done(()) => {
                    info!(payment = %id, %amount,
                          unallocated = %payment.unallocated_amount,
                          "allocated from payment");
                    return Ok(());
                }
                Attempt::Conflict => {
                    warn!(payment = %id, attempt, "retrying payment allocation");
                }
            }
        }
        Err(EngineError::ConcurrentModification)
    }

    /// Returns `amount` to the payment's unallocated pool.
    pub async fn deallocate_to_payment(
        &self,
        id: PaymentId,
        amount: Decimal,
    ) -> Result<(), EngineError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut tx = self.store.begin().await?;
            let mut payment = tx
                .payment(id)
                .await?
                .ok_or(EngineError::PaymentNotFound(id))?;
            payment.release(amount)?;
            tx.stage_payment(payment.clone()).await?;
            match commit_staged(tx).await? {
                Attempt::Done(()) => {
                    info!(payment = %id, %amount,
                          unallocated = %payment.unallocated_amount,
                          "deallocated back to payment");
                    return Ok(());
                }
                Attempt::Conflict => {
                    warn!(payment = %id, attempt, "retrying payment deallocation");
                }
            }
        }
        Err(EngineError::ConcurrentModification)
    }
}
