//! Payment domain type and its balance arithmetic.
//!
//! The `unallocated_amount` field only changes through [`Payment::reserve`]
//! and [`Payment::release`]; both uphold `0 <= unallocated <= total`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use freightbook_shared::types::{Currency, PartnerId, PaymentId};

use crate::error::EngineError;

/// Payment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// The payment participates in allocation.
    Active,
    /// The payment was cancelled; terminal.
    Cancelled,
}

/// Input for recording a new payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    /// The partner the money came from (or is planned to go to).
    pub partner_id: PartnerId,
    /// Value date of the payment.
    pub payment_date: NaiveDate,
    /// Currency of the payment.
    pub currency: Currency,
    /// Gross amount received.
    pub amount: Decimal,
    /// Processing fees withheld from the gross amount.
    pub processing_fees: Decimal,
    /// Free-form note.
    pub commentary: Option<String>,
}

/// A received (or planned-to-be-paid) sum from/to a partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment id.
    pub id: PaymentId,
    /// Owning partner.
    pub partner_id: PartnerId,
    /// Value date.
    pub payment_date: NaiveDate,
    /// Currency of all amounts on this payment.
    pub currency: Currency,
    /// Gross amount.
    pub amount: Decimal,
    /// Fees withheld.
    pub processing_fees: Decimal,
    /// Net amount available for allocation: `amount - processing_fees`.
    pub total_amount: Decimal,
    /// The portion not yet applied to any invoice.
    pub unallocated_amount: Decimal,
    /// Lifecycle status.
    pub status: PaymentStatus,
    /// Free-form note.
    pub commentary: Option<String>,
    /// Optimistic-concurrency token, bumped by the store on every commit.
    pub version: u64,
}

impl Payment {
    /// Records a new payment with the full net amount unallocated.
    pub fn record(new: NewPayment) -> Result<Self, EngineError> {
        if new.amount <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(new.amount));
        }
        if new.processing_fees < Decimal::ZERO {
            return Err(EngineError::InvalidAmount(new.processing_fees));
        }
        let total = new.amount - new.processing_fees;
        if total <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(total));
        }
        Ok(Self {
            id: PaymentId::new(),
            partner_id: new.partner_id,
            payment_date: new.payment_date,
            currency: new.currency,
            amount: new.amount,
            processing_fees: new.processing_fees,
            total_amount: total,
            unallocated_amount: total,
            status: PaymentStatus::Active,
            commentary: new.commentary,
            version: 0,
        })
    }

    /// The portion already applied to invoices.
    #[must_use]
    pub fn allocated_amount(&self) -> Decimal {
        self.total_amount - self.unallocated_amount
    }

    /// True when nothing is left to allocate.
    #[must_use]
    pub fn is_fully_allocated(&self) -> bool {
        self.unallocated_amount.is_zero()
    }

    /// Takes `amount` out of the unallocated pool.
    pub fn reserve(&mut self, amount: Decimal) -> Result<(), EngineError> {
        self.ensure_positive(amount)?;
        self.ensure_active()?;
        let next = self.unallocated_amount - amount;
        if next < Decimal::ZERO {
            return Err(EngineError::ExceedsUnallocated {
                payment: self.id,
                requested: amount,
                unallocated: self.unallocated_amount,
            });
        }
        self.unallocated_amount = next;
        Ok(())
    }

    /// Returns `amount` to the unallocated pool.
    pub fn release(&mut self, amount: Decimal) -> Result<(), EngineError> {
        self.ensure_positive(amount)?;
        self.ensure_active()?;
        let next = self.unallocated_amount + amount;
        if next > self.total_amount {
            return Err(EngineError::NoExistingAllocation {
                requested: amount,
                allocated: self.allocated_amount(),
            });
        }
        self.unallocated_amount = next;
        Ok(())
    }

    /// Edits the gross amount and fees, shifting the unallocated pool by
    /// the resulting total delta. Returns the delta for the adjustment
    /// ledger row.
    pub fn apply_amounts(
        &mut self,
        amount: Decimal,
        processing_fees: Decimal,
    ) -> Result<Decimal, EngineError> {
        self.ensure_active()?;
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(amount));
        }
        if processing_fees < Decimal::ZERO {
            return Err(EngineError::InvalidAmount(processing_fees));
        }
        let new_total = amount - processing_fees;
        if new_total <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(new_total));
        }

        let delta = new_total - self.total_amount;
        // A reduction must come entirely out of the unallocated pool.
        if delta < Decimal::ZERO && -delta > self.unallocated_amount {
            return Err(EngineError::ExceedsUnallocated {
                payment: self.id,
                requested: -delta,
                unallocated: self.unallocated_amount,
            });
        }

        self.amount = amount;
        self.processing_fees = processing_fees;
        self.total_amount = new_total;
        self.unallocated_amount += delta;
        Ok(delta)
    }

    /// Cancels the payment. Only fully-unallocated payments can be
    /// cancelled.
    pub fn cancel(&mut self) -> Result<(), EngineError> {
        self.ensure_active()?;
        if self.unallocated_amount != self.total_amount {
            return Err(EngineError::PaymentHasAllocations(self.id));
        }
        self.status = PaymentStatus::Cancelled;
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), EngineError> {
        match self.status {
            PaymentStatus::Active => Ok(()),
            PaymentStatus::Cancelled => Err(EngineError::PaymentCancelled(self.id)),
        }
    }

    fn ensure_positive(&self, amount: Decimal) -> Result<(), EngineError> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(amount));
        }
        Ok(())
    }
}
