//! Invoice domain type and its balance arithmetic.
//!
//! The `paid_amount` field only changes through [`Invoice::record_payment`]
//! and [`Invoice::revert_payment`]; both uphold `0 <= paid <= total`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use freightbook_shared::types::{Currency, InvoiceId, PartnerId};

use crate::error::EngineError;

/// Which way the money flows for this invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceDirection {
    /// The partner owes us (accounts receivable).
    Receivable,
    /// We owe the partner (accounts payable).
    Payable,
}

impl InvoiceDirection {
    /// The sign applied to ledger postings: receivables post positive
    /// inflows, payables negative.
    #[must_use]
    pub fn sign(self) -> Decimal {
        match self {
            Self::Receivable => Decimal::ONE,
            Self::Payable => Decimal::NEGATIVE_ONE,
        }
    }
}

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// The invoice is open for payment.
    Issued,
    /// The invoice was cancelled; terminal.
    Cancelled,
}

/// Input for recording a new invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    /// Flow direction.
    pub direction: InvoiceDirection,
    /// Owning partner.
    pub partner_id: PartnerId,
    /// Currency of the invoice.
    pub currency: Currency,
    /// Invoiced amount.
    pub total_amount: Decimal,
    /// Date the invoice was issued, when known.
    pub issue_date: Option<NaiveDate>,
    /// Payment deadline, when agreed.
    pub due_date: Option<NaiveDate>,
    /// Free-form note.
    pub commentary: Option<String>,
}

/// An amount owed to/by a partner, directional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice id.
    pub id: InvoiceId,
    /// Flow direction.
    pub direction: InvoiceDirection,
    /// Owning partner.
    pub partner_id: PartnerId,
    /// Currency of all amounts on this invoice.
    pub currency: Currency,
    /// Invoiced amount.
    pub total_amount: Decimal,
    /// The portion already covered by allocations.
    pub paid_amount: Decimal,
    /// Date the invoice was issued, when known.
    pub issue_date: Option<NaiveDate>,
    /// Payment deadline, when agreed.
    pub due_date: Option<NaiveDate>,
    /// Lifecycle status.
    pub status: InvoiceStatus,
    /// Free-form note.
    pub commentary: Option<String>,
    /// Optimistic-concurrency token, bumped by the store on every commit.
    pub version: u64,
}

impl Invoice {
    /// Records a new, unpaid invoice.
    pub fn record(new: NewInvoice) -> Result<Self, EngineError> {
        if new.total_amount <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(new.total_amount));
        }
        Ok(Self {
            id: InvoiceId::new(),
            direction: new.direction,
            partner_id: new.partner_id,
            currency: new.currency,
            total_amount: new.total_amount,
            paid_amount: Decimal::ZERO,
            issue_date: new.issue_date,
            due_date: new.due_date,
            status: InvoiceStatus::Issued,
            commentary: new.commentary,
            version: 0,
        })
    }

    /// The portion not yet paid.
    #[must_use]
    pub fn outstanding_balance(&self) -> Decimal {
        self.total_amount - self.paid_amount
    }

    /// True once the invoice is fully covered.
    #[must_use]
    pub fn is_fully_paid(&self) -> bool {
        self.paid_amount == self.total_amount
    }

    /// Applies `amount` toward the invoice.
    pub fn record_payment(&mut self, amount: Decimal) -> Result<(), EngineError> {
        self.ensure_positive(amount)?;
        self.ensure_open()?;
        let next = self.paid_amount + amount;
        if next > self.total_amount {
            return Err(EngineError::ExceedsOutstanding {
                invoice: self.id,
                requested: amount,
                outstanding: self.outstanding_balance(),
            });
        }
        self.paid_amount = next;
        Ok(())
    }

    /// Reverses `amount` of previously applied payment.
    pub fn revert_payment(&mut self, amount: Decimal) -> Result<(), EngineError> {
        self.ensure_positive(amount)?;
        self.ensure_open()?;
        if amount > self.paid_amount {
            return Err(EngineError::NoExistingAllocation {
                requested: amount,
                allocated: self.paid_amount,
            });
        }
        self.paid_amount -= amount;
        Ok(())
    }

    /// Edits the invoiced total. Returns the delta for the adjustment
    /// ledger row.
    pub fn apply_total(&mut self, total_amount: Decimal) -> Result<Decimal, EngineError> {
        self.ensure_open()?;
        if total_amount <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(total_amount));
        }
        if total_amount < self.paid_amount {
            return Err(EngineError::ExceedsOutstanding {
                invoice: self.id,
                requested: self.total_amount - total_amount,
                outstanding: self.outstanding_balance(),
            });
        }
        let delta = total_amount - self.total_amount;
        self.total_amount = total_amount;
        Ok(delta)
    }

    /// Cancels the invoice. Only invoices without payment history can be
    /// cancelled.
    pub fn cancel(&mut self) -> Result<(), EngineError> {
        self.ensure_open()?;
        if !self.paid_amount.is_zero() {
            return Err(EngineError::InvoiceHasPayments(self.id));
        }
        self.status = InvoiceStatus::Cancelled;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        match self.status {
            InvoiceStatus::Issued => Ok(()),
            InvoiceStatus::Cancelled => Err(EngineError::InvoiceCancelled(self.id)),
        }
    }

    fn ensure_positive(&self, amount: Decimal) -> Result<(), EngineError> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(amount));
        }
        Ok(())
    }
}
