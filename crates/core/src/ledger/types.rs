//! Ledger entry types and the draft constructors for each business event.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use freightbook_shared::types::{Currency, InvoiceId, LedgerEntryId, PartnerId, PaymentId};

use crate::invoice::Invoice;
use crate::payment::Payment;

/// The business event that produced a ledger row.
///
/// A closed enumeration; the set is part of the storage contract and must
/// not grow without a migration of historical rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    /// A payment was recorded.
    Payment,
    /// An invoice was recorded.
    Invoice,
    /// Part of a payment was applied to an invoice (or that application was
    /// reversed).
    Allocation,
    /// One leg of a cross-currency conversion pair.
    Conversion,
    /// A payment's amounts were edited; the row carries the delta.
    PaymentAdjustment,
    /// A payment was cancelled; the row negates the original.
    PaymentReversal,
    /// An invoice's total was edited; the row carries the delta.
    InvoiceAdjustment,
    /// An invoice was cancelled; the row negates the original.
    InvoiceReversal,
}

impl std::fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Payment => "payment",
            Self::Invoice => "invoice",
            Self::Allocation => "allocation",
            Self::Conversion => "conversion",
            Self::PaymentAdjustment => "payment_adjustment",
            Self::PaymentReversal => "payment_reversal",
            Self::InvoiceAdjustment => "invoice_adjustment",
            Self::InvoiceReversal => "invoice_reversal",
        };
        write!(f, "{name}")
    }
}

/// A single row in the movement ledger.
///
/// Rows are immutable once written: there is no update or delete anywhere
/// in the engine or the store contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Row id.
    pub id: LedgerEntryId,
    /// The partner whose ledger this movement belongs to.
    pub partner_id: PartnerId,
    /// Currency of `amount`.
    pub currency: Currency,
    /// Signed movement in `currency`.
    pub amount: Decimal,
    /// `amount` converted to the base currency as of `transaction_date`.
    pub base_amount: Decimal,
    /// The business event that produced this row.
    pub reference_type: ReferenceType,
    /// The payment this row is keyed to, if any.
    pub payment_id: Option<PaymentId>,
    /// The invoice this row is keyed to, if any.
    pub invoice_id: Option<InvoiceId>,
    /// The business date of the movement.
    pub transaction_date: NaiveDate,
}

/// A ledger row before the writer resolves its base-currency amount.
///
/// Construct drafts through the named constructors so the reference type
/// and sign convention of each business event stay in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerDraft {
    /// The partner whose ledger the movement belongs to.
    pub partner_id: PartnerId,
    /// Currency of `amount`.
    pub currency: Currency,
    /// Signed movement in `currency`.
    pub amount: Decimal,
    /// The business event producing the row.
    pub reference_type: ReferenceType,
    /// The payment the row is keyed to, if any.
    pub payment_id: Option<PaymentId>,
    /// The invoice the row is keyed to, if any.
    pub invoice_id: Option<InvoiceId>,
    /// The business date of the movement.
    pub transaction_date: NaiveDate,
}

impl LedgerDraft {
    /// Row for a newly recorded payment: `+total_amount`.
    #[must_use]
    pub fn for_payment(payment: &Payment) -> Self {
        Self {
            partner_id: payment.partner_id,
            currency: payment.currency,
            amount: payment.total_amount,
            reference_type: ReferenceType::Payment,
            payment_id: Some(payment.id),
            invoice_id: None,
            transaction_date: payment.payment_date,
        }
    }

    /// Row for an edited payment: the signed total-amount delta.
    #[must_use]
    pub fn for_payment_adjustment(payment: &Payment, delta: Decimal) -> Self {
        Self {
            amount: delta,
            reference_type: ReferenceType::PaymentAdjustment,
            ..Self::for_payment(payment)
        }
    }

    /// Row for a cancelled payment: `-total_amount`.
    #[must_use]
    pub fn for_payment_reversal(payment: &Payment) -> Self {
        Self {
            amount: -payment.total_amount,
            reference_type: ReferenceType::PaymentReversal,
            ..Self::for_payment(payment)
        }
    }

    /// Row for a newly recorded invoice: invoices post as `-total_amount`.
    #[must_use]
    pub fn for_invoice(invoice: &Invoice, on: NaiveDate) -> Self {
        Self {
            partner_id: invoice.partner_id,
            currency: invoice.currency,
            amount: -invoice.total_amount,
            reference_type: ReferenceType::Invoice,
            payment_id: None,
            invoice_id: Some(invoice.id),
            transaction_date: on,
        }
    }

    /// Row for an edited invoice total: the delta, negated like the
    /// original invoice row.
    #[must_use]
    pub fn for_invoice_adjustment(invoice: &Invoice, delta: Decimal, on: NaiveDate) -> Self {
        Self {
            amount: -delta,
            reference_type: ReferenceType::InvoiceAdjustment,
            ..Self::for_invoice(invoice, on)
        }
    }

    /// Row for a cancelled invoice: `+total_amount`, negating the original.
    #[must_use]
    pub fn for_invoice_reversal(invoice: &Invoice, on: NaiveDate) -> Self {
        Self {
            amount: invoice.total_amount,
            reference_type: ReferenceType::InvoiceReversal,
            ..Self::for_invoice(invoice, on)
        }
    }

    /// Allocation row, keyed to both the payment and the invoice. `amount`
    /// is the signed invoice-side amount (negated again on deallocation).
    #[must_use]
    pub fn for_allocation(
        partner_id: PartnerId,
        currency: Currency,
        amount: Decimal,
        payment_id: PaymentId,
        invoice_id: InvoiceId,
        on: NaiveDate,
    ) -> Self {
        Self {
            partner_id,
            currency,
            amount,
            reference_type: ReferenceType::Allocation,
            payment_id: Some(payment_id),
            invoice_id: Some(invoice_id),
            transaction_date: on,
        }
    }

    /// One leg of a cross-currency conversion pair, keyed to the payment
    /// only.
    #[must_use]
    pub fn for_conversion_leg(
        partner_id: PartnerId,
        currency: Currency,
        amount: Decimal,
        payment_id: PaymentId,
        on: NaiveDate,
    ) -> Self {
        Self {
            partner_id,
            currency,
            amount,
            reference_type: ReferenceType::Conversion,
            payment_id: Some(payment_id),
            invoice_id: None,
            transaction_date: on,
        }
    }

    /// Finishes the draft into an entry once the base amount is known.
    #[must_use]
    pub fn into_entry(self, base_amount: Decimal) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::new(),
            partner_id: self.partner_id,
            currency: self.currency,
            amount: self.amount,
            base_amount,
            reference_type: self.reference_type,
            payment_id: self.payment_id,
            invoice_id: self.invoice_id,
            transaction_date: self.transaction_date,
        }
    }
}
