//! Engine error types for validation, state, and concurrency failures.
//!
//! Every failure a caller can see is a variant here. Internal bounded
//! retries are invisible to callers except as latency; nothing is swallowed.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use freightbook_shared::types::{Currency, InvoiceId, PartnerId, PaymentId};

use crate::store::StoreError;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    // ========== Not Found ==========
    /// Payment not found.
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// Invoice not found.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    /// Partner not found in the partner directory.
    #[error("Partner not found: {0}")]
    PartnerNotFound(PartnerId),

    // ========== Validation Errors ==========
    /// Payment and invoice belong to different partners.
    #[error("Payment belongs to partner {payment_partner}, invoice to {invoice_partner}")]
    ClientMismatch {
        /// Partner owning the payment.
        payment_partner: PartnerId,
        /// Partner owning the invoice.
        invoice_partner: PartnerId,
    },

    /// Amount is below the minimum allocatable amount.
    #[error("Amount {amount} is below the minimum of {minimum}")]
    BelowMinimum {
        /// The offending amount.
        amount: Decimal,
        /// The minimum accepted amount.
        minimum: Decimal,
    },

    /// Amount must be strictly positive.
    #[error("Amount must be strictly positive, got {0}")]
    InvalidAmount(Decimal),

    /// Two sides of an operation carry incompatible currencies, e.g.
    /// conversion legs drafted in the same currency.
    #[error("Currency mismatch: {expected} vs {actual}")]
    CurrencyMismatch {
        /// The currency of the first side.
        expected: Currency,
        /// The currency of the second side.
        actual: Currency,
    },

    /// Allocation request exceeds the payment's unallocated amount.
    #[error("Requested {requested} exceeds unallocated amount {unallocated} of payment {payment}")]
    ExceedsUnallocated {
        /// The payment being allocated from.
        payment: PaymentId,
        /// The requested amount.
        requested: Decimal,
        /// The unallocated amount currently available.
        unallocated: Decimal,
    },

    /// Payment request exceeds the invoice's outstanding balance.
    #[error("Requested {requested} exceeds outstanding balance {outstanding} of invoice {invoice}")]
    ExceedsOutstanding {
        /// The invoice being paid.
        invoice: InvoiceId,
        /// The requested amount.
        requested: Decimal,
        /// The outstanding balance currently open.
        outstanding: Decimal,
    },

    /// Deallocation exceeds what was previously allocated.
    #[error("Cannot reverse {requested}: only {allocated} was allocated")]
    NoExistingAllocation {
        /// The amount the caller tried to reverse.
        requested: Decimal,
        /// The amount actually allocated so far.
        allocated: Decimal,
    },

    // ========== State Conflicts ==========
    /// The payment is cancelled and cannot be mutated.
    #[error("Payment {0} is cancelled")]
    PaymentCancelled(PaymentId),

    /// The invoice is cancelled and cannot be mutated.
    #[error("Invoice {0} is cancelled")]
    InvoiceCancelled(InvoiceId),

    /// Cancellation is blocked because part of the payment is allocated.
    #[error("Payment {0} has allocations and cannot be cancelled")]
    PaymentHasAllocations(PaymentId),

    /// Cancellation is blocked because the invoice has payment history.
    #[error("Invoice {0} has recorded payments and cannot be cancelled")]
    InvoiceHasPayments(InvoiceId),

    // ========== Concurrency ==========
    /// Concurrent modification detected after exhausting the bounded retry.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== External Collaborators ==========
    /// No exchange rate could be obtained for the currency and date.
    #[error("No exchange rate available for {currency} on {date}")]
    RateUnavailable {
        /// The foreign currency whose base rate is missing.
        currency: Currency,
        /// The date for which the rate was requested.
        date: NaiveDate,
    },

    /// The partner directory could not be reached.
    #[error("Partner directory unavailable: {0}")]
    PartnerDirectoryUnavailable(String),

    /// Storage backend failure.
    #[error("Store error: {0}")]
    Store(String),
}

/// Coarse error classification for the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced entity does not exist.
    NotFound,
    /// Caller-correctable input error.
    Validation,
    /// The entity's lifecycle state forbids the operation.
    StateConflict,
    /// Lost an optimistic-concurrency race; the whole operation may be retried.
    Concurrency,
    /// An external collaborator failed; retry later may succeed.
    External,
    /// Infrastructure failure.
    Internal,
}

impl EngineError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::InvoiceNotFound(_) => "INVOICE_NOT_FOUND",
            Self::PartnerNotFound(_) => "PARTNER_NOT_FOUND",
            Self::ClientMismatch { .. } => "CLIENT_MISMATCH",
            Self::BelowMinimum { .. } => "BELOW_MINIMUM",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::ExceedsUnallocated { .. } => "EXCEEDS_UNALLOCATED",
            Self::ExceedsOutstanding { .. } => "EXCEEDS_OUTSTANDING",
            Self::NoExistingAllocation { .. } => "NO_EXISTING_ALLOCATION",
            Self::PaymentCancelled(_) => "PAYMENT_CANCELLED",
            Self::InvoiceCancelled(_) => "INVOICE_CANCELLED",
            Self::PaymentHasAllocations(_) => "PAYMENT_HAS_ALLOCATIONS",
            Self::InvoiceHasPayments(_) => "INVOICE_HAS_PAYMENTS",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::RateUnavailable { .. } => "RATE_UNAVAILABLE",
            Self::PartnerDirectoryUnavailable(_) => "PARTNER_DIRECTORY_UNAVAILABLE",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns the coarse classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PaymentNotFound(_) | Self::InvoiceNotFound(_) | Self::PartnerNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::ClientMismatch { .. }
            | Self::BelowMinimum { .. }
            | Self::InvalidAmount(_)
            | Self::CurrencyMismatch { .. }
            | Self::ExceedsUnallocated { .. }
            | Self::ExceedsOutstanding { .. }
            | Self::NoExistingAllocation { .. } => ErrorKind::Validation,
            Self::PaymentCancelled(_)
            | Self::InvoiceCancelled(_)
            | Self::PaymentHasAllocations(_)
            | Self::InvoiceHasPayments(_) => ErrorKind::StateConflict,
            Self::ConcurrentModification => ErrorKind::Concurrency,
            Self::RateUnavailable { .. } | Self::PartnerDirectoryUnavailable(_) => {
                ErrorKind::External
            }
            Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if retrying the whole operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Concurrency | ErrorKind::External | ErrorKind::Internal
        )
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            // A conflict that reaches the caller means the bounded retry is
            // already exhausted.
            StoreError::VersionConflict { .. } => Self::ConcurrentModification,
            StoreError::Backend(msg) => Self::Store(msg),
        }
    }
}
