//! Store and collaborator contracts consumed by the engine.
//!
//! The engine never talks to a database or a remote service directly; it
//! goes through these traits. Implementations live outside this crate
//! (`freightbook-memdb` provides the in-memory ones used by tests and the
//! demo).
//!
//! Writes are staged on a [`StoreTx`] and applied all-or-nothing at
//! [`StoreTx::commit`]. Each staged payment/invoice carries the version it
//! was read at; commit must reject the whole transaction with
//! [`StoreError::VersionConflict`] if any live version has moved on.
//! Dropping a transaction without committing discards every staged write.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use freightbook_shared::types::{InvoiceId, PartnerId, PaymentId};

use crate::invoice::Invoice;
use crate::ledger::{LedgerEntry, ReferenceType};
use crate::payment::Payment;

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The row's version moved between read and commit.
    #[error("version conflict on {entity} {id}")]
    VersionConflict {
        /// Entity name, e.g. `"payment"`.
        entity: &'static str,
        /// The conflicting row's id.
        id: Uuid,
    },

    /// Backend failure (I/O, connectivity, corruption).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Persistent store for payments, invoices, and the movement ledger.
///
/// The read methods outside a transaction serve reporting; they take no
/// locks and observe the latest committed state.
#[async_trait]
pub trait FinanceStore: Send + Sync {
    /// Opens a new transaction. Reads through a transaction always observe
    /// the latest committed state (no snapshot staleness across retries).
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;

    /// Looks up a payment by id.
    async fn payment(&self, id: PaymentId) -> Result<Option<Payment>, StoreError>;

    /// Looks up an invoice by id.
    async fn invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError>;

    /// All payments of a partner, any status.
    async fn payments_by_partner(&self, partner: PartnerId) -> Result<Vec<Payment>, StoreError>;

    /// All invoices of a partner, any status.
    async fn invoices_by_partner(&self, partner: PartnerId) -> Result<Vec<Invoice>, StoreError>;

    /// Ledger entries of a partner, optionally filtered by reference type,
    /// in append order.
    async fn entries_by_partner(
        &self,
        partner: PartnerId,
        reference: Option<ReferenceType>,
    ) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Ledger entries keyed to a payment, optionally filtered by reference
    /// type, in append order.
    async fn entries_by_payment(
        &self,
        payment: PaymentId,
        reference: Option<ReferenceType>,
    ) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Ledger entries keyed to an invoice, optionally filtered by reference
    /// type, in append order.
    async fn entries_by_invoice(
        &self,
        invoice: InvoiceId,
        reference: Option<ReferenceType>,
    ) -> Result<Vec<LedgerEntry>, StoreError>;
}

/// A unit of work against the store.
///
/// Invariant: `Allocation` rows are written exclusively by the allocation
/// engine, which makes [`StoreTx::allocations_between`] the source of truth
/// for how much of a payment is applied to an invoice. Implementations must
/// not synthesize such rows.
#[async_trait]
pub trait StoreTx: Send {
    /// Fresh read of a payment (latest committed state, not a snapshot).
    async fn payment(&mut self, id: PaymentId) -> Result<Option<Payment>, StoreError>;

    /// Fresh read of an invoice.
    async fn invoice(&mut self, id: InvoiceId) -> Result<Option<Invoice>, StoreError>;

    /// All `Allocation` rows for the exact (payment, invoice) pair, in
    /// append order.
    async fn allocations_between(
        &mut self,
        payment: PaymentId,
        invoice: InvoiceId,
    ) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Stages a payment write. The payment's `version` field is the
    /// optimistic token: it must still match the live row at commit.
    async fn stage_payment(&mut self, payment: Payment) -> Result<(), StoreError>;

    /// Stages an invoice write, with the same version-token contract.
    async fn stage_invoice(&mut self, invoice: Invoice) -> Result<(), StoreError>;

    /// Stages an append-only ledger entry. Entries are immutable; there is
    /// deliberately no update or delete counterpart.
    async fn stage_entry(&mut self, entry: LedgerEntry) -> Result<(), StoreError>;

    /// Applies every staged write atomically, bumping version tokens.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Remote partner directory (wrapped by its own retry/circuit-breaker
/// policy, opaque to the engine).
#[async_trait]
pub trait PartnerDirectory: Send + Sync {
    /// Whether the partner exists.
    async fn exists(&self, partner: PartnerId) -> Result<bool, DirectoryError>;
}

/// Failure talking to the partner directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory could not be reached within its own deadline.
    #[error("partner directory unavailable: {0}")]
    Unavailable(String),
}
