//! Versioned in-memory store with commit-time optimistic-lock validation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use freightbook_core::invoice::Invoice;
use freightbook_core::ledger::{LedgerEntry, ReferenceType};
use freightbook_core::payment::Payment;
use freightbook_core::store::{FinanceStore, StoreError, StoreTx};
use freightbook_shared::types::{InvoiceId, PartnerId, PaymentId};

#[derive(Debug, Default)]
struct State {
    payments: HashMap<PaymentId, Payment>,
    invoices: HashMap<InvoiceId, Invoice>,
    ledger: Vec<LedgerEntry>,
}

/// In-memory [`FinanceStore`].
///
/// Reads observe the latest committed state. Writes are staged on a
/// [`MemoryTx`] and applied under one write guard at commit, after every
/// staged row's version token has been validated — so a transaction either
/// lands completely or not at all, and a lost version race surfaces as
/// [`StoreError::VersionConflict`].
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ledger rows ever written (they are never deleted).
    pub fn ledger_len(&self) -> Result<usize, StoreError> {
        Ok(self.read_state()?.ledger.len())
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("state lock poisoned".into()))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("state lock poisoned".into()))
    }
}

fn matches_reference(entry: &LedgerEntry, reference: Option<ReferenceType>) -> bool {
    reference.is_none_or(|wanted| entry.reference_type == wanted)
}

#[async_trait]
impl FinanceStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        Ok(Box::new(MemoryTx {
            state: Arc::clone(&self.state),
            staged_payments: Vec::new(),
            staged_invoices: Vec::new(),
            staged_entries: Vec::new(),
        }))
    }

    async fn payment(&self, id: PaymentId) -> Result<Option<Payment>, StoreError> {
        Ok(self.read_state()?.payments.get(&id).cloned())
    }

    async fn invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        Ok(self.read_state()?.invoices.get(&id).cloned())
    }

    async fn payments_by_partner(&self, partner: PartnerId) -> Result<Vec<Payment>, StoreError> {
        Ok(self
            .read_state()?
            .payments
            .values()
            .filter(|p| p.partner_id == partner)
            .cloned()
            .collect())
    }

    async fn invoices_by_partner(&self, partner: PartnerId) -> Result<Vec<Invoice>, StoreError> {
        Ok(self
            .read_state()?
            .invoices
            .values()
            .filter(|i| i.partner_id == partner)
            .cloned()
            .collect())
    }

    async fn entries_by_partner(
        &self,
        partner: PartnerId,
        reference: Option<ReferenceType>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .read_state()?
            .ledger
            .iter()
            .filter(|e| e.partner_id == partner && matches_reference(e, reference))
            .cloned()
            .collect())
    }

    async fn entries_by_payment(
        &self,
        payment: PaymentId,
        reference: Option<ReferenceType>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .read_state()?
            .ledger
            .iter()
            .filter(|e| e.payment_id == Some(payment) && matches_reference(e, reference))
            .cloned()
            .collect())
    }

    async fn entries_by_invoice(
        &self,
        invoice: InvoiceId,
        reference: Option<ReferenceType>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .read_state()?
            .ledger
            .iter()
            .filter(|e| e.invoice_id == Some(invoice) && matches_reference(e, reference))
            .cloned()
            .collect())
    }
}

/// A unit of work against [`MemoryStore`].
///
/// Reads go straight to the live committed state; staged writes are not
/// visible until commit. Dropping the transaction discards them.
pub struct MemoryTx {
    state: Arc<RwLock<State>>,
    staged_payments: Vec<Payment>,
    staged_invoices: Vec<Invoice>,
    staged_entries: Vec<LedgerEntry>,
}

impl MemoryTx {
    fn read_state(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("state lock poisoned".into()))
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn payment(&mut self, id: PaymentId) -> Result<Option<Payment>, StoreError> {
        Ok(self.read_state()?.payments.get(&id).cloned())
    }

    async fn invoice(&mut self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        Ok(self.read_state()?.invoices.get(&id).cloned())
    }

    async fn allocations_between(
        &mut self,
        payment: PaymentId,
        invoice: InvoiceId,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .read_state()?
            .ledger
            .iter()
            .filter(|e| {
                e.reference_type == ReferenceType::Allocation
                    && e.payment_id == Some(payment)
                    && e.invoice_id == Some(invoice)
            })
            .cloned()
            .collect())
    }

    async fn stage_payment(&mut self, payment: Payment) -> Result<(), StoreError> {
        // Last write wins if the same row is staged twice.
        self.staged_payments.retain(|p| p.id != payment.id);
        self.staged_payments.push(payment);
        Ok(())
    }

    async fn stage_invoice(&mut self, invoice: Invoice) -> Result<(), StoreError> {
        self.staged_invoices.retain(|i| i.id != invoice.id);
        self.staged_invoices.push(invoice);
        Ok(())
    }

    async fn stage_entry(&mut self, entry: LedgerEntry) -> Result<(), StoreError> {
        self.staged_entries.push(entry);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Backend("state lock poisoned".into()))?;

        // Validate every version token before touching anything.
        for staged in &self.staged_payments {
            if let Some(live) = state.payments.get(&staged.id)
                && live.version != staged.version
            {
                return Err(StoreError::VersionConflict {
                    entity: "payment",
                    id: staged.id.into_inner(),
                });
            }
        }
        for staged in &self.staged_invoices {
            if let Some(live) = state.invoices.get(&staged.id)
                && live.version != staged.version
            {
                return Err(StoreError::VersionConflict {
                    entity: "invoice",
                    id: staged.id.into_inner(),
                });
            }
        }

        debug!(
            payments = self.staged_payments.len(),
            invoices = self.staged_invoices.len(),
            entries = self.staged_entries.len(),
            "committing staged writes"
        );

        for mut staged in self.staged_payments {
            // Existing rows get their token bumped; new rows keep theirs.
            if state.payments.contains_key(&staged.id) {
                staged.version += 1;
            }
            state.payments.insert(staged.id, staged);
        }
        for mut staged in self.staged_invoices {
            if state.invoices.contains_key(&staged.id) {
                staged.version += 1;
            }
            state.invoices.insert(staged.id, staged);
        }
        state.ledger.extend(self.staged_entries);
        Ok(())
    }
}
