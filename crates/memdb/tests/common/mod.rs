//! Shared fixture wiring the engine to the in-memory store.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use freightbook_core::allocation::AllocationService;
use freightbook_core::balance::PartnerBalanceService;
use freightbook_core::currency::{ExchangeRates, RateSource};
use freightbook_core::invoice::{Invoice, InvoiceDirection, InvoiceService, NewInvoice};
use freightbook_core::ledger::LedgerWriter;
use freightbook_core::payment::{NewPayment, Payment, PaymentService};
use freightbook_core::store::{FinanceStore, PartnerDirectory};
use freightbook_memdb::{MemoryRateSource, MemoryStore, StaticPartnerDirectory};
use freightbook_shared::types::{Currency, PartnerId};

/// The business date all fixtures use.
pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

/// Quotes loaded for [`day`]: USD→RUB 90, EUR→RUB 99 (so EUR→USD = 1.10).
pub fn default_quotes() -> Vec<(Currency, NaiveDate, Decimal)> {
    vec![
        (Currency::Usd, day(), dec!(90)),
        (Currency::Eur, day(), dec!(99)),
    ]
}

/// Everything a test needs, wired over one in-memory store with RUB as the
/// base currency.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub source: Arc<MemoryRateSource>,
    pub directory: Arc<StaticPartnerDirectory>,
    pub rates: ExchangeRates,
    pub payments: PaymentService,
    pub invoices: InvoiceService,
    pub allocations: AllocationService,
    pub balances: PartnerBalanceService,
    pub partner: PartnerId,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_quotes(default_quotes())
    }

    pub fn with_quotes(quotes: Vec<(Currency, NaiveDate, Decimal)>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(MemoryRateSource::with_quotes(&quotes));
        let partner = PartnerId::new();
        let directory = Arc::new(StaticPartnerDirectory::with_partners(&[partner]));

        let dyn_store: Arc<dyn FinanceStore> = store.clone();
        let dyn_source: Arc<dyn RateSource> = source.clone();
        let dyn_directory: Arc<dyn PartnerDirectory> = directory.clone();

        let rates = ExchangeRates::new(dyn_source, Currency::Rub);
        let writer = LedgerWriter::new(rates.clone());

        Self {
            payments: PaymentService::new(dyn_store.clone(), writer.clone()),
            invoices: InvoiceService::new(dyn_store.clone(), writer),
            allocations: AllocationService::new(
                dyn_store.clone(),
                dyn_directory,
                rates.clone(),
            ),
            balances: PartnerBalanceService::new(dyn_store, rates.clone()),
            store,
            source,
            directory,
            rates,
            partner,
        }
    }

    /// Records a payment for the fixture partner, no fees, dated [`day`].
    pub async fn payment(&self, currency: Currency, amount: Decimal) -> Payment {
        self.payments
            .create(NewPayment {
                partner_id: self.partner,
                payment_date: day(),
                currency,
                amount,
                processing_fees: dec!(0),
                commentary: None,
            })
            .await
            .expect("payment fixture")
    }

    /// Records a receivable invoice for the fixture partner, issued [`day`].
    pub async fn invoice(&self, currency: Currency, total: Decimal) -> Invoice {
        self.invoice_with(InvoiceDirection::Receivable, currency, total, Some(day()))
            .await
    }

    pub async fn invoice_with(
        &self,
        direction: InvoiceDirection,
        currency: Currency,
        total: Decimal,
        issue_date: Option<NaiveDate>,
    ) -> Invoice {
        self.invoices
            .create(NewInvoice {
                direction,
                partner_id: self.partner,
                currency,
                total_amount: total,
                issue_date,
                due_date: None,
                commentary: None,
            })
            .await
            .expect("invoice fixture")
    }
}
