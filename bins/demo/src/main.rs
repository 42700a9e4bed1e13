//! Freightbook demo walkthrough.
//!
//! Seeds the in-memory store with a partner, exchange-rate quotes, a
//! payment, and invoices, then runs same- and cross-currency allocations
//! and prints the partner balance report.
//!
//! Usage: cargo run --bin demo

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use freightbook_core::allocation::AllocationService;
use freightbook_core::balance::PartnerBalanceService;
use freightbook_core::currency::{ExchangeRates, RateSource};
use freightbook_core::invoice::{InvoiceDirection, InvoiceService, NewInvoice};
use freightbook_core::ledger::LedgerWriter;
use freightbook_core::payment::{NewPayment, PaymentService};
use freightbook_core::store::{FinanceStore, PartnerDirectory};
use freightbook_memdb::{MemoryRateSource, MemoryStore, StaticPartnerDirectory};
use freightbook_shared::AppConfig;
use freightbook_shared::types::{Currency, PartnerId};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base = config.engine.base_currency;
    let today = NaiveDate::from_ymd_opt(2025, 6, 2).expect("valid date");

    // Wire the engine over the in-memory store.
    let store: Arc<dyn FinanceStore> = Arc::new(MemoryStore::new());
    let source = Arc::new(MemoryRateSource::new());
    let partner = PartnerId::new();
    let directory: Arc<dyn PartnerDirectory> =
        Arc::new(StaticPartnerDirectory::with_partners(&[partner]));

    // USD→RUB 90 is known up front; EUR→RUB 99 arrives only when the
    // source is refreshed, the way the nightly rate scraper would.
    source.store_quote(Currency::Usd, today, dec!(90));
    source.feed_quote(Currency::Eur, today, dec!(99));

    let rate_source: Arc<dyn RateSource> = source;
    let rates = ExchangeRates::new(rate_source, base);
    let writer = LedgerWriter::new(rates.clone());
    let payments = PaymentService::new(store.clone(), writer.clone());
    let invoices = InvoiceService::new(store.clone(), writer);
    let allocations = AllocationService::new(store.clone(), directory, rates.clone());
    let balances = PartnerBalanceService::new(store.clone(), rates);

    info!(%partner, %base, "seeded partner and quotes");

    // A 100 EUR payment against a 300 USD invoice and a 5000 RUB invoice.
    let payment = payments
        .create(NewPayment {
            partner_id: partner,
            payment_date: today,
            currency: Currency::Eur,
            amount: dec!(100),
            processing_fees: dec!(0),
            commentary: Some("prepayment for freight".into()),
        })
        .await?;
    let usd_invoice = invoices
        .create(NewInvoice {
            direction: InvoiceDirection::Receivable,
            partner_id: partner,
            currency: Currency::Usd,
            total_amount: dec!(300),
            issue_date: Some(today),
            due_date: today.succ_opt(),
            commentary: Some("ocean freight leg".into()),
        })
        .await?;
    let rub_invoice = invoices
        .create(NewInvoice {
            direction: InvoiceDirection::Receivable,
            partner_id: partner,
            currency: Currency::Rub,
            total_amount: dec!(5000),
            issue_date: Some(today),
            due_date: None,
            commentary: Some("customs handling".into()),
        })
        .await?;

    // Cross-currency: 50 EUR lands on the USD invoice as 55.00 USD, with
    // two conversion legs plus the allocation row in the ledger.
    allocations
        .allocate(payment.id, usd_invoice.id, dec!(50))
        .await?;
    // Same currency pair after conversion: 40 EUR onto the RUB invoice.
    allocations
        .allocate(payment.id, rub_invoice.id, dec!(40))
        .await?;
    // Change of plan: 10 EUR come back off the USD invoice.
    allocations
        .deallocate(payment.id, usd_invoice.id, dec!(10))
        .await?;

    let pay = payments.find(payment.id).await?;
    let usd_inv = invoices.find(usd_invoice.id).await?;
    let rub_inv = invoices.find(rub_invoice.id).await?;
    info!(
        unallocated = %pay.unallocated_amount,
        usd_paid = %usd_inv.paid_amount,
        rub_paid = %rub_inv.paid_amount,
        "balances after allocation"
    );

    let report = balances.balance(partner, today).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
