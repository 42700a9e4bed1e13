//! Read-only aggregation of a partner's leftover and outstanding amounts.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use freightbook_shared::types::{Currency, PartnerId};

use super::types::{PartnerBalanceReport, PartnerBalanceRow};
use crate::currency::ExchangeRates;
use crate::error::EngineError;
use crate::invoice::InvoiceStatus;
use crate::payment::PaymentStatus;
use crate::store::FinanceStore;

/// Accumulated native-currency sums before conversion.
#[derive(Debug, Default, Clone, Copy)]
struct CurrencyTotals {
    leftover: Decimal,
    unpaid: Decimal,
    partially_paid: Decimal,
}

impl CurrencyTotals {
    fn outstanding(self) -> Decimal {
        self.unpaid + self.partially_paid
    }

    fn has_activity(self) -> bool {
        !self.leftover.is_zero() || !self.outstanding().is_zero()
    }
}

/// Builds per-partner balance reports.
///
/// Pure read: no transaction, no locks. The snapshot is whatever the store
/// returns at call time.
#[derive(Clone)]
pub struct PartnerBalanceService {
    store: Arc<dyn FinanceStore>,
    rates: ExchangeRates,
}

impl PartnerBalanceService {
    /// Creates the service.
    pub fn new(store: Arc<dyn FinanceStore>, rates: ExchangeRates) -> Self {
        Self { store, rates }
    }

    /// The partner's balances per currency, normalized to base currency at
    /// `as_of`.
    pub async fn balance(
        &self,
        partner: PartnerId,
        as_of: NaiveDate,
    ) -> Result<PartnerBalanceReport, EngineError> {
        let payments = self.store.payments_by_partner(partner).await?;
        let invoices = self.store.invoices_by_partner(partner).await?;
        debug!(%partner, payments = payments.len(), invoices = invoices.len(),
               "aggregating partner balance");

        let mut totals: HashMap<Currency, CurrencyTotals> = HashMap::new();

        for payment in payments {
            if payment.status != PaymentStatus::Active {
                continue;
            }
            totals.entry(payment.currency).or_default().leftover += payment.unallocated_amount;
        }

        for invoice in invoices {
            if invoice.status == InvoiceStatus::Cancelled {
                continue;
            }
            let entry = totals.entry(invoice.currency).or_default();
            if invoice.paid_amount.is_zero() {
                entry.unpaid += invoice.outstanding_balance();
            } else if !invoice.is_fully_paid() {
                entry.partially_paid += invoice.outstanding_balance();
            }
        }

        let base = self.rates.base_currency();
        let mut rows = Vec::new();
        let mut total_leftover_base = Decimal::ZERO;
        let mut total_outstanding_base = Decimal::ZERO;

        // Iterate the closed currency set for a stable row order.
        for currency in Currency::ALL {
            let Some(sums) = totals.get(&currency).copied() else {
                continue;
            };
            if !sums.has_activity() {
                continue;
            }

            let outstanding = sums.outstanding();
            let (leftover_base, outstanding_base) = if currency == base {
                (sums.leftover, outstanding)
            } else {
                (
                    self.rates.convert(currency, base, sums.leftover, as_of).await?,
                    self.rates.convert(currency, base, outstanding, as_of).await?,
                )
            };

            total_leftover_base += leftover_base;
            total_outstanding_base += outstanding_base;
            rows.push(PartnerBalanceRow {
                currency,
                leftover: sums.leftover,
                unpaid: sums.unpaid,
                partially_paid: sums.partially_paid,
                outstanding,
                leftover_base,
                outstanding_base,
            });
        }

        Ok(PartnerBalanceReport {
            partner_id: partner,
            as_of,
            rows,
            total_leftover_base,
            total_outstanding_base,
        })
    }
}
