//! Partner balance report types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use freightbook_shared::types::{Currency, PartnerId};

/// Per-currency balances of one partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartnerBalanceRow {
    /// The currency of this row's native amounts.
    pub currency: Currency,
    /// Sum of unallocated amounts over the partner's active payments.
    pub leftover: Decimal,
    /// Outstanding balance of invoices with no payment at all.
    pub unpaid: Decimal,
    /// Outstanding balance of invoices that are partially paid.
    pub partially_paid: Decimal,
    /// Total outstanding balance (`unpaid + partially_paid`).
    pub outstanding: Decimal,
    /// `leftover` converted to the base currency at the report date.
    pub leftover_base: Decimal,
    /// `outstanding` converted to the base currency at the report date.
    pub outstanding_base: Decimal,
}

/// Balance report of one partner at a date.
///
/// Cross-currency totals are only meaningful in base currency, so only the
/// base-converted sums are totalled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartnerBalanceReport {
    /// The partner reported on.
    pub partner_id: PartnerId,
    /// The date the conversion rates were taken at.
    pub as_of: NaiveDate,
    /// One row per currency with activity; all-zero currencies are
    /// omitted.
    pub rows: Vec<PartnerBalanceRow>,
    /// Sum of `leftover_base` over all rows.
    pub total_leftover_base: Decimal,
    /// Sum of `outstanding_base` over all rows.
    pub total_outstanding_base: Decimal,
}
