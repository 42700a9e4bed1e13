//! Per-partner balance reporting.

pub mod service;
pub mod types;

pub use service::PartnerBalanceService;
pub use types::{PartnerBalanceReport, PartnerBalanceRow};
