//! Invoices and the paid-amount balance mutators.

pub mod service;
pub mod types;

pub use service::InvoiceService;
pub use types::{Invoice, InvoiceDirection, InvoiceStatus, NewInvoice};
