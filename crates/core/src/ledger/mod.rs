//! Append-only movement ledger.
//!
//! Every state change to a payment or invoice balance is accompanied by one
//! or more immutable ledger rows written in the same transaction:
//! - Entry and draft types with the closed reference-type enumeration
//! - The ledger writer, which resolves base-currency amounts on append

pub mod types;
pub mod writer;

pub use types::{LedgerDraft, LedgerEntry, ReferenceType};
pub use writer::LedgerWriter;
