//! Payments and the unallocated-amount balance mutators.

pub mod service;
pub mod types;

#[cfg(test)]
mod props;

pub use service::PaymentService;
pub use types::{NewPayment, Payment, PaymentStatus};
