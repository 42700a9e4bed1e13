//! Exchange-rate derivation and amount conversion.
//!
//! The rate source stores only foreign→base quotes; reciprocal and cross
//! pairs are derived at read time, never stored.

pub mod convert;
pub mod rates;

#[cfg(test)]
mod props;

pub use convert::{convert_amount, cross_rate, invert_rate};
pub use rates::{ExchangeRates, RateSource, RateSourceError};
