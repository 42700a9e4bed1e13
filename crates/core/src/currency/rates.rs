//! Exchange-rate lookup with derivation and on-demand refresh.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use freightbook_shared::types::Currency;

use super::convert::{convert_amount, cross_rate, invert_rate};
use crate::error::EngineError;

/// External source of foreign→base exchange-rate quotes.
///
/// Only foreign→base pairs exist upstream; [`ExchangeRates`] derives every
/// other pair. `refresh` asks the source to (re)load quotes for a date —
/// in production that is the scheduled scraper run on demand; in tests it
/// promotes pre-seeded quotes.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// The stored foreign→base quote for the date, if any.
    async fn base_rate(
        &self,
        currency: Currency,
        on: NaiveDate,
    ) -> Result<Option<Decimal>, RateSourceError>;

    /// Loads quotes for the date into the source.
    async fn refresh(&self, on: NaiveDate) -> Result<(), RateSourceError>;
}

/// Failure talking to the rate source.
#[derive(Debug, Error)]
pub enum RateSourceError {
    /// The source could not be reached or refused the request.
    #[error("rate source unavailable: {0}")]
    Unavailable(String),
}

/// Exchange-rate service: derivation plus bounded refresh-and-retry.
///
/// Derivation rules, given base currency B:
/// - X→X is 1
/// - X→B is the stored quote
/// - B→X is the inverse of the stored X→B quote
/// - X→Y is (X→B) / (Y→B)
#[derive(Clone)]
pub struct ExchangeRates {
    source: Arc<dyn RateSource>,
    base: Currency,
}

impl ExchangeRates {
    /// Creates the service over a rate source with the given base currency.
    pub fn new(source: Arc<dyn RateSource>, base: Currency) -> Self {
        Self { source, base }
    }

    /// The base/reporting currency.
    #[must_use]
    pub fn base_currency(&self) -> Currency {
        self.base
    }

    /// The exchange rate between any two currencies on a date.
    pub async fn rate(
        &self,
        from: Currency,
        to: Currency,
        on: NaiveDate,
    ) -> Result<Decimal, EngineError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        if from == self.base {
            return Ok(invert_rate(self.foreign_base_rate(to, on).await?));
        }
        if to == self.base {
            return self.foreign_base_rate(from, on).await;
        }
        let from_base = self.foreign_base_rate(from, on).await?;
        let to_base = self.foreign_base_rate(to, on).await?;
        Ok(cross_rate(from_base, to_base))
    }

    /// Converts an amount between two currencies at the date's rate,
    /// rounded to 2 decimal places.
    pub async fn convert(
        &self,
        from: Currency,
        to: Currency,
        amount: Decimal,
        on: NaiveDate,
    ) -> Result<Decimal, EngineError> {
        let rate = self.rate(from, to, on).await?;
        Ok(convert_amount(amount, rate))
    }

    /// Fetches a foreign→base quote, refreshing the source once if the date
    /// has no quote yet, then failing with `RateUnavailable`.
    async fn foreign_base_rate(
        &self,
        currency: Currency,
        on: NaiveDate,
    ) -> Result<Decimal, EngineError> {
        if let Some(rate) = self.stored_rate(currency, on).await? {
            return Ok(rate);
        }

        debug!(%currency, date = %on, "no stored rate, refreshing source");
        self.source
            .refresh(on)
            .await
            .map_err(|err| self.unavailable(currency, on, &err))?;

        match self.stored_rate(currency, on).await? {
            Some(rate) => Ok(rate),
            None => {
                warn!(%currency, date = %on, "rate still missing after refresh");
                Err(EngineError::RateUnavailable { currency, date: on })
            }
        }
    }

    /// Reads a stored quote, treating non-positive quotes as absent.
    async fn stored_rate(
        &self,
        currency: Currency,
        on: NaiveDate,
    ) -> Result<Option<Decimal>, EngineError> {
        let quote = self
            .source
            .base_rate(currency, on)
            .await
            .map_err(|err| self.unavailable(currency, on, &err))?;
        match quote {
            Some(rate) if rate > Decimal::ZERO => Ok(Some(rate)),
            Some(rate) => {
                warn!(%currency, date = %on, %rate, "ignoring non-positive quote");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn unavailable(
        &self,
        currency: Currency,
        on: NaiveDate,
        err: &RateSourceError,
    ) -> EngineError {
        warn!(%currency, date = %on, error = %err, "rate source unavailable");
        EngineError::RateUnavailable { currency, date: on }
    }
}

impl std::fmt::Debug for ExchangeRates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeRates")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}
