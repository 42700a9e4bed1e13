//! In-memory foreign→base quote table with a refreshable feed.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use freightbook_core::currency::{RateSource, RateSourceError};
use freightbook_shared::types::Currency;

type QuoteKey = (Currency, NaiveDate);

/// In-memory [`RateSource`].
///
/// `stored` quotes answer immediately; `feed` quotes stand in for the
/// upstream provider and only become visible after [`RateSource::refresh`]
/// runs for their date — mirroring how the production source backfills a
/// date on demand.
#[derive(Debug, Default)]
pub struct MemoryRateSource {
    stored: RwLock<HashMap<QuoteKey, Decimal>>,
    feed: RwLock<HashMap<QuoteKey, Decimal>>,
    refresh_count: RwLock<u32>,
}

impl MemoryRateSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source pre-loaded with stored foreign→base quotes.
    #[must_use]
    pub fn with_quotes(quotes: &[(Currency, NaiveDate, Decimal)]) -> Self {
        let source = Self::new();
        for (currency, date, rate) in quotes {
            source.store_quote(*currency, *date, *rate);
        }
        source
    }

    /// Inserts a stored quote, visible immediately.
    pub fn store_quote(&self, currency: Currency, on: NaiveDate, rate: Decimal) {
        if let Ok(mut stored) = self.stored.write() {
            stored.insert((currency, on), rate);
        }
    }

    /// Inserts a feed quote, visible only after a refresh for its date.
    pub fn feed_quote(&self, currency: Currency, on: NaiveDate, rate: Decimal) {
        if let Ok(mut feed) = self.feed.write() {
            feed.insert((currency, on), rate);
        }
    }

    /// How many times `refresh` ran.
    #[must_use]
    pub fn refresh_count(&self) -> u32 {
        self.refresh_count.read().map(|n| *n).unwrap_or(0)
    }
}

#[async_trait]
impl RateSource for MemoryRateSource {
    async fn base_rate(
        &self,
        currency: Currency,
        on: NaiveDate,
    ) -> Result<Option<Decimal>, RateSourceError> {
        let stored = self
            .stored
            .read()
            .map_err(|_| RateSourceError::Unavailable("quote table lock poisoned".into()))?;
        Ok(stored.get(&(currency, on)).copied())
    }

    async fn refresh(&self, on: NaiveDate) -> Result<(), RateSourceError> {
        let feed = self
            .feed
            .read()
            .map_err(|_| RateSourceError::Unavailable("feed lock poisoned".into()))?;
        let fresh: Vec<(QuoteKey, Decimal)> = feed
            .iter()
            .filter(|((_, date), _)| *date == on)
            .map(|(key, rate)| (*key, *rate))
            .collect();
        drop(feed);

        let mut stored = self
            .stored
            .write()
            .map_err(|_| RateSourceError::Unavailable("quote table lock poisoned".into()))?;
        for (key, rate) in fresh {
            debug!(currency = %key.0, date = %key.1, %rate, "loaded quote from feed");
            stored.insert(key, rate);
        }
        if let Ok(mut count) = self.refresh_count.write() {
            *count += 1;
        }
        Ok(())
    }
}
