// Pricing module - price/dividend data sources with bounded-time fallback

pub mod fallback;
pub mod yahoo;

pub use fallback::StaticSource;
pub use yahoo::YahooSource;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::dividends::DividendRecord;
use crate::error::{IncomeError, Result};

/// Where a price snapshot came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PriceSource {
    Live,
    Fallback,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::Live => "LIVE",
            PriceSource::Fallback => "FALLBACK",
        }
    }
}

/// Quote for the tracked fund
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceSnapshot {
    pub ticker: String,
    pub current_price: Decimal,
    pub previous_close: Decimal,
    pub change: Decimal,
    pub percent_change: Decimal,
    pub day_high: Decimal,
    pub day_low: Decimal,
    pub timestamp: DateTime<Utc>,
    pub source: PriceSource,
}

impl PriceSnapshot {
    /// Build a snapshot, deriving `change` and `percent_change`.
    pub fn new(
        ticker: impl Into<String>,
        current_price: Decimal,
        previous_close: Decimal,
        day_high: Decimal,
        day_low: Decimal,
        timestamp: DateTime<Utc>,
        source: PriceSource,
    ) -> Self {
        let change = current_price - previous_close;
        let percent_change = if previous_close > Decimal::ZERO {
            change / previous_close * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
        Self {
            ticker: ticker.into(),
            current_price,
            previous_close,
            change,
            percent_change,
            day_high,
            day_low,
            timestamp,
            source,
        }
    }

    /// Flat quote where every field equals `price`.
    pub fn flat(ticker: impl Into<String>, price: Decimal, source: PriceSource) -> Self {
        Self::new(ticker, price, price, price, price, Utc::now(), source)
    }
}

/// Provider of quotes and dividend history.
///
/// Implementations may fail; wrap them in [`FallbackSource`] to get
/// substitute data instead.
pub trait MarketData {
    fn fetch_price(&self) -> impl Future<Output = Result<PriceSnapshot>> + Send;

    /// Dividend history, newest first, one record per month.
    fn fetch_dividend_history(&self) -> impl Future<Output = Result<Vec<DividendRecord>>> + Send;
}

/// Wraps a primary source with a timeout, a last-known-good cache and a
/// static table. Never fails.
pub struct FallbackSource<S> {
    primary: S,
    fallback: StaticSource,
    timeout: Duration,
    last_price: Mutex<Option<PriceSnapshot>>,
    last_history: Mutex<Option<Vec<DividendRecord>>>,
}

impl<S: MarketData + Sync> FallbackSource<S> {
    pub fn new(primary: S, fallback: StaticSource, timeout: Duration) -> Self {
        Self {
            primary,
            fallback,
            timeout,
            last_price: Mutex::new(None),
            last_history: Mutex::new(None),
        }
    }

    pub fn primary(&self) -> &S {
        &self.primary
    }

    /// Bound a primary fetch by the configured timeout.
    async fn bounded<T>(&self, what: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(IncomeError::Fetch(format!(
                "{} timed out after {}s",
                what,
                self.timeout.as_secs()
            ))
            .into()),
        }
    }

    pub async fn price_or_fallback(&self) -> PriceSnapshot {
        match self.bounded("price fetch", self.primary.fetch_price()).await {
            Ok(snapshot) => {
                debug!("Live price {} for {}", snapshot.current_price, snapshot.ticker);
                *self.last_price.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(snapshot.clone());
                snapshot
            }
            Err(e) => {
                warn!("Price fetch failed, using fallback: {:#}", e);
                let cached = self
                    .last_price
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                match cached {
                    Some(last) => {
                        info!("Using last known price {} from {}", last.current_price, last.timestamp);
                        PriceSnapshot {
                            source: PriceSource::Fallback,
                            ..last
                        }
                    }
                    None => self.fallback.price_snapshot(),
                }
            }
        }
    }

    pub async fn history_or_fallback(&self) -> Vec<DividendRecord> {
        match self
            .bounded("dividend history fetch", self.primary.fetch_dividend_history())
            .await
        {
            Ok(history) if !history.is_empty() => {
                debug!("Fetched {} dividend records", history.len());
                *self.last_history.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(history.clone());
                history
            }
            Ok(_) => {
                warn!("Provider returned no dividends, using fallback");
                self.cached_history()
            }
            Err(e) => {
                warn!("Dividend history fetch failed, using fallback: {:#}", e);
                self.cached_history()
            }
        }
    }

    fn cached_history(&self) -> Vec<DividendRecord> {
        self.last_history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| self.fallback.dividends().to_vec())
    }
}

impl<S: MarketData + Sync + Send> MarketData for FallbackSource<S> {
    async fn fetch_price(&self) -> Result<PriceSnapshot> {
        Ok(self.price_or_fallback().await)
    }

    async fn fetch_dividend_history(&self) -> Result<Vec<DividendRecord>> {
        Ok(self.history_or_fallback().await)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Source that serves fixed data until told to fail.
    pub struct FlakySource {
        pub price: Decimal,
        pub history: Vec<DividendRecord>,
        pub failing: AtomicBool,
        pub hang: bool,
        pub calls: AtomicUsize,
    }

    impl FlakySource {
        pub fn new(price: Decimal, history: Vec<DividendRecord>) -> Self {
            Self {
                price,
                history,
                failing: AtomicBool::new(false),
                hang: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    impl MarketData for FlakySource {
        async fn fetch_price(&self) -> Result<PriceSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(IncomeError::Fetch("provider down".to_string()).into());
            }
            Ok(PriceSnapshot::flat("TEST", self.price, PriceSource::Live))
        }

        async fn fetch_dividend_history(&self) -> Result<Vec<DividendRecord>> {
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(IncomeError::Fetch("provider down".to_string()).into());
            }
            Ok(self.history.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FlakySource;
    use super::*;
    use crate::dividends::test_support::monthly_series;
    use rust_decimal_macros::dec;

    fn static_table() -> StaticSource {
        StaticSource::new("TEST", dec!(20), monthly_series(1, 2025, &[dec!(0.5)]))
    }

    #[test]
    fn test_snapshot_derives_change() {
        let s = PriceSnapshot::new(
            "TEST",
            dec!(26),
            dec!(25),
            dec!(26.5),
            dec!(24.9),
            Utc::now(),
            PriceSource::Live,
        );
        assert_eq!(s.change, dec!(1));
        assert_eq!(s.percent_change, dec!(4));
    }

    #[test]
    fn test_snapshot_zero_previous_close() {
        let s = PriceSnapshot::new("T", dec!(1), dec!(0), dec!(1), dec!(1), Utc::now(), PriceSource::Live);
        assert_eq!(s.percent_change, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_live_data_passes_through() {
        let history = monthly_series(5, 2025, &[dec!(1), dec!(2)]);
        let source = FallbackSource::new(
            FlakySource::new(dec!(30), history.clone()),
            static_table(),
            Duration::from_secs(5),
        );
        let price = source.price_or_fallback().await;
        assert_eq!(price.current_price, dec!(30));
        assert_eq!(price.source, PriceSource::Live);
        assert_eq!(source.history_or_fallback().await, history);
    }

    #[tokio::test]
    async fn test_failure_before_any_success_uses_static_table() {
        let flaky = FlakySource::new(dec!(30), vec![]);
        flaky.set_failing(true);
        let source = FallbackSource::new(flaky, static_table(), Duration::from_secs(5));

        let price = source.price_or_fallback().await;
        assert_eq!(price.current_price, dec!(20));
        assert_eq!(price.source, PriceSource::Fallback);
        let history = source.history_or_fallback().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].amount, dec!(0.5));
    }

    #[tokio::test]
    async fn test_failure_after_success_uses_last_known_good() {
        let history = monthly_series(5, 2025, &[dec!(1), dec!(2)]);
        let source = FallbackSource::new(
            FlakySource::new(dec!(30), history.clone()),
            static_table(),
            Duration::from_secs(5),
        );
        source.price_or_fallback().await;
        source.history_or_fallback().await;

        source.primary().set_failing(true);
        let price = source.price_or_fallback().await;
        assert_eq!(price.current_price, dec!(30));
        assert_eq!(price.source, PriceSource::Fallback);
        assert_eq!(source.history_or_fallback().await, history);
    }

    #[tokio::test]
    async fn test_empty_provider_history_uses_fallback() {
        let source = FallbackSource::new(
            FlakySource::new(dec!(30), vec![]),
            static_table(),
            Duration::from_secs(5),
        );
        assert_eq!(source.history_or_fallback().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_provider_is_bounded() {
        let mut flaky = FlakySource::new(dec!(30), vec![]);
        flaky.hang = true;
        let source = FallbackSource::new(flaky, static_table(), Duration::from_secs(10));
        let price = source.price_or_fallback().await;
        assert_eq!(price.source, PriceSource::Fallback);
        assert_eq!(price.current_price, dec!(20));
    }
}
