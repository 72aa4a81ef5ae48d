//! Refresh cycle
//!
//! One refresh = fetch price and history, reconcile the series, recompute
//! yields and publish a new [`DashboardSnapshot`]. The periodic loop owns the
//! only mutable state; readers get whole `Arc` snapshots through a `watch`
//! channel and never observe a partially updated series.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::dividends::{force_update_current_month, reconcile, DividendRecord, Entropy};
use crate::error::Result;
use crate::pricing::{MarketData, PriceSnapshot};
use crate::reports::{annualized_yield, with_yields};

/// Everything a consumer needs to render one refresh
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DashboardSnapshot {
    pub price: PriceSnapshot,
    pub dividends: Vec<DividendRecord>,
    pub annualized_yield_percent: Decimal,
    pub refreshed_at: DateTime<Utc>,
}

impl DashboardSnapshot {
    fn build(price: PriceSnapshot, dividends: Vec<DividendRecord>) -> Self {
        let dividends = with_yields(&dividends, price.current_price);
        let annualized_yield_percent = annualized_yield(&dividends, price.current_price);
        Self {
            price,
            dividends,
            annualized_yield_percent,
            refreshed_at: Utc::now(),
        }
    }

    /// New snapshot with the current month force-updated.
    pub fn force_updated<C: Clock, E: Entropy>(&self, clock: &C, entropy: &mut E) -> Self {
        let dividends =
            force_update_current_month(&self.dividends, self.price.current_price, clock, entropy);
        Self::build(self.price.clone(), dividends)
    }
}

/// What caused a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Timer,
    Manual,
    ForceUpdate,
}

/// Fetch, reconcile and price a fresh snapshot.
///
/// Fetch failures are the source's concern: wrap it in
/// [`crate::pricing::FallbackSource`] to always get data back.
pub async fn refresh_once<S, C, E>(
    source: &S,
    clock: &C,
    entropy: &mut E,
) -> Result<DashboardSnapshot>
where
    S: MarketData,
    C: Clock,
    E: Entropy,
{
    let (price, history) = tokio::join!(source.fetch_price(), source.fetch_dividend_history());
    let price = price?;
    let history = history?;

    let reconciled = reconcile(&history, price.current_price, clock, entropy);
    let added = reconciled.len().saturating_sub(history.len());
    if added > 0 {
        info!("Reconciliation added {} estimated record(s)", added);
    }

    Ok(DashboardSnapshot::build(price, reconciled))
}

/// Run refreshes until `shutdown` resolves.
///
/// Refreshes on every `interval` tick (the first tick fires immediately) and
/// on every trigger received on `triggers`. Each completed refresh replaces
/// the value in `publish`. Dropping every trigger sender leaves the timer
/// running; resolving `shutdown` stops the loop and drops the timer.
pub async fn run_periodic<S, C, E, F>(
    source: &S,
    clock: &C,
    entropy: &mut E,
    interval: Duration,
    mut triggers: mpsc::Receiver<RefreshTrigger>,
    publish: watch::Sender<Option<Arc<DashboardSnapshot>>>,
    shutdown: F,
) where
    S: MarketData,
    C: Clock,
    E: Entropy,
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);
    let mut triggers_open = true;

    loop {
        let trigger = tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => RefreshTrigger::Timer,
            received = triggers.recv(), if triggers_open => match received {
                Some(t) => t,
                None => {
                    triggers_open = false;
                    continue;
                }
            },
        };
        debug!("Refresh triggered by {:?}", trigger);

        let snapshot = match refresh_once(source, clock, entropy).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Refresh failed, keeping previous snapshot: {:#}", e);
                continue;
            }
        };
        let snapshot = if trigger == RefreshTrigger::ForceUpdate {
            snapshot.force_updated(clock, entropy)
        } else {
            snapshot
        };

        publish.send_replace(Some(Arc::new(snapshot)));
    }

    info!("Refresh loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::dividends::entropy::test_support::ScriptedEntropy;
    use crate::dividends::test_support::monthly_series;
    use crate::dividends::Provenance;
    use crate::pricing::test_support::FlakySource;
    use crate::pricing::{FallbackSource, StaticSource};
    use rust_decimal_macros::dec;
    use std::sync::atomic::Ordering;

    fn history() -> Vec<DividendRecord> {
        monthly_series(5, 2025, &[dec!(2), dec!(2), dec!(2)])
    }

    #[tokio::test]
    async fn test_refresh_once_reconciles_and_prices() {
        let source = StaticSource::new("TEST", dec!(20), history());
        let clock = FixedClock::ymd(2025, 6, 15);
        let mut entropy = ScriptedEntropy::new().with_picks(&[3_000]);

        let snapshot = refresh_once(&source, &clock, &mut entropy).await.unwrap();
        assert_eq!(snapshot.dividends.len(), 4);
        assert!(snapshot.dividends[0].is_for(6, 2025));
        assert_eq!(snapshot.dividends[0].provenance, Provenance::Estimated);
        assert!(snapshot.dividends.iter().all(|r| r.yield_percent == dec!(10)));
        // 4 records of 2.00 -> 8 * 12 / 4 = 24 per year at 20
        assert_eq!(snapshot.annualized_yield_percent, dec!(120));
    }

    #[tokio::test]
    async fn test_refresh_once_propagates_raw_source_errors() {
        let flaky = FlakySource::new(dec!(20), history());
        flaky.set_failing(true);
        let clock = FixedClock::ymd(2025, 6, 15);
        let mut entropy = ScriptedEntropy::new();
        assert!(refresh_once(&flaky, &clock, &mut entropy).await.is_err());
    }

    #[tokio::test]
    async fn test_force_updated_snapshot() {
        let source = StaticSource::new("TEST", dec!(20), history());
        let clock = FixedClock::ymd(2025, 5, 20);
        let mut entropy = ScriptedEntropy::new();
        let snapshot = refresh_once(&source, &clock, &mut entropy).await.unwrap();
        let updated = snapshot.force_updated(&clock, &mut entropy);

        assert_eq!(updated.dividends.len(), snapshot.dividends.len());
        assert_eq!(updated.dividends[0].provenance, Provenance::Updated);
        assert_eq!(snapshot.dividends[0].provenance, Provenance::Confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_loop_publishes_and_stops() {
        let flaky = FlakySource::new(dec!(20), history());
        let source = FallbackSource::new(
            flaky,
            StaticSource::new("TEST", dec!(10), history()),
            Duration::from_secs(5),
        );
        let clock = FixedClock::ymd(2025, 5, 20);
        let mut entropy = ScriptedEntropy::new();
        let (trigger_tx, trigger_rx) = mpsc::channel(4);
        let (publish_tx, mut publish_rx) = watch::channel::<Option<Arc<DashboardSnapshot>>>(None);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let driver = async move {
            // initial tick
            publish_rx.changed().await.unwrap();
            let first = publish_rx.borrow_and_update().clone().unwrap();
            assert_eq!(first.price.current_price, dec!(20));

            trigger_tx.send(RefreshTrigger::ForceUpdate).await.unwrap();
            publish_rx.changed().await.unwrap();
            let forced = publish_rx.borrow_and_update().clone().unwrap();
            assert_eq!(forced.dividends[0].provenance, Provenance::Updated);

            tokio::time::sleep(Duration::from_secs(61)).await;
            stop_tx.send(()).unwrap();
        };

        let shutdown = async move {
            let _ = stop_rx.await;
        };
        tokio::join!(
            run_periodic(
                &source,
                &clock,
                &mut entropy,
                Duration::from_secs(60),
                trigger_rx,
                publish_tx,
                shutdown,
            ),
            driver,
        );

        // initial tick + force update + one timer tick
        assert_eq!(source.primary().calls.load(Ordering::SeqCst), 3);
    }
}
