use anyhow::{anyhow, Context};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use super::fallback::confirmed_record;
use super::{MarketData, PriceSnapshot, PriceSource};
use crate::dividends::DividendRecord;
use crate::error::Result;

const CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance chart response
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    events: Option<Events>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(rename = "chartPreviousClose")]
    chart_previous_close: Option<f64>,
    #[serde(rename = "previousClose")]
    previous_close: Option<f64>,
    #[serde(rename = "regularMarketDayHigh")]
    day_high: Option<f64>,
    #[serde(rename = "regularMarketDayLow")]
    day_low: Option<f64>,
    #[serde(rename = "regularMarketTime")]
    market_time: Option<i64>,
    #[allow(dead_code)]
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct Events {
    dividends: Option<HashMap<String, DividendEvent>>,
}

#[derive(Debug, Deserialize)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

/// Quote and dividend events for one ticker from the Yahoo chart API
#[derive(Debug, Clone)]
pub struct YahooSource {
    ticker: String,
    client: Client,
}

impl YahooSource {
    pub fn new(ticker: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; EtfIncomeBot/1.0)")
            .build()?;
        Ok(Self {
            ticker: ticker.into(),
            client,
        })
    }

    async fn fetch_chart(&self, query: &str) -> Result<ChartResult> {
        let url = format!("{}/{}?{}", CHART_BASE_URL, self.ticker, query);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to Yahoo Finance")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Yahoo Finance returned error status: {}",
                response.status()
            ));
        }

        let data: YahooChartResponse = response
            .json()
            .await
            .context("Failed to parse Yahoo Finance response")?;

        first_result(data)
    }
}

impl MarketData for YahooSource {
    async fn fetch_price(&self) -> Result<PriceSnapshot> {
        info!("Fetching current price for {} from Yahoo Finance", self.ticker);
        let result = self.fetch_chart("range=1d&interval=1d").await?;
        snapshot_from_meta(&self.ticker, &result.meta)
    }

    async fn fetch_dividend_history(&self) -> Result<Vec<DividendRecord>> {
        info!("Fetching dividend history for {} from Yahoo Finance", self.ticker);
        let result = self.fetch_chart("range=2y&interval=1d&events=div").await?;
        let events = dividend_events(&result)?;
        let records = group_by_month(&events);
        debug!(
            "Fetched {} dividend events into {} monthly records",
            events.len(),
            records.len()
        );
        Ok(records)
    }
}

fn first_result(data: YahooChartResponse) -> Result<ChartResult> {
    if let Some(error) = data.chart.error {
        return Err(anyhow!(
            "Yahoo Finance API error: {} - {}",
            error.code,
            error.description
        ));
    }

    data.chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| anyhow!("No data returned from Yahoo Finance"))
}

fn to_decimal(value: f64, what: &str) -> Result<Decimal> {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(4))
        .ok_or_else(|| anyhow!("Invalid {} value: {}", what, value))
}

fn snapshot_from_meta(ticker: &str, meta: &Meta) -> Result<PriceSnapshot> {
    let price = meta
        .regular_market_price
        .ok_or_else(|| anyhow!("No price data available"))?;
    let current = to_decimal(price, "price")?;
    if current <= Decimal::ZERO {
        return Err(anyhow!("Non-positive price {} for {}", current, ticker));
    }

    let previous = match meta.chart_previous_close.or(meta.previous_close) {
        Some(p) => to_decimal(p, "previous close")?,
        None => current,
    };
    let high = match meta.day_high {
        Some(h) => to_decimal(h, "day high")?,
        None => current,
    };
    let low = match meta.day_low {
        Some(l) => to_decimal(l, "day low")?,
        None => current,
    };
    let timestamp = meta
        .market_time
        .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0))
        .unwrap_or_else(Utc::now);

    Ok(PriceSnapshot::new(
        ticker,
        current,
        previous,
        high,
        low,
        timestamp,
        PriceSource::Live,
    ))
}

fn dividend_events(result: &ChartResult) -> Result<Vec<(NaiveDate, Decimal)>> {
    let Some(dividends) = result.events.as_ref().and_then(|e| e.dividends.as_ref()) else {
        return Ok(Vec::new());
    };

    let mut events = Vec::with_capacity(dividends.len());
    for event in dividends.values() {
        let date = DateTime::<Utc>::from_timestamp(event.date, 0)
            .ok_or_else(|| anyhow!("Invalid dividend timestamp {}", event.date))?
            .date_naive();
        events.push((date, to_decimal(event.amount, "dividend")?));
    }
    Ok(events)
}

/// Collapse raw ex-date events into one confirmed record per month, newest
/// first. Amounts within a month are summed; the earliest ex date is kept.
/// The chart API carries no payment dates, so payment is the next day.
pub fn group_by_month(events: &[(NaiveDate, Decimal)]) -> Vec<DividendRecord> {
    let mut by_month: BTreeMap<(i32, u32), (NaiveDate, Decimal)> = BTreeMap::new();
    for &(date, amount) in events {
        let entry = by_month
            .entry((date.year(), date.month()))
            .or_insert((date, Decimal::ZERO));
        entry.0 = entry.0.min(date);
        entry.1 += amount;
    }

    by_month
        .into_iter()
        .rev()
        .map(|((year, month), (ex_date, amount))| {
            confirmed_record(month, year, amount, ex_date, None)
        })
        .collect()
}
