//! Dividend records and series helpers
//!
//! A series is a `Vec<DividendRecord>` kept newest-first by (year, month),
//! with at most one record per month. The estimation engine and the
//! reconciliation policy live in the submodules; both return new series and
//! never mutate a record in place.

pub mod entropy;
pub mod estimate;
pub mod reconcile;

pub use entropy::{Entropy, RngEntropy};
pub use estimate::{base_expectation, estimate_record, expected_amount, expected_payout_dates};
pub use reconcile::{force_update_current_month, reconcile};

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// How a dividend record was obtained
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Provenance {
    Confirmed,         // Reported by the data provider
    Estimated,         // Synthesized after the payment cutoff passed
    Announced,         // Synthesized inside the announcement window
    Updated,           // Synthesized by an explicit force update
    EarlyAnnouncement, // Display form of an announced next-month record
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Confirmed => "CONFIRMED",
            Provenance::Estimated => "ESTIMATED",
            Provenance::Announced => "ANNOUNCED",
            Provenance::Updated => "UPDATED",
            Provenance::EarlyAnnouncement => "EARLY_ANNOUNCEMENT",
        }
    }
}

/// One monthly distribution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DividendRecord {
    pub month: u32, // 1-12
    pub year: i32,
    pub amount: Decimal,
    pub yield_percent: Decimal,
    pub ex_dividend_date: NaiveDate,
    pub payment_date: NaiveDate,
    pub provenance: Provenance,
    #[serde(default)]
    pub early_announcement: bool,
}

impl DividendRecord {
    /// Sort key: newest sorts last with the natural ordering.
    pub fn period(&self) -> (i32, u32) {
        (self.year, self.month)
    }

    pub fn is_for(&self, month: u32, year: i32) -> bool {
        self.month == month && self.year == year
    }

    /// Three-letter month name, e.g. "May".
    pub fn month_name(&self) -> &'static str {
        month_abbreviation(self.month)
    }

    /// "May 2025"
    pub fn label(&self) -> String {
        format!("{} {}", self.month_name(), self.year)
    }

    /// Provenance as shown to users; next-month announcements are called out.
    pub fn display_provenance(&self) -> Provenance {
        if self.provenance == Provenance::Announced && self.early_announcement {
            Provenance::EarlyAnnouncement
        } else {
            self.provenance
        }
    }
}

/// Three-letter abbreviation for a 1-based month index ("???" when invalid).
pub fn month_abbreviation(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_ABBREVIATIONS.get(i as usize).copied())
        .unwrap_or("???")
}

/// Parse "5", "05", "May" or "may" into a 1-based month index.
pub fn parse_month(s: &str) -> Option<u32> {
    let trimmed = s.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    if trimmed.len() < 3 {
        return None;
    }
    let prefix = trimmed.get(..3)?;
    MONTH_ABBREVIATIONS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(prefix))
        .map(|i| i as u32 + 1)
}

/// (month, year) of the calendar month after `date`.
pub fn next_month_of(date: NaiveDate) -> (u32, i32) {
    let first = date.with_day(1).unwrap_or(date);
    match first.checked_add_months(Months::new(1)) {
        Some(next) => (next.month(), next.year()),
        None => (date.month(), date.year()),
    }
}

pub fn contains_month(series: &[DividendRecord], month: u32, year: i32) -> bool {
    series.iter().any(|r| r.is_for(month, year))
}

/// Copy of the series sorted newest-first by (year, month).
pub fn newest_first(series: &[DividendRecord]) -> Vec<DividendRecord> {
    let mut sorted = series.to_vec();
    sorted.sort_by(|a, b| b.period().cmp(&a.period()));
    sorted
}

/// The `n` most recent amounts, newest first.
pub fn recent_amounts(series: &[DividendRecord], n: usize) -> Vec<Decimal> {
    let mut periods: Vec<((i32, u32), Decimal)> =
        series.iter().map(|r| (r.period(), r.amount)).collect();
    periods.sort_by(|a, b| b.0.cmp(&a.0));
    periods.into_iter().take(n).map(|(_, amount)| amount).collect()
}

/// Unweighted mean of every amount in the series (0 when empty).
pub fn mean_amount(series: &[DividendRecord]) -> Decimal {
    if series.is_empty() {
        return Decimal::ZERO;
    }
    let total: Decimal = series.iter().map(|r| r.amount).sum();
    total / Decimal::from(series.len())
}

/// New series with `record` as its first element.
pub fn prepend(series: &[DividendRecord], record: DividendRecord) -> Vec<DividendRecord> {
    let mut updated = Vec::with_capacity(series.len() + 1);
    updated.push(record);
    updated.extend_from_slice(series);
    updated
}
