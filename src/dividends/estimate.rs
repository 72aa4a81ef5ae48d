//! Estimation engine
//!
//! Synthesizes one plausible distribution for a month that has no record yet:
//! - amount: recency-weighted mean of the last six records, jittered ±30%
//! - ex-dividend date: the 5th to the 8th of the target month
//! - payment date: one or two days after the ex-dividend date
//!
//! The caller decides the provenance tag.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use tracing::debug;

use super::{recent_amounts, DividendRecord, Entropy, Provenance};
use crate::reports::yields::yield_percent;

/// Number of recent records feeding the weighted mean
pub const ESTIMATE_WINDOW: usize = 6;

/// Jitter bounds in basis points of the base expectation (0.7x to 1.3x)
const JITTER_MIN_BPS: u32 = 7_000;
const JITTER_MAX_BPS: u32 = 13_000;

const EX_DAY_MIN: u32 = 5;
const EX_DAY_MAX: u32 = 8;
const PAYMENT_OFFSET_MIN: u32 = 1;
const PAYMENT_OFFSET_MAX: u32 = 2;

/// Unjittered recency-weighted mean of up to the six most recent amounts.
///
/// Weights run `window, window - 1, ..., 1` from newest to oldest, so a full
/// window uses 6,5,4,3,2,1. Returns 0 for an empty series.
pub fn base_expectation(series: &[DividendRecord]) -> Decimal {
    let recent = recent_amounts(series, ESTIMATE_WINDOW);
    let window = recent.len();
    if window == 0 {
        return Decimal::ZERO;
    }

    let (weighted_sum, weight_total) = recent.iter().enumerate().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(sum, total), (i, amount)| {
            let weight = Decimal::from(window - i);
            (sum + *amount * weight, total + weight)
        },
    );

    weighted_sum / weight_total
}

/// Expected amount for (`target_month`, `target_year`): the weighted base
/// times a uniform jitter in [0.7, 1.3], rounded to 4 decimal places.
pub fn expected_amount<E: Entropy>(
    series: &[DividendRecord],
    target_month: u32,
    target_year: i32,
    entropy: &mut E,
) -> Decimal {
    let base = base_expectation(series);
    if base.is_zero() {
        return Decimal::ZERO;
    }

    let jitter_bps = entropy.between(JITTER_MIN_BPS, JITTER_MAX_BPS);
    let jitter = Decimal::new(i64::from(jitter_bps), 4);
    let amount = (base * jitter).round_dp(4);

    debug!(
        "Expected amount for {}/{}: base {} x jitter {} = {}",
        target_month,
        target_year,
        base.round_dp(4),
        jitter,
        amount
    );
    amount
}

/// Ex-dividend and payment dates for the target month.
///
/// Returns `None` only when (`year`, `month`) is not a valid calendar month.
pub fn expected_payout_dates<E: Entropy>(
    year: i32,
    month: u32,
    entropy: &mut E,
) -> Option<(NaiveDate, NaiveDate)> {
    let ex_day = entropy.between(EX_DAY_MIN, EX_DAY_MAX);
    let ex_date = NaiveDate::from_ymd_opt(year, month, ex_day)?;
    let offset = entropy.between(PAYMENT_OFFSET_MIN, PAYMENT_OFFSET_MAX);
    let payment_date = ex_date.checked_add_days(Days::new(u64::from(offset)))?;
    Some((ex_date, payment_date))
}

/// Build a synthetic record for (`month`, `year`) from `series`.
///
/// `None` when the series is empty or the month is invalid.
pub fn estimate_record<E: Entropy>(
    series: &[DividendRecord],
    month: u32,
    year: i32,
    price: Decimal,
    provenance: Provenance,
    entropy: &mut E,
) -> Option<DividendRecord> {
    if series.is_empty() {
        debug!("No history to estimate {}/{} from", month, year);
        return None;
    }

    let amount = expected_amount(series, month, year, entropy);
    let (ex_dividend_date, payment_date) = expected_payout_dates(year, month, entropy)?;

    Some(DividendRecord {
        month,
        year,
        amount,
        yield_percent: yield_percent(amount, price).round_dp(2),
        ex_dividend_date,
        payment_date,
        provenance,
        early_announcement: false,
    })
}
