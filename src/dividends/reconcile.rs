//! Reconciliation policy
//!
//! Runs once per refresh cycle against "today" and decides whether the
//! current or next month's distribution is missing:
//!
//! 1. A current-month record already exists: nothing to do for this month.
//! 2. Past the payment cutoff (the 12th) with no record: always estimate,
//!    tagged `Estimated`.
//! 3. Otherwise, inside the announcement window (12 to 3 days before the
//!    expected ex-dividend date, assumed to be the 6th): 30% chance of an
//!    `Announced` estimate.
//! 4. From the 25th on, the same window test against next month: 25% chance
//!    of an `Announced` estimate flagged as an early announcement.
//!
//! New records are always prepended, so the series stays newest-first.

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::estimate::estimate_record;
use super::{contains_month, next_month_of, prepend, DividendRecord, Entropy, Provenance};
use crate::clock::Clock;

/// Day of month after which a missing distribution is considered overdue
pub const PAYMENT_CUTOFF_DAY: u32 = 12;
/// Assumed ex-dividend day used for announcement windows
pub const EXPECTED_EX_DAY: u32 = 6;
/// Announcement window opens this many days before the expected ex date
pub const WINDOW_OPEN_DAYS_BEFORE: u64 = 12;
/// Announcement window closes this many days before the expected ex date
pub const WINDOW_CLOSE_DAYS_BEFORE: u64 = 3;
/// Day of month from which next month's announcement is checked
pub const EARLY_CHECK_FROM_DAY: u32 = 25;

pub const ANNOUNCEMENT_CHANCE_PCT: u32 = 30;
pub const EARLY_ANNOUNCEMENT_CHANCE_PCT: u32 = 25;

/// Whether `today` falls inside the announcement window for (`month`, `year`).
pub fn in_announcement_window(today: NaiveDate, month: u32, year: i32) -> bool {
    let Some(expected_ex) = NaiveDate::from_ymd_opt(year, month, EXPECTED_EX_DAY) else {
        return false;
    };
    let (Some(opens), Some(closes)) = (
        expected_ex.checked_sub_days(Days::new(WINDOW_OPEN_DAYS_BEFORE)),
        expected_ex.checked_sub_days(Days::new(WINDOW_CLOSE_DAYS_BEFORE)),
    ) else {
        return false;
    };
    today >= opens && today <= closes
}

/// Fill a missing current or next month according to the policy above.
///
/// Pure apart from `clock` and `entropy`. Months that already have a record
/// are never touched, so calling this repeatedly at the same instant cannot
/// produce duplicate months.
pub fn reconcile<C: Clock, E: Entropy>(
    series: &[DividendRecord],
    price: Decimal,
    clock: &C,
    entropy: &mut E,
) -> Vec<DividendRecord> {
    let today = clock.today();
    let (month, year) = (today.month(), today.year());
    let mut updated = series.to_vec();

    if contains_month(&updated, month, year) {
        debug!("Dividend for {}/{} already present", month, year);
    } else if today.day() > PAYMENT_CUTOFF_DAY {
        match estimate_record(&updated, month, year, price, Provenance::Estimated, entropy) {
            Some(estimate) => {
                info!(
                    "Dividend for {}/{} overdue, estimated {}",
                    month, year, estimate.amount
                );
                updated = prepend(&updated, estimate);
            }
            None => warn!("Dividend for {}/{} overdue but no history to estimate from", month, year),
        }
    } else if in_announcement_window(today, month, year) {
        if entropy.chance(ANNOUNCEMENT_CHANCE_PCT) {
            if let Some(estimate) =
                estimate_record(&updated, month, year, price, Provenance::Announced, entropy)
            {
                info!("Simulated announcement for {}/{}: {}", month, year, estimate.amount);
                updated = prepend(&updated, estimate);
            }
        } else {
            debug!("No announcement yet for {}/{}", month, year);
        }
    }

    if today.day() >= EARLY_CHECK_FROM_DAY {
        let (next_month, next_year) = next_month_of(today);
        if !contains_month(&updated, next_month, next_year)
            && in_announcement_window(today, next_month, next_year)
            && entropy.chance(EARLY_ANNOUNCEMENT_CHANCE_PCT)
        {
            if let Some(mut estimate) = estimate_record(
                &updated,
                next_month,
                next_year,
                price,
                Provenance::Announced,
                entropy,
            ) {
                estimate.early_announcement = true;
                info!(
                    "Simulated early announcement for {}/{}: {}",
                    next_month, next_year, estimate.amount
                );
                updated = prepend(&updated, estimate);
            }
        }
    }

    updated
}

/// Replace the current month's record with a fresh `Updated` estimate.
///
/// Every existing record for the current month is removed first. The estimate
/// is drawn from the remaining records, or from the full input when only
/// current-month records were present. An empty input is returned unchanged.
pub fn force_update_current_month<C: Clock, E: Entropy>(
    series: &[DividendRecord],
    price: Decimal,
    clock: &C,
    entropy: &mut E,
) -> Vec<DividendRecord> {
    let today = clock.today();
    let (month, year) = (today.month(), today.year());

    let remaining: Vec<DividendRecord> = series
        .iter()
        .filter(|r| !r.is_for(month, year))
        .cloned()
        .collect();
    let removed = series.len() - remaining.len();

    let base = if remaining.is_empty() { series } else { &remaining[..] };
    match estimate_record(base, month, year, price, Provenance::Updated, entropy) {
        Some(estimate) => {
            info!(
                "Force-updated {}/{}: removed {} record(s), new amount {}",
                month, year, removed, estimate.amount
            );
            prepend(&remaining, estimate)
        }
        None => {
            warn!("Cannot force-update {}/{}: empty dividend history", month, year);
            series.to_vec()
        }
    }
}
