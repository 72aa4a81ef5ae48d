use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::dividends::{month_abbreviation, recent_amounts, DividendRecord};
use crate::reports::scenario::Scenario;
use crate::reports::yields::{yield_percent, TRAILING_MONTHS};

/// Forward months generated for a custom scenario
pub const PROJECTED_MONTHS: u32 = 12;

/// Income from one month's distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReturn {
    pub month: u32,
    pub year: i32,
    pub label: String,
    pub amount_per_share: Decimal,
    pub income: Decimal,
    pub projected: bool, // true for scenario months, false for history
}

/// Income projection for an investment amount. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionResult {
    pub shares_owned: Decimal,
    pub effective_monthly_dividend: Decimal,
    pub expected_monthly_income: Decimal,
    pub expected_annual_income: Decimal,
    pub effective_annual_yield_percent: Decimal,
    pub trailing_12_month_return: Decimal,
    pub per_month_returns: Vec<MonthlyReturn>,
}

/// Project income for `investment` at `price`.
///
/// Uses the scenario amount when a custom scenario is active, otherwise the
/// unweighted mean of `series`. `today` anchors the projected months.
/// Returns `None` when `price` is not positive or a figure overflows.
pub fn compute_projection(
    investment: Decimal,
    price: Decimal,
    series: &[DividendRecord],
    scenario: &Scenario,
    today: NaiveDate,
) -> Option<ProjectionResult> {
    if price <= Decimal::ZERO {
        debug!("Skipping projection: non-positive price {}", price);
        return None;
    }

    let projection = project(investment, price, series, scenario, today);
    if projection.is_none() {
        debug!(
            "Skipping projection: {} at {} overflows decimal range",
            investment, price
        );
    }
    projection
}

fn project(
    investment: Decimal,
    price: Decimal,
    series: &[DividendRecord],
    scenario: &Scenario,
    today: NaiveDate,
) -> Option<ProjectionResult> {
    let twelve = Decimal::from(12);
    let shares_owned = investment.checked_div(price)?;
    let effective = scenario.effective_dividend(series);
    let expected_monthly_income = effective.checked_mul(shares_owned)?;
    let expected_annual_income = expected_monthly_income.checked_mul(twelve)?;
    let effective_annual_yield_percent = yield_percent(effective.checked_mul(twelve)?, price);

    let trailing_total = recent_amounts(series, TRAILING_MONTHS)
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))?;
    let trailing_12_month_return = trailing_total.checked_mul(shares_owned)?;

    let mut per_month_returns = series
        .iter()
        .map(|r| {
            Some(MonthlyReturn {
                month: r.month,
                year: r.year,
                label: r.label(),
                amount_per_share: r.amount,
                income: r.amount.checked_mul(shares_owned)?,
                projected: false,
            })
        })
        .collect::<Option<Vec<MonthlyReturn>>>()?;

    if scenario.is_custom {
        let income = scenario.monthly_dividend_amount.checked_mul(shares_owned)?;
        per_month_returns.extend(projected_months(
            today,
            scenario.monthly_dividend_amount,
            income,
        ));
    }

    Some(ProjectionResult {
        shares_owned,
        effective_monthly_dividend: effective,
        expected_monthly_income,
        expected_annual_income,
        effective_annual_yield_percent,
        trailing_12_month_return,
        per_month_returns,
    })
}

fn projected_months(
    today: NaiveDate,
    amount: Decimal,
    income: Decimal,
) -> impl Iterator<Item = MonthlyReturn> {
    let first = today.with_day(1).unwrap_or(today);
    (0..PROJECTED_MONTHS).filter_map(move |offset| {
        let date = first.checked_add_months(Months::new(offset))?;
        Some(MonthlyReturn {
            month: date.month(),
            year: date.year(),
            label: format!("{} {}", month_abbreviation(date.month()), date.year()),
            amount_per_share: amount,
            income,
            projected: true,
        })
    })
}
