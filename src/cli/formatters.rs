//! Output formatting module for CLI display
//!
//! Turns snapshots and projections into terminal tables or JSON. Nothing in
//! here computes figures; it only presents what the reports produced.

use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use crate::dividends::{DividendRecord, Provenance};
use crate::pricing::{PriceSnapshot, PriceSource};
use crate::refresh::DashboardSnapshot;
use crate::reports::{ProjectionResult, Scenario};
use crate::utils::{format_currency, format_decimal, format_dividend, format_percent};

fn colored_provenance(record: &DividendRecord) -> String {
    let provenance = record.display_provenance();
    let label = provenance.as_str();
    match provenance {
        Provenance::Confirmed => label.green().to_string(),
        Provenance::Estimated => label.yellow().to_string(),
        Provenance::Announced | Provenance::EarlyAnnouncement => label.cyan().to_string(),
        Provenance::Updated => label.magenta().to_string(),
    }
}

fn colored_change(value: String, sign: Decimal) -> String {
    if sign >= Decimal::ZERO {
        value.green().to_string()
    } else {
        value.red().to_string()
    }
}

/// Price line plus annualized yield
pub fn format_price_header(price: &PriceSnapshot, annualized_yield: Decimal) -> String {
    let mut output = String::new();

    let source = match price.source {
        PriceSource::Live => price.source.as_str().green(),
        PriceSource::Fallback => price.source.as_str().yellow(),
    };
    output.push_str(&format!(
        "\n{} {}  [{}]\n",
        "💵".cyan().bold(),
        price.ticker.bold(),
        source
    ));

    let change = colored_change(
        format!(
            "{} ({})",
            format_currency(price.change),
            format_percent(price.percent_change, true)
        ),
        price.change,
    );
    output.push_str(&format!(
        "\n{:<20} {}  {}",
        "Price:".bold(),
        format_currency(price.current_price),
        change
    ));
    output.push_str(&format!(
        "\n{:<20} {}",
        "Previous Close:".bold(),
        format_currency(price.previous_close)
    ));
    output.push_str(&format!(
        "\n{:<20} {} - {}",
        "Day Range:".bold(),
        format_currency(price.day_low),
        format_currency(price.day_high)
    ));
    output.push_str(&format!(
        "\n{:<20} {}\n",
        "Annualized Yield:".bold(),
        format_percent(annualized_yield, false)
    ));

    output
}

/// Dividend history table, newest first
pub fn format_dividends_table(series: &[DividendRecord]) -> String {
    if series.is_empty() {
        return format!("{} No dividend history available\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct DividendRow {
        #[tabled(rename = "Month")]
        month: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Amount")]
        amount: String,
        #[tabled(rename = "Yield")]
        yield_pct: String,
        #[tabled(rename = "Ex-Date")]
        ex_date: String,
        #[tabled(rename = "Pay Date")]
        pay_date: String,
    }

    let rows: Vec<DividendRow> = series
        .iter()
        .map(|r| DividendRow {
            month: r.label(),
            status: colored_provenance(r),
            amount: format_dividend(r.amount),
            yield_pct: format_percent(r.yield_percent, false),
            ex_date: r.ex_dividend_date.format("%Y-%m-%d").to_string(),
            pay_date: r.payment_date.format("%Y-%m-%d").to_string(),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    // Right-align Amount and Yield
    table.modify(Columns::new(2..4), Alignment::right());

    format!("\n{} Dividend History\n\n{}\n", "📅".cyan().bold(), table)
}

/// Projection summary and per-month income table
pub fn format_projection(
    investment: Decimal,
    projection: &ProjectionResult,
    scenario: &Scenario,
) -> String {
    let mut output = String::new();

    let title = if scenario.is_custom {
        format!("Income Projection - {} scenario", scenario.name)
    } else {
        "Income Projection".to_string()
    };
    output.push_str(&format!("\n{} {}\n", "📈".cyan().bold(), title));

    #[derive(Tabled)]
    struct MonthRow {
        #[tabled(rename = "Month")]
        month: String,
        #[tabled(rename = "Per Share")]
        per_share: String,
        #[tabled(rename = "Income")]
        income: String,
        #[tabled(rename = "")]
        kind: String,
    }

    if !projection.per_month_returns.is_empty() {
        let rows: Vec<MonthRow> = projection
            .per_month_returns
            .iter()
            .map(|m| MonthRow {
                month: m.label.clone(),
                per_share: format_dividend(m.amount_per_share),
                income: format_currency(m.income),
                kind: if m.projected {
                    "projected".bright_black().to_string()
                } else {
                    String::new()
                },
            })
            .collect();

        let mut table = Table::new(&rows);
        table.with(Style::modern());
        table.modify(Columns::new(1..3), Alignment::right());
        output.push_str(&format!("\n{}", table));
    }

    output.push_str(&format!("\n\n{} Summary", "━".repeat(60).bright_black()));
    output.push_str(&format!(
        "\n{:<24} {}",
        "Investment:".bold(),
        format_currency(investment)
    ));
    output.push_str(&format!(
        "\n{:<24} {}",
        "Shares Owned:".bold(),
        format_decimal(projection.shares_owned, 2)
    ));
    output.push_str(&format!(
        "\n{:<24} {}",
        "Monthly Dividend:".bold(),
        format_dividend(projection.effective_monthly_dividend)
    ));
    output.push_str(&format!(
        "\n{:<24} {}",
        "Monthly Income:".bold(),
        format_currency(projection.expected_monthly_income).green()
    ));
    output.push_str(&format!(
        "\n{:<24} {}",
        "Annual Income:".bold(),
        format_currency(projection.expected_annual_income).green()
    ));
    output.push_str(&format!(
        "\n{:<24} {}",
        "Effective Yield:".bold(),
        format_percent(projection.effective_annual_yield_percent, false)
    ));
    output.push_str(&format!(
        "\n{:<24} {}\n",
        "Trailing 12M Return:".bold(),
        format_currency(projection.trailing_12_month_return)
    ));

    output
}

/// Message when no projection can be made
pub fn format_no_projection(price: Decimal) -> String {
    format!(
        "{} No projection available at price {}\n",
        "⚠".yellow().bold(),
        format_currency(price)
    )
}

#[derive(Serialize)]
struct JsonShow<'a> {
    snapshot: &'a DashboardSnapshot,
    investment_amount: Decimal,
    scenario: &'a Scenario,
    projection: Option<&'a ProjectionResult>,
}

/// Snapshot plus projection as JSON
pub fn format_show_json(
    snapshot: &DashboardSnapshot,
    investment_amount: Decimal,
    scenario: &Scenario,
    projection: Option<&ProjectionResult>,
) -> String {
    let report = JsonShow {
        snapshot,
        investment_amount,
        scenario,
        projection,
    };
    serde_json::to_string_pretty(&report)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

/// Dividend series as JSON
pub fn format_dividends_json(series: &[DividendRecord]) -> String {
    serde_json::to_string_pretty(series)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dividends::test_support::monthly_series;
    use crate::reports::compute_projection;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_dividends_message() {
        let msg = format_dividends_table(&[]);
        assert!(msg.contains("No dividend history available"));
    }

    #[test]
    fn test_dividends_table_lists_every_month() {
        let mut series = monthly_series(5, 2025, &[dec!(1.3356), dec!(2.3734)]);
        series[0].provenance = Provenance::Estimated;
        let table = format_dividends_table(&series);
        assert!(table.contains("May 2025"));
        assert!(table.contains("Apr 2025"));
        assert!(table.contains("$2.3734"));
        assert!(table.contains("ESTIMATED"));
        assert!(table.contains("CONFIRMED"));
    }

    #[test]
    fn test_projection_summary() {
        let series = monthly_series(5, 2025, &[dec!(2.3734)]);
        let today = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        let scenario = Scenario::none();
        let p = compute_projection(dec!(10000), dec!(25.12), &series, &scenario, today).unwrap();
        let out = format_projection(dec!(10000), &p, &scenario);
        assert!(out.contains("$10,000.00"));
        assert!(out.contains("398.09"));
        assert!(out.contains("$944.82"));
        assert!(!out.contains("scenario"));
    }

    #[test]
    fn test_show_json_is_parseable() {
        let series = monthly_series(5, 2025, &[dec!(1), dec!(2)]);
        let snapshot = DashboardSnapshot {
            price: PriceSnapshot::flat("TEST", dec!(20), PriceSource::Fallback),
            dividends: series.clone(),
            annualized_yield_percent: dec!(90),
            refreshed_at: chrono::Utc::now(),
        };
        let scenario = Scenario::custom("Mine", dec!(3));
        let today = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        let p = compute_projection(dec!(100), dec!(20), &series, &scenario, today).unwrap();

        let json = format_show_json(&snapshot, dec!(100), &scenario, Some(&p));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["snapshot"]["price"]["ticker"], "TEST");
        assert_eq!(value["scenario"]["is_custom"], true);
        assert_eq!(value["projection"]["per_month_returns"].as_array().unwrap().len(), 14);
    }
}
