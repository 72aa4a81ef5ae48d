//! Utility functions for formatting
//!
//! Centralized formatting for currency, share counts and percentages so the
//! table and summary output stay consistent.

use rust_decimal::{Decimal, RoundingStrategy};

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include "$" prefix
    Usd,
    /// No currency symbol (for table cells)
    None,
}

/// Core formatting function with full control over output.
///
/// Formats a Decimal with US conventions (`,` thousands, `.` decimal) and the
/// given number of decimal places, rounding half away from zero.
///
/// # Examples
/// ```
/// use etf_income::utils::{format_currency_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234.567), 2, 0, CurrencySymbol::Usd),
///     "$1,234.57"
/// );
///
/// assert_eq!(
///     format_currency_with_width(dec!(2.3734), 4, 10, CurrencySymbol::None),
///     "    2.3734"
/// );
/// ```
pub fn format_currency_with_width(
    value: Decimal,
    decimals: u32,
    width: usize,
    symbol: CurrencySymbol,
) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let is_negative = rounded < Decimal::ZERO;

    let formatted = format!("{:.*}", decimals as usize, rounded.abs());
    let (integer_part, decimal_part) = match formatted.split_once('.') {
        Some((i, d)) => (i.to_string(), Some(d.to_string())),
        None => (formatted.clone(), None),
    };

    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec![',', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative { "-" } else { "" };
    let prefix = match symbol {
        CurrencySymbol::Usd => "$",
        CurrencySymbol::None => "",
    };

    let result = match decimal_part {
        Some(d) => format!("{}{}{}.{}", sign, prefix, with_separators, d),
        None => format!("{}{}{}", sign, prefix, with_separators),
    };

    if width > 0 && result.len() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// Format as dollars: "$1,234.56"
///
/// # Examples
/// ```
/// use etf_income::utils::format_currency;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency(dec!(944.8248)), "$944.82");
/// assert_eq!(format_currency(dec!(-500)), "-$500.00");
/// ```
pub fn format_currency(value: Decimal) -> String {
    format_currency_with_width(value, 2, 0, CurrencySymbol::Usd)
}

/// Per-share dividend amounts keep four decimals: "$2.3734"
pub fn format_dividend(value: Decimal) -> String {
    format_currency_with_width(value, 4, 0, CurrencySymbol::Usd)
}

/// Plain number with separators and `decimals` places: "398.09"
pub fn format_decimal(value: Decimal, decimals: u32) -> String {
    format_currency_with_width(value, decimals, 0, CurrencySymbol::None)
}

/// Percentage with two decimals: "9.45%"; signed when `signed` is set.
pub fn format_percent(value: Decimal, signed: bool) -> String {
    let body = format!("{}%", format_decimal(value, 2));
    if signed && value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero) > Decimal::ZERO {
        format!("+{}", body)
    } else {
        body
    }
}
