use rust_decimal::Decimal;

use crate::dividends::{recent_amounts, DividendRecord};

/// Months used for annualization
pub const TRAILING_MONTHS: usize = 12;

/// Dividend yield of one distribution at `price`, in percent.
///
/// Returns 0 when `price` is not positive or the ratio overflows.
pub fn yield_percent(amount: Decimal, price: Decimal) -> Decimal {
    if price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    amount
        .checked_div(price)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

/// Annualized yield from up to the 12 most recent distributions.
///
/// Partial years are scaled linearly (`sum * 12 / count`) before dividing by
/// `price`. Returns 0 for an empty series or a non-positive price.
pub fn annualized_yield(series: &[DividendRecord], price: Decimal) -> Decimal {
    if price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let recent = recent_amounts(series, TRAILING_MONTHS);
    if recent.is_empty() {
        return Decimal::ZERO;
    }

    let annual = recent
        .iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(*amount))
        .and_then(|total| total.checked_mul(Decimal::from(TRAILING_MONTHS)))
        .and_then(|total| total.checked_div(Decimal::from(recent.len())));
    match annual {
        Some(annual) => yield_percent(annual, price),
        None => Decimal::ZERO,
    }
}

/// Copy of `series` with every `yield_percent` recomputed at `price`.
pub fn with_yields(series: &[DividendRecord], price: Decimal) -> Vec<DividendRecord> {
    series
        .iter()
        .map(|r| DividendRecord {
            yield_percent: yield_percent(r.amount, price).round_dp(2),
            ..r.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dividends::test_support::monthly_series;
    use rust_decimal_macros::dec;

    #[test]
    fn test_yield_percent() {
        assert_eq!(yield_percent(dec!(1), dec!(20)), dec!(5));
        assert_eq!(yield_percent(dec!(1), dec!(0)), Decimal::ZERO);
        assert_eq!(yield_percent(dec!(1), dec!(-3)), Decimal::ZERO);
        assert_eq!(yield_percent(Decimal::MAX, Decimal::new(1, 28)), Decimal::ZERO);
    }

    #[test]
    fn test_annualized_yield_full_year() {
        let series = monthly_series(12, 2024, &[dec!(1); 12]);
        assert_eq!(annualized_yield(&series, dec!(24)), dec!(50));
    }

    #[test]
    fn test_annualized_yield_uses_only_last_twelve() {
        let mut amounts = vec![dec!(100); 3];
        amounts.extend([dec!(1); 12]);
        let series = monthly_series(6, 2025, &amounts);
        assert_eq!(annualized_yield(&series, dec!(24)), dec!(50));
    }

    #[test]
    fn test_annualized_yield_scales_partial_year() {
        // 3 months totalling 6 -> 24 per year
        let series = monthly_series(3, 2025, &[dec!(1), dec!(2), dec!(3)]);
        assert_eq!(annualized_yield(&series, dec!(48)), dec!(50));
    }

    #[test]
    fn test_annualized_yield_formula_matches_definition() {
        for count in 1..=15usize {
            let amounts: Vec<Decimal> = (1..=count).map(|i| Decimal::from(i) / dec!(10)).collect();
            let series = monthly_series(9, 2025, &amounts);
            let price = dec!(25.12);
            let used = count.min(12);
            let sum: Decimal = amounts.iter().rev().take(used).copied().sum();
            let expected = sum * dec!(12) / Decimal::from(used) / price * dec!(100);
            assert_eq!(annualized_yield(&series, price), expected, "count = {count}");
        }
    }

    #[test]
    fn test_annualized_yield_degenerate_inputs() {
        assert_eq!(annualized_yield(&[], dec!(10)), Decimal::ZERO);
        let series = monthly_series(3, 2025, &[dec!(1)]);
        assert_eq!(annualized_yield(&series, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_with_yields_recomputes_each_record() {
        let series = monthly_series(2, 2025, &[dec!(1), dec!(2)]);
        let updated = with_yields(&series, dec!(40));
        assert_eq!(updated[0].yield_percent, dec!(5));
        assert_eq!(updated[1].yield_percent, dec!(2.5));
        assert_eq!(series[0].yield_percent, Decimal::ZERO);
    }
}
