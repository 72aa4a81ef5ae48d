use chrono::NaiveDate;
use etf_income::clock::FixedClock;
use etf_income::dividends::{DividendRecord, Provenance, RngEntropy};
use etf_income::pricing::fallback::confirmed_record;
use etf_income::pricing::StaticSource;
use etf_income::refresh::refresh_once;
use etf_income::reports::{annualized_yield, compute_projection, Scenario, ScenarioPreset};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn history() -> Vec<DividendRecord> {
    vec![
        confirmed_record(3, 2025, dec!(1.00), ymd(2025, 3, 6), None),
        confirmed_record(4, 2025, dec!(2.00), ymd(2025, 4, 7), None),
        confirmed_record(5, 2025, dec!(3.00), ymd(2025, 5, 6), Some(ymd(2025, 5, 8))),
    ]
}

#[tokio::test]
async fn refresh_then_project_on_complete_history() {
    let source = StaticSource::new("TEST", dec!(20), history());
    let clock = FixedClock::ymd(2025, 5, 20);
    let mut entropy = RngEntropy::seeded(3);

    let snapshot = refresh_once(&source, &clock, &mut entropy).await.unwrap();
    assert_eq!(snapshot.dividends.len(), 3);
    assert!(snapshot.dividends[0].is_for(5, 2025));
    assert_eq!(snapshot.dividends[0].yield_percent, dec!(15));
    // 6.00 * 12 / 3 / 20 = 120%
    assert_eq!(snapshot.annualized_yield_percent, dec!(120));

    let projection = compute_projection(
        dec!(1000),
        snapshot.price.current_price,
        &snapshot.dividends,
        &Scenario::none(),
        clock.0,
    )
    .unwrap();
    assert_eq!(projection.shares_owned, dec!(50));
    assert_eq!(projection.effective_monthly_dividend, dec!(2));
    assert_eq!(projection.expected_monthly_income, dec!(100));
    assert_eq!(projection.expected_annual_income, dec!(1200));
    assert_eq!(projection.trailing_12_month_return, dec!(300));
}

#[tokio::test]
async fn estimate_after_cutoff_stays_within_jitter_bounds() {
    let source = StaticSource::new("TEST", dec!(20), history());
    let clock = FixedClock::ymd(2025, 6, 13);

    for seed in 0..20 {
        let mut entropy = RngEntropy::seeded(seed);
        let snapshot = refresh_once(&source, &clock, &mut entropy).await.unwrap();
        let june = &snapshot.dividends[0];
        assert!(june.is_for(6, 2025));
        assert_eq!(june.provenance, Provenance::Estimated);

        // weights 3,2,1 over 3,2,1 -> 14/6
        let base = dec!(14) / dec!(6);
        assert!(june.amount >= (base * dec!(0.7)).round_dp(4));
        assert!(june.amount <= (base * dec!(1.3)).round_dp(4));
        assert!((5..=8).contains(&chrono::Datelike::day(&june.ex_dividend_date)));
        assert!(june.payment_date > june.ex_dividend_date);
    }
}

#[test]
fn scenario_overrides_and_resets() {
    let series = history();
    let today = ymd(2025, 5, 20);

    let mut scenario = Scenario::preset(ScenarioPreset::Bullish, &series);
    let bullish = compute_projection(dec!(200), dec!(20), &series, &scenario, today).unwrap();
    assert_eq!(bullish.effective_monthly_dividend, dec!(3));
    assert_eq!(bullish.expected_monthly_income, dec!(30));
    assert_eq!(bullish.per_month_returns.iter().filter(|m| m.projected).count(), 12);

    scenario.reset();
    let base = compute_projection(dec!(200), dec!(20), &series, &scenario, today).unwrap();
    assert_eq!(base.effective_monthly_dividend, dec!(2));
    assert!(base.per_month_returns.iter().all(|m| !m.projected));
}

#[test]
fn annualized_yield_guards_price() {
    assert_eq!(annualized_yield(&history(), Decimal::ZERO), Decimal::ZERO);
    assert_eq!(annualized_yield(&[], dec!(20)), Decimal::ZERO);
}
