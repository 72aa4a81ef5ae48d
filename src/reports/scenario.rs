use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::dividends::{mean_amount, DividendRecord};

/// Preset what-if scenarios derived from the dividend history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioPreset {
    Bullish, // 1.5x the historical mean
    Bearish, // 0.5x the historical mean
    Peak,    // Largest historical distribution
    Trough,  // Smallest historical distribution
}

impl ScenarioPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioPreset::Bullish => "Bullish",
            ScenarioPreset::Bearish => "Bearish",
            ScenarioPreset::Peak => "Peak",
            ScenarioPreset::Trough => "Trough",
        }
    }
}

impl FromStr for ScenarioPreset {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullish" | "bull" => Ok(ScenarioPreset::Bullish),
            "bearish" | "bear" => Ok(ScenarioPreset::Bearish),
            "peak" | "max" => Ok(ScenarioPreset::Peak),
            "trough" | "min" => Ok(ScenarioPreset::Trough),
            _ => Err(()),
        }
    }
}

/// A user-chosen monthly dividend used instead of the historical mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub monthly_dividend_amount: Decimal,
    pub is_custom: bool,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::none()
    }
}

impl Scenario {
    /// No scenario: projections use the historical mean.
    pub fn none() -> Self {
        Self {
            name: String::new(),
            monthly_dividend_amount: Decimal::ZERO,
            is_custom: false,
        }
    }

    pub fn custom(name: impl Into<String>, monthly_dividend_amount: Decimal) -> Self {
        Self {
            name: name.into(),
            monthly_dividend_amount,
            is_custom: true,
        }
    }

    /// Build a preset from `series`. Empty history yields a zero amount.
    pub fn preset(preset: ScenarioPreset, series: &[DividendRecord]) -> Self {
        let amounts = series.iter().map(|r| r.amount);
        let amount = match preset {
            ScenarioPreset::Bullish => mean_amount(series) * Decimal::new(15, 1),
            ScenarioPreset::Bearish => mean_amount(series) * Decimal::new(5, 1),
            ScenarioPreset::Peak => amounts.max().unwrap_or(Decimal::ZERO),
            ScenarioPreset::Trough => amounts.min().unwrap_or(Decimal::ZERO),
        };
        Self::custom(preset.as_str(), amount.round_dp(4))
    }

    pub fn reset(&mut self) {
        *self = Self::none();
    }

    /// Monthly dividend a projection should use with this scenario.
    pub fn effective_dividend(&self, series: &[DividendRecord]) -> Decimal {
        if self.is_custom {
            self.monthly_dividend_amount
        } else {
            mean_amount(series)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dividends::test_support::monthly_series;
    use rust_decimal_macros::dec;

    fn series() -> Vec<DividendRecord> {
        monthly_series(4, 2025, &[dec!(1), dec!(3), dec!(2), dec!(6)])
    }

    #[test]
    fn test_presets_follow_history() {
        let s = series();
        assert_eq!(Scenario::preset(ScenarioPreset::Bullish, &s).monthly_dividend_amount, dec!(4.5));
        assert_eq!(Scenario::preset(ScenarioPreset::Bearish, &s).monthly_dividend_amount, dec!(1.5));
        assert_eq!(Scenario::preset(ScenarioPreset::Peak, &s).monthly_dividend_amount, dec!(6));
        assert_eq!(Scenario::preset(ScenarioPreset::Trough, &s).monthly_dividend_amount, dec!(1));
        assert!(Scenario::preset(ScenarioPreset::Peak, &s).is_custom);
    }

    #[test]
    fn test_presets_on_empty_history() {
        let peak = Scenario::preset(ScenarioPreset::Peak, &[]);
        assert_eq!(peak.monthly_dividend_amount, Decimal::ZERO);
        assert_eq!(peak.name, "Peak");
    }

    #[test]
    fn test_reset_reverts_to_historical_mean() {
        let s = series();
        let mut scenario = Scenario::preset(ScenarioPreset::Bullish, &s);
        assert_eq!(scenario.effective_dividend(&s), dec!(4.5));

        scenario.reset();
        assert!(!scenario.is_custom);
        assert!(scenario.name.is_empty());
        assert_eq!(scenario.effective_dividend(&s), dec!(3));
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("Bullish".parse::<ScenarioPreset>(), Ok(ScenarioPreset::Bullish));
        assert_eq!("min".parse::<ScenarioPreset>(), Ok(ScenarioPreset::Trough));
        assert!("sideways".parse::<ScenarioPreset>().is_err());
    }
}
