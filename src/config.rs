//! Configuration file support
//!
//! Settings live in `<config_home>/etf-income/config.toml`. A missing file
//! means defaults; a present but invalid file is an error.
//!
//! ```toml
//! ticker = "MSTY"
//! investment_amount = "10000"
//! refresh_interval_secs = 300
//! fetch_timeout_secs = 10
//! fallback_price = "25.12"
//!
//! [[fallback_dividends]]
//! month = "May"
//! year = 2025
//! amount = "2.3734"
//! ex_date = "2025-05-06"
//! ```

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::dividends::{parse_month, DividendRecord};
use crate::error::{IncomeError, Result};
use crate::pricing::fallback::{builtin_dividends, confirmed_record, BUILTIN_FALLBACK_PRICE};
use crate::pricing::StaticSource;

pub const APP_DIR: &str = "etf-income";
pub const CONFIG_FILE: &str = "config.toml";

/// Largest money amount accepted from config or the command line (10^15)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);
/// Smallest fallback price accepted (0.0001)
pub const MIN_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// Month given either as a number or as a name in the config file
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MonthSpec {
    Index(u32),
    Name(String),
}

impl MonthSpec {
    fn resolve(&self) -> Option<u32> {
        match self {
            MonthSpec::Index(n) => (1..=12).contains(n).then_some(*n),
            MonthSpec::Name(s) => parse_month(s),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FallbackDividend {
    pub month: MonthSpec,
    pub year: i32,
    pub amount: Decimal,
    pub ex_date: Option<NaiveDate>,
    pub pay_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ticker: String,
    pub investment_amount: Decimal,
    pub refresh_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub fallback_price: Decimal,
    pub fallback_dividends: Vec<FallbackDividend>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ticker: "MSTY".to_string(),
            investment_amount: Decimal::from(10_000),
            refresh_interval_secs: 300,
            fetch_timeout_secs: 10,
            fallback_price: BUILTIN_FALLBACK_PRICE,
            fallback_dividends: Vec::new(),
        }
    }
}

/// Default config path, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist; the default location may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if required {
                return Err(anyhow!("Config file not found: {}", path.display()));
            }
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| IncomeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> anyhow::Error { IncomeError::Config(msg).into() };

        if self.ticker.trim().is_empty() {
            return Err(invalid("ticker must not be empty".to_string()));
        }
        if self.refresh_interval_secs == 0 {
            return Err(invalid("refresh_interval_secs must be > 0".to_string()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(invalid("fetch_timeout_secs must be > 0".to_string()));
        }
        if self.fallback_price < MIN_PRICE || self.fallback_price > MAX_AMOUNT {
            return Err(invalid(format!(
                "fallback_price must be between {} and {}",
                MIN_PRICE, MAX_AMOUNT
            )));
        }
        if self.investment_amount < Decimal::ZERO {
            return Err(invalid("investment_amount must not be negative".to_string()));
        }
        if self.investment_amount > MAX_AMOUNT {
            return Err(invalid(format!("investment_amount must not exceed {}", MAX_AMOUNT)));
        }
        // surfaces month/amount/duplicate errors
        self.fallback_records()?;
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Configured fallback table as confirmed records (built-in table if none).
    pub fn fallback_records(&self) -> Result<Vec<DividendRecord>> {
        if self.fallback_dividends.is_empty() {
            return Ok(builtin_dividends().to_vec());
        }

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(self.fallback_dividends.len());
        for entry in &self.fallback_dividends {
            let month = entry.month.resolve().ok_or_else(|| {
                IncomeError::Config(format!("invalid month {:?} in fallback_dividends", entry.month))
            })?;
            if entry.amount < Decimal::ZERO || entry.amount > MAX_AMOUNT {
                return Err(IncomeError::Config(format!(
                    "amount out of range for {}/{}",
                    month, entry.year
                ))
                .into());
            }
            if !seen.insert((entry.year, month)) {
                return Err(IncomeError::Config(format!(
                    "duplicate fallback dividend for {}/{}",
                    month, entry.year
                ))
                .into());
            }

            let ex_date = match entry.ex_date {
                Some(d) => d,
                None => NaiveDate::from_ymd_opt(entry.year, month, 6).ok_or_else(|| {
                    IncomeError::Config(format!("invalid date {}/{}", month, entry.year))
                })?,
            };
            if matches!(entry.pay_date, Some(pay) if pay < ex_date) {
                return Err(IncomeError::Config(format!(
                    "pay_date before ex_date for {}/{}",
                    month, entry.year
                ))
                .into());
            }
            records.push(confirmed_record(month, entry.year, entry.amount, ex_date, entry.pay_date));
        }
        Ok(records)
    }

    pub fn static_source(&self) -> Result<StaticSource> {
        Ok(StaticSource::new(
            self.ticker.clone(),
            self.fallback_price,
            self.fallback_records()?,
        ))
    }
}
