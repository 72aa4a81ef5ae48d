//! Command execution
//!
//! Builds the data source, clock and entropy from the parsed CLI and config,
//! then runs one command. All output goes to stdout; logs go to stderr.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::cli::formatters;
use crate::cli::{Cli, Commands};
use crate::clock::{Clock, FixedClock, SystemClock};
use crate::config::{Config, MAX_AMOUNT};
use crate::dividends::{DividendRecord, RngEntropy};
use crate::error::{IncomeError, Result};
use crate::pricing::{FallbackSource, MarketData, PriceSnapshot, StaticSource, YahooSource};
use crate::refresh::{refresh_once, run_periodic, DashboardSnapshot, RefreshTrigger};
use crate::reports::{compute_projection, Scenario, ScenarioPreset};

/// Environment variable that forces offline mode when set to `1` or `true`
pub const OFFLINE_ENV: &str = "ETF_INCOME_OFFLINE";

/// Data source chosen at startup
pub enum Provider {
    Offline(StaticSource),
    Online(FallbackSource<YahooSource>),
}

impl Provider {
    pub fn from_config(config: &Config, offline: bool) -> Result<Self> {
        let table = config.static_source()?;
        if offline {
            info!("Offline mode: serving the fallback table for {}", config.ticker);
            return Ok(Provider::Offline(table));
        }
        let live = YahooSource::new(config.ticker.clone())?;
        Ok(Provider::Online(FallbackSource::new(
            live,
            table,
            config.fetch_timeout(),
        )))
    }
}

impl MarketData for Provider {
    async fn fetch_price(&self) -> Result<PriceSnapshot> {
        match self {
            Provider::Offline(s) => s.fetch_price().await,
            Provider::Online(s) => s.fetch_price().await,
        }
    }

    async fn fetch_dividend_history(&self) -> Result<Vec<DividendRecord>> {
        match self {
            Provider::Offline(s) => s.fetch_dividend_history().await,
            Provider::Online(s) => s.fetch_dividend_history().await,
        }
    }
}

/// Whether the offline environment switch is on
pub fn offline_from_env() -> bool {
    std::env::var(OFFLINE_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Parse a non-negative money amount given on the command line.
pub fn parse_amount(what: &str, raw: &str) -> Result<Decimal> {
    let value = Decimal::from_str(raw.trim().trim_start_matches('$').replace(',', "").as_str())
        .map_err(|_| IncomeError::InvalidInput(format!("{} '{}' is not a number", what, raw)))?;
    if value < Decimal::ZERO {
        return Err(IncomeError::InvalidInput(format!("{} must not be negative", what)).into());
    }
    if value > MAX_AMOUNT {
        return Err(
            IncomeError::InvalidInput(format!("{} must not exceed {}", what, MAX_AMOUNT)).into(),
        );
    }
    Ok(value)
}

/// Scenario from `--scenario` / `--custom`; neither means no scenario.
pub fn resolve_scenario(
    preset: Option<&str>,
    custom: Option<&str>,
    series: &[DividendRecord],
) -> Result<Scenario> {
    if let Some(raw) = custom {
        let amount = parse_amount("custom dividend", raw)?;
        return Ok(Scenario::custom("Custom", amount));
    }
    match preset {
        Some(name) => {
            let preset = ScenarioPreset::from_str(name).map_err(|_| {
                IncomeError::InvalidInput(format!(
                    "unknown scenario '{}' (expected bullish, bearish, peak or trough)",
                    name
                ))
            })?;
            Ok(Scenario::preset(preset, series))
        }
        None => Ok(Scenario::none()),
    }
}

struct Session {
    config: Config,
    provider: Provider,
    clock: Box<dyn Clock>,
    entropy: RngEntropy<StdRng>,
    json: bool,
}

impl Session {
    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    async fn refresh(&mut self) -> Result<DashboardSnapshot> {
        let clock = self.clock.as_ref();
        refresh_once(&self.provider, &clock, &mut self.entropy).await
    }

    fn print_show(&self, snapshot: &DashboardSnapshot, investment: Decimal, scenario: &Scenario) {
        let projection = compute_projection(
            investment,
            snapshot.price.current_price,
            &snapshot.dividends,
            scenario,
            self.clock().today(),
        );

        if self.json {
            println!(
                "{}",
                formatters::format_show_json(snapshot, investment, scenario, projection.as_ref())
            );
            return;
        }

        print!(
            "{}",
            formatters::format_price_header(&snapshot.price, snapshot.annualized_yield_percent)
        );
        match projection {
            Some(p) => print!("{}", formatters::format_projection(investment, &p, scenario)),
            None => print!(
                "{}",
                formatters::format_no_projection(snapshot.price.current_price)
            ),
        }
    }

    fn print_dividends(&self, snapshot: &DashboardSnapshot) {
        if self.json {
            println!("{}", formatters::format_dividends_json(&snapshot.dividends));
        } else {
            print!("{}", formatters::format_dividends_table(&snapshot.dividends));
        }
    }
}

/// Execute the parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(ticker) = cli.ticker.as_deref() {
        config.ticker = ticker.trim().to_uppercase();
    }
    let offline = cli.offline || offline_from_env();

    let clock: Box<dyn Clock> = match cli.as_of.as_deref() {
        Some(raw) => Box::new(FixedClock(parse_date(raw)?)),
        None => Box::new(SystemClock),
    };
    let entropy = match cli.seed {
        Some(seed) => RngEntropy::seeded(seed),
        None => RngEntropy::from_os(),
    };

    let mut session = Session {
        provider: Provider::from_config(&config, offline)?,
        config,
        clock,
        entropy,
        json: cli.json,
    };

    match cli.command {
        Commands::Show {
            amount,
            scenario,
            custom,
        } => {
            let investment = match amount.as_deref() {
                Some(raw) => parse_amount("amount", raw)?,
                None => session.config.investment_amount,
            };
            let snapshot = session.refresh().await?;
            let scenario =
                resolve_scenario(scenario.as_deref(), custom.as_deref(), &snapshot.dividends)?;
            session.print_show(&snapshot, investment, &scenario);
            Ok(())
        }

        Commands::Dividends => {
            let snapshot = session.refresh().await?;
            session.print_dividends(&snapshot);
            Ok(())
        }

        Commands::ForceUpdate => {
            let snapshot = session.refresh().await?;
            let clock = session.clock.as_ref();
            let updated = snapshot.force_updated(&clock, &mut session.entropy);
            session.print_dividends(&updated);
            Ok(())
        }

        Commands::Watch { interval } => run_watch(&mut session, interval).await,
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        IncomeError::InvalidInput(format!("date '{}' must be YYYY-MM-DD", raw)).into()
    })
}

/// One line typed while watching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchInput {
    Trigger(RefreshTrigger),
    Quit,
}

pub fn parse_watch_input(line: &str) -> Option<WatchInput> {
    match line.trim().to_ascii_lowercase().as_str() {
        "r" | "refresh" => Some(WatchInput::Trigger(RefreshTrigger::Manual)),
        "f" | "force" | "force-update" => Some(WatchInput::Trigger(RefreshTrigger::ForceUpdate)),
        "q" | "quit" | "exit" => Some(WatchInput::Quit),
        _ => None,
    }
}

async fn run_watch(session: &mut Session, interval: Option<u64>) -> Result<()> {
    let interval = match interval {
        Some(0) => {
            return Err(IncomeError::InvalidInput("interval must be > 0".to_string()).into())
        }
        Some(secs) => std::time::Duration::from_secs(secs),
        None => session.config.refresh_interval(),
    };
    let investment = session.config.investment_amount;

    let (trigger_tx, trigger_rx) = mpsc::channel(8);
    let (publish_tx, mut publish_rx) = watch::channel::<Option<Arc<DashboardSnapshot>>>(None);

    if !session.json {
        eprintln!(
            "Watching {} every {}s. Type r (refresh), f (force update) or q (quit).",
            session.config.ticker,
            interval.as_secs()
        );
    }

    let shutdown = async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                line = lines.next_line(), if stdin_open => match line {
                    Ok(Some(line)) => match parse_watch_input(&line) {
                        Some(WatchInput::Quit) => break,
                        Some(WatchInput::Trigger(t)) => {
                            if trigger_tx.send(t).await.is_err() {
                                break;
                            }
                        }
                        None if line.trim().is_empty() => {}
                        None => warn!("Unknown input '{}'", line.trim()),
                    },
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        warn!("Stopped reading stdin: {}", e);
                        stdin_open = false;
                    }
                },
            }
        }
    };

    let provider = &session.provider;
    let clock = session.clock.as_ref();
    let json = session.json;
    let entropy = &mut session.entropy;

    let render = async {
        while publish_rx.changed().await.is_ok() {
            let latest = publish_rx.borrow_and_update().clone();
            let Some(snapshot) = latest else { continue };
            let scenario = Scenario::none();
            let projection = compute_projection(
                investment,
                snapshot.price.current_price,
                &snapshot.dividends,
                &scenario,
                clock.today(),
            );
            if json {
                println!(
                    "{}",
                    formatters::format_show_json(&snapshot, investment, &scenario, projection.as_ref())
                );
                continue;
            }
            print!(
                "{}",
                formatters::format_price_header(&snapshot.price, snapshot.annualized_yield_percent)
            );
            print!("{}", formatters::format_dividends_table(&snapshot.dividends));
            if let Some(p) = projection {
                print!("{}", formatters::format_projection(investment, &p, &scenario));
            }
        }
    };

    tokio::join!(
        run_periodic(provider, &clock, entropy, interval, trigger_rx, publish_tx, shutdown),
        render,
    );
    Ok(())
}
