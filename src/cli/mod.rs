use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod formatters;
pub mod runner;

pub use runner::run;

#[derive(Parser)]
#[command(name = "etf-income")]
#[command(
    version,
    about = "Dividend income projections for monthly-distribution ETFs"
)]
#[command(
    long_about = "Track a monthly-distribution ETF's price and dividend history, estimate distributions that have not been reported yet, and project income for an investment amount."
)]
pub struct Cli {
    /// Path to a config file (default: <config dir>/etf-income/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Ticker to track (overrides the config file)
    #[arg(long, global = true)]
    pub ticker: Option<String>,

    /// Never contact data providers; use the fallback table only
    #[arg(long, global = true)]
    pub offline: bool,

    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Seed for estimate randomness (reproducible output)
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long = "as-of", global = true)]
    pub as_of: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Refresh once and show price, yield and income projection
    Show {
        /// Amount invested (overrides the config file)
        #[arg(short, long)]
        amount: Option<String>,

        /// Preset scenario: bullish, bearish, peak or trough
        #[arg(short, long, conflicts_with = "custom")]
        scenario: Option<String>,

        /// Custom monthly dividend per share
        #[arg(short, long)]
        custom: Option<String>,
    },

    /// Show the reconciled dividend history
    Dividends,

    /// Replace the current month's dividend with a fresh estimate
    ForceUpdate,

    /// Refresh periodically; type r (refresh), f (force update) or q (quit)
    Watch {
        /// Seconds between refreshes (overrides the config file)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}
