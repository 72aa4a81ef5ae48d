//! ETF Income - dividend income projections for monthly-distribution ETFs
//!
//! This library fetches a fund's price and dividend history, fills in
//! distributions that have not been reported yet, and projects income for
//! an investment amount under optional what-if scenarios.

pub mod cli;
pub mod clock;
pub mod config;
pub mod dividends;
pub mod error;
pub mod pricing;
pub mod refresh;
pub mod reports;
pub mod utils;
