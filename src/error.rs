//! Error handling for the income engine
//!
//! Defines the error taxonomy and a unified Result type using anyhow for
//! context chaining. Core calculations never return these: they fall back to
//! neutral values. Only the outer layers (data sources, config, CLI) surface
//! errors, and fetch errors are absorbed by `pricing::FallbackSource`.

use thiserror::Error;

/// Core error types for the income engine
#[derive(Error, Debug)]
pub enum IncomeError {
    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Result type alias for income operations
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_formatting_is_readable() {
        let err = IncomeError::Fetch("timed out after 10s".to_string());
        assert_eq!(err.to_string(), "fetch error: timed out after 10s");
    }

    #[test]
    fn test_anyhow_context_chains_errors() {
        use anyhow::Context;
        let result: Result<()> = Err(anyhow::Error::new(IncomeError::Config(
            "refresh_interval_secs must be > 0".to_string(),
        )))
        .context("failed to load configuration");

        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to load configuration"));
        let root = err.root_cause().to_string();
        assert!(root.starts_with("config error"));
    }

    #[test]
    fn test_income_error_variants() {
        let fetch = IncomeError::Fetch("test".to_string());
        assert!(fetch.to_string().starts_with("fetch error"));

        let invalid = IncomeError::InvalidInput("test".to_string());
        assert!(invalid.to_string().starts_with("invalid input"));

        let io: IncomeError = std::io::Error::other("disk").into();
        assert_eq!(io.to_string(), "io error");
    }
}
