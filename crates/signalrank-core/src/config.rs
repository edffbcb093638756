//! Run configuration.
//!
//! [`SignalConfig`] carries every threshold, delay, id and path with the
//! documented defaults; [`SignalConfig::from_env`] overlays `SIGNALRANK_*`
//! environment variables. [`RunContext`] is derived from it for one run date.

use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::rs::RsConfig;
use crate::{ConfigError, Market, TradeDate, ValidationError};

pub const ENV_RETRY_MAX_ATTEMPTS: &str = "SIGNALRANK_RETRY_MAX_ATTEMPTS";
pub const ENV_RETRY_DELAY_SECS: &str = "SIGNALRANK_RETRY_DELAY_SECS";
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "SIGNALRANK_TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "SIGNALRANK_TELEGRAM_CHAT_ID";
pub const ENV_OUTPUT_DIR: &str = "SIGNALRANK_OUTPUT_DIR";

/// Delays between successive provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    /// Between two instruments of one ranking.
    pub instrument: Duration,
    /// Between two markets of the relative-strength step.
    pub market: Duration,
    /// Between two pages of the 52-week-high listing.
    pub page: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            instrument: Duration::from_millis(100),
            market: Duration::from_secs(1),
            page: Duration::from_millis(200),
        }
    }
}

impl PacingConfig {
    /// No waiting anywhere. Used by tests and mock runs.
    pub const fn none() -> Self {
        Self {
            instrument: Duration::ZERO,
            market: Duration::ZERO,
            page: Duration::ZERO,
        }
    }
}

/// Telegram destination for operator alerts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertConfig {
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl AlertConfig {
    /// Token and chat id, when both are configured.
    pub fn telegram(&self) -> Option<(&str, &str)> {
        match (&self.telegram_bot_token, &self.telegram_chat_id) {
            (Some(token), Some(chat)) => Some((token.as_str(), chat.as_str())),
            _ => None,
        }
    }
}

/// Paging of the 52-week-high listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct High52Config {
    /// Stock entries kept in provider order.
    pub limit: usize,
    /// Entries requested per provider page.
    pub page_size: usize,
    /// Rows per rendered page.
    pub rows_per_page: usize,
}

impl Default for High52Config {
    fn default() -> Self {
        Self {
            limit: 20,
            page_size: 100,
            rows_per_page: 10,
        }
    }
}

/// Complete configuration of a signal run.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub retry: RetryPolicy,
    pub pacing: PacingConfig,
    pub rs: RsConfig,
    pub rs_periods: Vec<usize>,
    pub top_n: usize,
    pub lookback_days: u32,
    pub markets: Vec<Market>,
    pub high52: High52Config,
    pub alert: AlertConfig,
    pub output_dir: Option<PathBuf>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            pacing: PacingConfig::default(),
            rs: RsConfig::default(),
            rs_periods: vec![20, 60, 120],
            top_n: 15,
            lookback_days: 15,
            markets: Market::ALL.to_vec(),
            high52: High52Config::default(),
            alert: AlertConfig::default(),
            output_dir: None,
        }
    }
}

impl SignalConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Overlay values from `lookup`. Blank values are ignored.
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = read(ENV_RETRY_MAX_ATTEMPTS) {
            self.retry.max_attempts = value.trim().parse().map_err(|_| ConfigError::InvalidEnvValue {
                name: ENV_RETRY_MAX_ATTEMPTS,
                value: value.clone(),
            })?;
        }
        if let Some(value) = read(ENV_RETRY_DELAY_SECS) {
            self.retry.delay = value
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
                .ok_or_else(|| ConfigError::InvalidEnvValue {
                    name: ENV_RETRY_DELAY_SECS,
                    value: value.clone(),
                })?;
        }
        if let Some(value) = read(ENV_TELEGRAM_BOT_TOKEN) {
            self.alert.telegram_bot_token = Some(value);
        }
        if let Some(value) = read(ENV_TELEGRAM_CHAT_ID) {
            self.alert.telegram_chat_id = Some(value);
        }
        if let Some(value) = read(ENV_OUTPUT_DIR) {
            self.output_dir = Some(PathBuf::from(value));
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.top_n == 0 {
            return Err(ValidationError::ZeroTopN);
        }
        if self.rs_periods.iter().any(|period| *period == 0) {
            return Err(ValidationError::ZeroPeriod);
        }
        if self.high52.limit == 0 || self.high52.page_size == 0 || self.high52.rows_per_page == 0 {
            return Err(ValidationError::ZeroListingSize);
        }
        RsConfig::new(self.rs.base, self.rs.scale)?;
        Ok(())
    }
}

/// Parameters of one run, derived from the run date and the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_date: TradeDate,
    /// First date of the net-buying streak window.
    pub lookback_start: TradeDate,
    pub markets: Vec<Market>,
    pub top_n: usize,
    pub rs_periods: Vec<usize>,
}

impl RunContext {
    pub fn for_date(run_date: TradeDate, config: &SignalConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            run_date,
            lookback_start: run_date.minus_days(config.lookback_days),
            markets: config.markets.clone(),
            top_n: config.top_n,
            rs_periods: config.rs_periods.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_daily_schedule() {
        let config = SignalConfig::default();
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay, Duration::from_secs(20));
        assert_eq!(config.top_n, 15);
        assert_eq!(config.rs_periods, vec![20, 60, 120]);
        assert_eq!(config.pacing.instrument, Duration::from_millis(100));
        assert_eq!(config.high52.limit, 20);
    }

    #[test]
    fn environment_overrides_retry_and_output() {
        let config = SignalConfig::default()
            .overlay(env(&[
                (ENV_RETRY_MAX_ATTEMPTS, "3"),
                (ENV_RETRY_DELAY_SECS, "0.5"),
                (ENV_OUTPUT_DIR, "/tmp/reports"),
                (ENV_TELEGRAM_CHAT_ID, " "),
            ]))
            .expect("valid");

        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay, Duration::from_millis(500));
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/reports")));
        assert_eq!(config.alert.telegram_chat_id, None);
    }

    #[test]
    fn malformed_environment_value_is_a_config_error() {
        let error = SignalConfig::default()
            .overlay(env(&[(ENV_RETRY_DELAY_SECS, "soon")]))
            .expect_err("must fail");
        assert_eq!(
            error,
            ConfigError::InvalidEnvValue {
                name: ENV_RETRY_DELAY_SECS,
                value: String::from("soon"),
            }
        );
    }

    #[test]
    fn out_of_range_retry_delay_is_a_config_error() {
        for raw in ["1e30", "-1", "NaN", "inf"] {
            let error = SignalConfig::default()
                .overlay(env(&[(ENV_RETRY_DELAY_SECS, raw)]))
                .expect_err("must fail");
            assert_eq!(
                error,
                ConfigError::InvalidEnvValue {
                    name: ENV_RETRY_DELAY_SECS,
                    value: String::from(raw),
                }
            );
        }
    }

    #[test]
    fn run_context_derives_lookback_window() {
        let run_date = TradeDate::parse("20250217").expect("valid");
        let context = RunContext::for_date(run_date, &SignalConfig::default()).expect("valid");
        assert_eq!(context.lookback_start, TradeDate::parse("20250202").expect("valid"));
        assert_eq!(context.markets, vec![Market::Kospi, Market::Kosdaq]);
    }

    #[test]
    fn zero_top_n_is_rejected() {
        let config = SignalConfig {
            top_n: 0,
            ..SignalConfig::default()
        };
        let run_date = TradeDate::parse("20250217").expect("valid");
        assert_eq!(
            RunContext::for_date(run_date, &config).expect_err("must fail"),
            ValidationError::ZeroTopN
        );
    }
}
