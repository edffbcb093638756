//! Wiring of providers and alerting for a run.
//!
//! # Example
//!
//! ```rust,ignore
//! use signalrank_core::routing::ProviderSetBuilder;
//!
//! // Live KRX + Naver adapters, alerts to Telegram when configured
//! let providers = ProviderSetBuilder::new()
//!     .with_alert_config(config.alert.clone())
//!     .build()?;
//!
//! // Or deterministic fixtures ending at the run date
//! let mock = ProviderSetBuilder::new()
//!     .with_mock_mode(run_date)
//!     .build()?;
//! ```

use std::sync::Arc;

use crate::adapters::{KrxAdapter, NaverAdapter, StaticMarketData};
use crate::alert::{Alerter, LogAlerter, TelegramAlerter};
use crate::config::AlertConfig;
use crate::data_source::{High52Source, MarketDataProvider, ProviderError};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::TradeDate;

/// Collaborators the engine fetches through and alerts to.
#[derive(Clone)]
pub struct ProviderSet {
    pub market_data: Arc<dyn MarketDataProvider>,
    pub high52: Arc<dyn High52Source>,
    pub alerter: Arc<dyn Alerter>,
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSet")
            .field("market_data", &self.market_data.id())
            .field("high52", &self.high52.id())
            .finish()
    }
}

#[derive(Default)]
pub struct ProviderSetBuilder {
    mock_date: Option<TradeDate>,
    alert: AlertConfig,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl ProviderSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve fixtures ending at `run_date`. Alerts only go to the log.
    pub fn with_mock_mode(mut self, run_date: TradeDate) -> Self {
        self.mock_date = Some(run_date);
        self
    }

    pub fn with_alert_config(mut self, alert: AlertConfig) -> Self {
        self.alert = alert;
        self
    }

    /// Share one transport between adapters and the alerter.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn build(self) -> Result<ProviderSet, ProviderError> {
        if let Some(run_date) = self.mock_date {
            let data = Arc::new(StaticMarketData::sample(run_date)?);
            return Ok(ProviderSet {
                market_data: data.clone(),
                high52: data,
                alerter: Arc::new(LogAlerter),
            });
        }

        let http_client: Arc<dyn HttpClient> = self
            .http_client
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));

        let alerter: Arc<dyn Alerter> = match self.alert.telegram() {
            Some((token, chat_id)) => Arc::new(TelegramAlerter::new(
                Arc::clone(&http_client),
                token,
                chat_id,
            )),
            None => {
                tracing::warn!("telegram alerting not configured, alerts go to the log only");
                Arc::new(LogAlerter)
            }
        };

        Ok(ProviderSet {
            market_data: Arc::new(KrxAdapter::with_http_client(Arc::clone(&http_client))),
            high52: Arc::new(NaverAdapter::with_http_client(http_client)),
            alerter,
        })
    }
}
