//! # Signalrank Core
//!
//! Resilient fetching and signal ranking for KRX equities.
//!
//! ## Overview
//!
//! This crate computes the daily market-signal tables:
//!
//! - **Trading volume** ranking of the whole exchange
//! - **Investor net buying** per category, tagged with consecutive-buying streaks
//! - **Relative strength** scores against the market benchmark
//! - **52-week highs** from a paginated listing
//!
//! Every provider call goes through one bounded retry policy; exhausted
//! retries raise a single operator alert and the affected instrument or
//! market-period is left out.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (KRX, Naver, in-memory fixtures) |
//! | [`alert`] | Operator alerting (Telegram, log, recording) |
//! | [`config`] | Run configuration and per-date run context |
//! | [`data_source`] | Provider traits and request types |
//! | [`domain`] | Domain models (Ticker, TimeSeries, RankingEntry) |
//! | [`engine`] | Step runner publishing to a sink |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`instruments`] | Listing and memoized name lookup |
//! | [`ranking`] | Top-N ranking |
//! | [`reports`] | Report builders |
//! | [`retry`] | Bounded fixed-delay retry with alerting |
//! | [`routing`] | Provider wiring for live and mock runs |
//! | [`rs`] | Relative strength calculation |
//! | [`sink`] | Report sinks |
//! | [`streak`] | Consecutive positive run detection |
//! | [`throttling`] | Call pacing |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use signalrank_core::{
//!     JsonFileSink, ProviderSetBuilder, ReportKind, RunContext, SignalConfig, SignalEngine,
//!     TradeDate,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SignalConfig::from_env()?;
//!     let run = RunContext::for_date(TradeDate::today(), &config)?;
//!     let providers = ProviderSetBuilder::new()
//!         .with_alert_config(config.alert.clone())
//!         .build()?;
//!     let sink = Arc::new(JsonFileSink::new(config.output_dir.clone()));
//!
//!     let engine = SignalEngine::new(
//!         config,
//!         providers.market_data,
//!         providers.high52,
//!         sink,
//!         providers.alerter,
//!     );
//!     let summary = engine.run(&run, &ReportKind::ALL).await;
//!     println!("complete: {}", summary.is_complete());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Cron     │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Signal Engine  │────▶│ Report Sink      │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Report Builders │────▶│ Ranking / RS /   │
//! │                 │     │ Streak           │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Resilient       │────▶│ Alerter          │
//! │ Fetcher         │     └──────────────────┘
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Market Data     │────▶│ HTTP Client      │
//! │ (Adapter Trait) │     │ (reqwest/none)   │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Provider calls fail with a structured [`ProviderError`]; the retry layer
//! turns exhausted attempts into a [`FetchOutcome::PermanentFailure`]:
//!
//! ```rust
//! use signalrank_core::{FetchOutcome, ProviderErrorKind};
//!
//! fn describe(outcome: FetchOutcome<Vec<u32>>) -> String {
//!     match outcome {
//!         FetchOutcome::Success(rows) => format!("{} rows", rows.len()),
//!         FetchOutcome::PermanentFailure(failure) => match &failure.last_failure {
//!             signalrank_core::AttemptFailure::Provider(error)
//!                 if error.kind() == ProviderErrorKind::Status =>
//!             {
//!                 format!("provider rejected the request: {error}")
//!             }
//!             _ => failure.to_string(),
//!         },
//!     }
//! }
//! ```

pub mod adapters;
pub mod alert;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod engine;
pub mod error;
pub mod http_client;
pub mod instruments;
pub mod ranking;
pub mod reports;
pub mod retry;
pub mod routing;
pub mod rs;
pub mod sink;
pub mod streak;
pub mod throttling;

// Adapter implementations
pub use adapters::{FailureMode, KrxAdapter, NaverAdapter, StaticMarketData};

// Alerting
pub use alert::{Alerter, LogAlerter, RecordingAlerter, TelegramAlerter};

// Configuration
pub use config::{AlertConfig, High52Config, PacingConfig, RunContext, SignalConfig};

// Provider traits and request types
pub use data_source::{
    DailyQuotesRequest, DateRange, High52Request, High52Source, IndexSeriesRequest,
    InvestorFlowRequest, MarketDataProvider, NetBuyingRequest, PriceSeriesRequest, ProviderError,
    ProviderErrorKind,
};

// Domain models
pub use domain::{
    DailyQuote, High52Entry, High52Page, IndexCode, Instrument, InvestorCategory, InvestorFlowRow,
    InvestorFlows, Market, MarketScope, NetBuyingRecord, RankingEntry, RsWindowResult, SeriesPoint,
    Ticker, TimeSeries, TradeDate, UNKNOWN_NAME,
};

// Engine
pub use engine::{RunSummary, SignalEngine, StepOutcome, StepResult};

// Error types
pub use error::{ConfigError, CoreError, SinkError, ValidationError};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpFuture, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

// Instruments
pub use instruments::InstrumentResolver;

// Ranking
pub use ranking::{top_n, RankingAggregator};

// Reports
pub use reports::{Report, ReportKind};

// Retry logic
pub use retry::{
    AttemptFailure, FetchFailure, FetchOutcome, FetchPayload, OperationDescriptor,
    ResilientFetcher, RetryPolicy,
};

// Routing
pub use routing::{ProviderSet, ProviderSetBuilder};

// Relative strength
pub use rs::{compute_rs, RsCalculator, RsConfig, RsScore};

// Sinks
pub use sink::{JsonFileSink, MemorySink, PublishedReport, ReportSink};

// Streaks
pub use streak::consecutive_positive_run;

// Throttling
pub use throttling::Pacer;
