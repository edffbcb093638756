//! Market data provider traits and request/response types.
//!
//! This module defines the adapter contracts the signal engine fetches
//! through, along with the request types for each endpoint.
//!
//! # Endpoints
//!
//! | Endpoint | Request | Response | Description |
//! |----------|---------|----------|-------------|
//! | Price series | [`PriceSeriesRequest`] | [`TimeSeries`] | Daily closes of one instrument |
//! | Index series | [`IndexSeriesRequest`] | [`TimeSeries`] | Daily closes of a benchmark index |
//! | Net buying | [`NetBuyingRequest`] | `Vec<NetBuyingRecord>` | Net purchases by investor category |
//! | Instrument list | [`Market`] | `Vec<Ticker>` | Listed tickers of one market |
//! | Instrument name | [`Ticker`] | `String` | Display name lookup |
//! | Investor flows | [`InvestorFlowRequest`] | [`InvestorFlows`] | Per-date net buying of one ticker |
//! | Daily quotes | [`DailyQuotesRequest`] | `Vec<DailyQuote>` | End-of-day listing |
//! | 52-week highs | [`High52Request`] | [`High52Page`] | Paginated new-high listing |
//!
//! Any endpoint may legitimately return an empty result for a valid query;
//! the resilient fetcher treats that the same as an error.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{
    DailyQuote, High52Page, IndexCode, InvestorCategory, InvestorFlows, Market, MarketScope,
    NetBuyingRecord, Ticker, TimeSeries, TradeDate,
};

/// Boxed future returned by provider endpoints.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Provider-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Transport,
    Status,
    Parse,
    InvalidRequest,
    Internal,
}

/// Structured error raised by a single provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
}

impl ProviderError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn status(status: u16, provider: &str) -> Self {
        Self {
            kind: ProviderErrorKind::Status,
            message: format!("{provider} returned status {status}"),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Parse,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::InvalidRequest,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Internal,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::Transport => "provider.transport",
            ProviderErrorKind::Status => "provider.status",
            ProviderErrorKind::Parse => "provider.parse",
            ProviderErrorKind::InvalidRequest => "provider.invalid_request",
            ProviderErrorKind::Internal => "provider.internal",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ProviderError {}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: TradeDate,
    pub end: TradeDate,
}

impl DateRange {
    pub fn new(start: TradeDate, end: TradeDate) -> Result<Self, ProviderError> {
        if start > end {
            return Err(ProviderError::invalid_request(format!(
                "date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn single(date: TradeDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}~{}", self.start.compact(), self.end.compact())
    }
}

/// Request payload for instrument price history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSeriesRequest {
    pub ticker: Ticker,
    pub range: DateRange,
}

/// Request payload for benchmark index history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSeriesRequest {
    pub index: IndexCode,
    pub range: DateRange,
}

/// Request payload for investor net purchases of one market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetBuyingRequest {
    pub market: Market,
    pub investor: InvestorCategory,
    pub range: DateRange,
}

/// Request payload for the per-date investor flows of one ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvestorFlowRequest {
    pub ticker: Ticker,
    pub range: DateRange,
    /// Request the detailed investor breakdown (fund categories).
    pub detail: bool,
}

/// Request payload for the end-of-day listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyQuotesRequest {
    pub date: TradeDate,
    pub scope: MarketScope,
}

/// Request payload for one page of the 52-week-high listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct High52Request {
    pub page: usize,
    pub page_size: usize,
}

impl High52Request {
    pub fn new(page: usize, page_size: usize) -> Result<Self, ProviderError> {
        if page == 0 || page_size == 0 {
            return Err(ProviderError::invalid_request(
                "52-week page and page size start at 1",
            ));
        }
        Ok(Self { page, page_size })
    }
}

/// Market data provider contract.
///
/// # Required Methods
///
/// | Method | Description |
/// |--------|-------------|
/// | [`id`](MarketDataProvider::id) | Provider identifier for logs and alerts |
/// | [`price_series`](MarketDataProvider::price_series) | Instrument closes |
/// | [`index_series`](MarketDataProvider::index_series) | Index closes |
/// | [`net_buying`](MarketDataProvider::net_buying) | Net purchases by investor |
/// | [`instrument_list`](MarketDataProvider::instrument_list) | Listed tickers |
/// | [`instrument_name`](MarketDataProvider::instrument_name) | Name lookup |
/// | [`investor_flows`](MarketDataProvider::investor_flows) | Per-date investor flows |
/// | [`daily_quotes`](MarketDataProvider::daily_quotes) | End-of-day listing |
pub trait MarketDataProvider: Send + Sync {
    fn id(&self) -> &'static str;

    fn price_series<'a>(&'a self, req: PriceSeriesRequest) -> ProviderFuture<'a, TimeSeries>;

    fn index_series<'a>(&'a self, req: IndexSeriesRequest) -> ProviderFuture<'a, TimeSeries>;

    fn net_buying<'a>(&'a self, req: NetBuyingRequest) -> ProviderFuture<'a, Vec<NetBuyingRecord>>;

    fn instrument_list<'a>(&'a self, market: Market) -> ProviderFuture<'a, Vec<Ticker>>;

    fn instrument_name<'a>(&'a self, ticker: Ticker) -> ProviderFuture<'a, String>;

    fn investor_flows<'a>(&'a self, req: InvestorFlowRequest) -> ProviderFuture<'a, InvestorFlows>;

    fn daily_quotes<'a>(&'a self, req: DailyQuotesRequest) -> ProviderFuture<'a, Vec<DailyQuote>>;
}

/// Source of the 52-week-high listing.
pub trait High52Source: Send + Sync {
    fn id(&self) -> &'static str;

    fn high52_page<'a>(&'a self, req: High52Request) -> ProviderFuture<'a, High52Page>;
}
