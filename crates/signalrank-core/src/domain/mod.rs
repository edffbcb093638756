//! # Domain Models
//!
//! Canonical domain types for KRX market signals.
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Ticker`] | Validated 6-character KRX short code |
//! | [`IndexCode`] | Benchmark index id |
//! | [`TradeDate`] | Exchange calendar date |
//! | [`Market`] | KOSPI / KOSDAQ |
//! | [`InvestorCategory`] | Investor groups of the net-buying report |
//! | [`TimeSeries`] | Unique-date ordered series |
//! | [`RankingEntry`] | One row of a ranked table |
//!
//! All types validate their invariants at construction time and are
//! created fresh for every run.

mod market;
mod models;
mod series;
mod ticker;
mod trade_date;

pub use market::{InvestorCategory, Market, MarketScope};
pub use models::{
    DailyQuote, High52Entry, High52Page, Instrument, InvestorFlowRow, InvestorFlows,
    NetBuyingRecord, RankingEntry, RsWindowResult, UNKNOWN_NAME,
};
pub use series::{SeriesPoint, TimeSeries};
pub use ticker::{IndexCode, Ticker};
pub use trade_date::TradeDate;
