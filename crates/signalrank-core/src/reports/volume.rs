use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::RunContext;
use crate::data_source::{DailyQuotesRequest, MarketDataProvider};
use crate::ranking::top_n;
use crate::retry::{OperationDescriptor, ResilientFetcher};
use crate::{DailyQuote, Instrument, MarketScope, TradeDate};

/// One row of the trading-volume table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeRow {
    pub rank: usize,
    pub instrument: Instrument,
    pub volume: u64,
    pub close: f64,
    pub trading_value: f64,
}

/// Most traded instruments of the whole exchange on the run date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeReport {
    pub run_date: TradeDate,
    pub rows: Vec<VolumeRow>,
}

pub struct VolumeReportBuilder {
    provider: Arc<dyn MarketDataProvider>,
    fetcher: ResilientFetcher,
}

impl VolumeReportBuilder {
    pub fn new(provider: Arc<dyn MarketDataProvider>, fetcher: ResilientFetcher) -> Self {
        Self { provider, fetcher }
    }

    /// `None` when the listing could not be fetched.
    pub async fn build(&self, run: &RunContext) -> Option<VolumeReport> {
        let request = DailyQuotesRequest {
            date: run.run_date,
            scope: MarketScope::All,
        };
        let operation = OperationDescriptor::new("daily_quotes", request.scope.to_string())
            .with_param("date", run.run_date.compact());
        let provider = self.provider.as_ref();
        let quotes = self
            .fetcher
            .fetch(&operation, move || provider.daily_quotes(request))
            .await
            .ok()?;

        let rows = rank_by_volume(quotes, run.top_n);
        tracing::info!(rows = rows.len(), "volume ranking built");
        if rows.is_empty() {
            return None;
        }

        Some(VolumeReport {
            run_date: run.run_date,
            rows,
        })
    }
}

fn rank_by_volume(quotes: Vec<DailyQuote>, n: usize) -> Vec<VolumeRow> {
    let mut details = HashMap::with_capacity(quotes.len());
    let candidates: Vec<(Instrument, Option<f64>)> = quotes
        .into_iter()
        .map(|quote| {
            let instrument = Instrument::new(quote.ticker.clone(), quote.name.clone(), quote.market);
            let volume = quote.volume as f64;
            details.entry(quote.ticker.clone()).or_insert(quote);
            (instrument, Some(volume))
        })
        .collect();

    top_n(candidates, n)
        .into_iter()
        .filter_map(|entry| {
            let quote = details.get(&entry.instrument.ticker)?;
            Some(VolumeRow {
                rank: entry.rank,
                volume: quote.volume,
                close: quote.close,
                trading_value: quote.trading_value,
                instrument: entry.instrument,
            })
        })
        .collect()
}
