//! Investor net-buying tables with consecutive-buying streaks.
//!
//! Per market, each investor category is ranked by its net buying on the run
//! date. Every ranked ticker is then looked up in the per-date investor flows
//! of the lookback window and tagged with the length of its current run of
//! positive net buying.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::RunContext;
use crate::data_source::{DateRange, InvestorFlowRequest, MarketDataProvider, NetBuyingRequest};
use crate::instruments::InstrumentResolver;
use crate::ranking::top_n;
use crate::retry::{OperationDescriptor, ResilientFetcher};
use crate::streak::consecutive_positive_run;
use crate::throttling::Pacer;
use crate::{Instrument, InvestorCategory, InvestorFlows, Market, RankingEntry, Ticker, TradeDate};

/// Ranked net buying of one investor category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorTable {
    pub investor: InvestorCategory,
    pub rows: Vec<RankingEntry>,
}

/// Tables of one presentation group within one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorGroup {
    pub market: Market,
    pub tables: Vec<InvestorTable>,
}

impl InvestorGroup {
    /// Caption such as `KOSPI 외국인·기관`.
    pub fn title(&self) -> String {
        let labels: Vec<&str> = self
            .tables
            .iter()
            .map(|table| table.investor.label())
            .collect();
        format!("{} {}", self.market, labels.join("·"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorReport {
    pub run_date: TradeDate,
    pub lookback_start: TradeDate,
    pub groups: Vec<InvestorGroup>,
}

/// Name with the streak appended when it spans more than one session.
pub fn display_name(entry: &RankingEntry) -> String {
    match entry.streak {
        Some(streak) if streak > 1 => format!("{}({streak})", entry.instrument.name),
        _ => entry.instrument.name.clone(),
    }
}

/// KRW amount in units of 100 million (억), two decimals.
pub fn format_eok(amount: f64) -> String {
    format!("{:.2}", amount / 1e8)
}

pub struct InvestorReportBuilder {
    provider: Arc<dyn MarketDataProvider>,
    fetcher: ResilientFetcher,
    resolver: Arc<InstrumentResolver>,
    pacer: Pacer,
}

impl InvestorReportBuilder {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        fetcher: ResilientFetcher,
        resolver: Arc<InstrumentResolver>,
        pacer: Pacer,
    ) -> Self {
        Self {
            provider,
            fetcher,
            resolver,
            pacer,
        }
    }

    pub async fn build(&self, run: &RunContext) -> Option<InvestorReport> {
        let mut flow_cache: HashMap<(Ticker, bool), Option<InvestorFlows>> = HashMap::new();
        let mut groups = Vec::new();

        for market in &run.markets {
            for group in InvestorCategory::GROUPS {
                let mut tables = Vec::new();
                for investor in group {
                    if let Some(table) = self.table(run, *market, *investor, &mut flow_cache).await {
                        tables.push(table);
                    }
                }

                if tables.is_empty() {
                    tracing::warn!(market = %market, "every category of an investor group failed");
                    continue;
                }
                groups.push(InvestorGroup {
                    market: *market,
                    tables,
                });
            }
        }

        if groups.is_empty() {
            return None;
        }
        Some(InvestorReport {
            run_date: run.run_date,
            lookback_start: run.lookback_start,
            groups,
        })
    }

    async fn table(
        &self,
        run: &RunContext,
        market: Market,
        investor: InvestorCategory,
        flow_cache: &mut HashMap<(Ticker, bool), Option<InvestorFlows>>,
    ) -> Option<InvestorTable> {
        let request = NetBuyingRequest {
            market,
            investor,
            range: DateRange::single(run.run_date),
        };
        let operation = OperationDescriptor::new("net_buying", format!("{market}/{investor}"))
            .with_param("date", run.run_date.compact());
        let provider = self.provider.as_ref();
        let records = self
            .fetcher
            .fetch(&operation, move || provider.net_buying(request.clone()))
            .await
            .ok()?;

        for record in &records {
            self.resolver.remember(&record.ticker, &record.name);
        }
        let candidates: Vec<(Instrument, Option<f64>)> = records
            .into_iter()
            .map(|record| {
                (
                    Instrument::new(record.ticker, record.name, Some(market)),
                    Some(record.amount),
                )
            })
            .collect();

        let mut rows = Vec::new();
        for entry in top_n(candidates, run.top_n) {
            let mut entry = entry;
            if entry.instrument.name.trim().is_empty() {
                entry.instrument.name = self.resolver.name(&entry.instrument.ticker).await;
            }
            let streak = self
                .streak(run, &entry.instrument.ticker, investor, flow_cache)
                .await;
            rows.push(entry.with_streak(streak));
        }

        tracing::info!(market = %market, investor = %investor, rows = rows.len(), "net buying ranked");
        Some(InvestorTable { investor, rows })
    }

    /// Positive net-buying run of `investor` ending at the run date.
    ///
    /// `None` when the flows cannot be fetched or carry no column for the
    /// category.
    async fn streak(
        &self,
        run: &RunContext,
        ticker: &Ticker,
        investor: InvestorCategory,
        flow_cache: &mut HashMap<(Ticker, bool), Option<InvestorFlows>>,
    ) -> Option<usize> {
        let detail = investor.requires_detail();
        let key = (ticker.clone(), detail);

        if !flow_cache.contains_key(&key) {
            self.pacer.pace().await;
            let flows = self.fetch_flows(run, ticker, detail).await;
            flow_cache.insert(key.clone(), flows);
        }

        let flows = flow_cache.get(&key)?.as_ref()?;
        let series = flows.series_for(investor).ok()?;
        if series.is_empty() {
            return None;
        }
        Some(consecutive_positive_run(&series.values_most_recent_first()))
    }

    async fn fetch_flows(&self, run: &RunContext, ticker: &Ticker, detail: bool) -> Option<InvestorFlows> {
        let range = DateRange {
            start: run.lookback_start,
            end: run.run_date,
        };
        let request = InvestorFlowRequest {
            ticker: ticker.clone(),
            range,
            detail,
        };
        let operation = OperationDescriptor::new("investor_flows", ticker.as_str())
            .with_param("range", range)
            .with_param("detail", detail);
        let provider = self.provider.as_ref();
        self.fetcher
            .fetch(&operation, move || provider.investor_flows(request.clone()))
            .await
            .ok()
    }
}
