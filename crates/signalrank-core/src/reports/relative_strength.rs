use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::RunContext;
use crate::instruments::InstrumentResolver;
use crate::ranking::RankingAggregator;
use crate::rs::RsCalculator;
use crate::throttling::Pacer;
use crate::{IndexCode, Instrument, Market, RankingEntry, TradeDate};

/// RS ranking of one market over one lookback period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsPeriodTable {
    pub period: usize,
    pub rows: Vec<RankingEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsMarketTable {
    pub market: Market,
    pub benchmark: IndexCode,
    pub periods: Vec<RsPeriodTable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsReport {
    pub run_date: TradeDate,
    pub markets: Vec<RsMarketTable>,
}

pub struct RsReportBuilder {
    calculator: RsCalculator,
    resolver: Arc<InstrumentResolver>,
    aggregator: RankingAggregator,
    market_pacer: Pacer,
}

impl RsReportBuilder {
    pub fn new(
        calculator: RsCalculator,
        resolver: Arc<InstrumentResolver>,
        aggregator: RankingAggregator,
        market_pacer: Pacer,
    ) -> Self {
        Self {
            calculator,
            resolver,
            aggregator,
            market_pacer,
        }
    }

    pub async fn build(&self, run: &RunContext) -> Option<RsReport> {
        let mut markets = Vec::new();

        for market in &run.markets {
            self.market_pacer.pace().await;
            if let Some(table) = self.market_table(run, *market).await {
                markets.push(table);
            }
        }

        if markets.is_empty() {
            return None;
        }
        Some(RsReport {
            run_date: run.run_date,
            markets,
        })
    }

    async fn market_table(&self, run: &RunContext, market: Market) -> Option<RsMarketTable> {
        let Some(tickers) = self.resolver.listed(market).await else {
            tracing::warn!(market = %market, "instrument list unavailable, market skipped");
            return None;
        };
        let instruments: Vec<Instrument> = tickers
            .into_iter()
            .map(|ticker| Instrument::new(ticker, String::new(), Some(market)))
            .collect();
        let benchmark = market.benchmark();

        let mut periods = Vec::new();
        for period in &run.rs_periods {
            let period = *period;
            let range = RsCalculator::history_range(run.run_date, period);
            let Some(benchmark_series) = self.calculator.fetch_benchmark(&benchmark, range).await else {
                tracing::warn!(market = %market, period, "benchmark unavailable, period skipped");
                continue;
            };

            let calculator = &self.calculator;
            let benchmark_series = &benchmark_series;
            let label = format!("rs {market} {period}d");
            let ranked = self
                .aggregator
                .rank(&label, instruments.clone(), run.top_n, |instrument| {
                    let instrument = instrument.clone();
                    async move {
                        calculator
                            .score_against(&instrument, benchmark_series, period, run.run_date)
                            .await
                            .map(|result| result.score)
                    }
                })
                .await;

            if ranked.is_empty() {
                tracing::warn!(market = %market, period, "no instrument could be scored");
                continue;
            }

            let mut rows = Vec::with_capacity(ranked.len());
            for mut entry in ranked {
                entry.instrument.name = self.resolver.name(&entry.instrument.ticker).await;
                rows.push(entry);
            }
            periods.push(RsPeriodTable { period, rows });
        }

        if periods.is_empty() {
            return None;
        }
        Some(RsMarketTable {
            market,
            benchmark,
            periods,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::adapters::{FailureMode, StaticMarketData};
    use crate::alert::RecordingAlerter;
    use crate::config::SignalConfig;
    use crate::retry::{ResilientFetcher, RetryPolicy};
    use crate::rs::RsConfig;
    use crate::UNKNOWN_NAME;

    fn run() -> RunContext {
        let run_date = TradeDate::parse("20250217").expect("valid");
        RunContext::for_date(run_date, &SignalConfig::default()).expect("valid config")
    }

    fn builder(data: StaticMarketData, alerter: &RecordingAlerter) -> RsReportBuilder {
        let fetcher = ResilientFetcher::new(
            RetryPolicy::new(2, Duration::ZERO),
            Arc::new(alerter.clone()),
        );
        let provider = Arc::new(data);
        RsReportBuilder::new(
            RsCalculator::new(provider.clone(), fetcher.clone(), RsConfig::default()),
            Arc::new(InstrumentResolver::new(provider, fetcher)),
            RankingAggregator::new(Pacer::disabled()),
            Pacer::disabled(),
        )
    }

    #[tokio::test]
    async fn ranks_every_period_with_resolved_names() {
        let run = run();
        let data = StaticMarketData::sample(run.run_date).expect("sample");
        let alerter = RecordingAlerter::new();

        let report = builder(data.clone(), &alerter).build(&run).await.expect("report");

        assert_eq!(report.markets.len(), 2);
        for market in &report.markets {
            assert_eq!(market.benchmark, market.market.benchmark());
            let periods: Vec<usize> = market.periods.iter().map(|table| table.period).collect();
            assert_eq!(periods, vec![20, 60, 120]);
            for table in &market.periods {
                assert_eq!(table.rows.len(), 6);
                assert!(table.rows.iter().all(|row| row.instrument.name != UNKNOWN_NAME));
                assert!(table.rows.windows(2).all(|pair| pair[0].value >= pair[1].value));
            }
        }
        // memoised across periods
        assert_eq!(data.calls("instrument_name"), 12);
        assert_eq!(alerter.count(), 0);
    }

    #[tokio::test]
    async fn missing_benchmark_skips_market_with_alert_per_period() {
        let run = run();
        let data = StaticMarketData::sample(run.run_date)
            .expect("sample")
            .with_failure("index_series", "1001", FailureMode::Always);
        let alerter = RecordingAlerter::new();

        let report = builder(data.clone(), &alerter).build(&run).await.expect("report");

        let markets: Vec<Market> = report.markets.iter().map(|table| table.market).collect();
        assert_eq!(markets, vec![Market::Kosdaq]);
        assert_eq!(data.calls_for("index_series", "1001"), 6);
        assert_eq!(alerter.count(), 3);
        assert_eq!(data.calls_for("price_series", "005930"), 0);
    }
}
