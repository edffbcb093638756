//! In-memory market data for `--mock` runs and tests.
//!
//! Every endpoint answers from fixtures registered through the `with_*`
//! builders. Missing fixtures answer with an empty payload, which the
//! resilient fetcher treats like any other transient failure. Failures can be
//! injected per `(operation, target)` and every call is counted.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use time::Weekday;

use crate::data_source::{
    DailyQuotesRequest, DateRange, High52Request, High52Source, IndexSeriesRequest,
    InvestorFlowRequest, MarketDataProvider, NetBuyingRequest, PriceSeriesRequest, ProviderError,
    ProviderFuture,
};
use crate::{
    DailyQuote, High52Entry, High52Page, IndexCode, InvestorCategory, InvestorFlowRow,
    InvestorFlows, Market, MarketScope, NetBuyingRecord, Ticker, TimeSeries, TradeDate,
};

/// How an injected failure behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Every call fails.
    Always,
    /// The next `n` calls fail, later calls are answered normally.
    Times(u32),
}

#[derive(Debug, Default)]
struct Fixtures {
    names: HashMap<Ticker, String>,
    listings: HashMap<Market, Vec<Ticker>>,
    prices: HashMap<Ticker, TimeSeries>,
    indices: HashMap<IndexCode, TimeSeries>,
    net_buying: HashMap<(Market, InvestorCategory), Vec<NetBuyingRecord>>,
    flows: HashMap<Ticker, InvestorFlows>,
    quotes: Vec<DailyQuote>,
    high52: Vec<High52Entry>,
}

#[derive(Debug, Default)]
struct CallLog {
    counts: HashMap<(&'static str, String), u32>,
    failures: HashMap<(&'static str, String), FailureMode>,
}

/// Fixture-backed [`MarketDataProvider`] and [`High52Source`].
///
/// Clones share fixtures and counters, so a test can keep a handle while the
/// engine owns another.
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    fixtures: Arc<Mutex<Fixtures>>,
    calls: Arc<Mutex<CallLog>>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(self, ticker: Ticker, name: impl Into<String>) -> Self {
        self.fixtures().names.insert(ticker, name.into());
        self
    }

    pub fn with_listing(self, market: Market, tickers: Vec<Ticker>) -> Self {
        self.fixtures().listings.insert(market, tickers);
        self
    }

    pub fn with_price_series(self, ticker: Ticker, series: TimeSeries) -> Self {
        self.fixtures().prices.insert(ticker, series);
        self
    }

    pub fn with_index_series(self, index: IndexCode, series: TimeSeries) -> Self {
        self.fixtures().indices.insert(index, series);
        self
    }

    pub fn with_net_buying(
        self,
        market: Market,
        investor: InvestorCategory,
        records: Vec<NetBuyingRecord>,
    ) -> Self {
        self.fixtures().net_buying.insert((market, investor), records);
        self
    }

    pub fn with_flows(self, ticker: Ticker, flows: InvestorFlows) -> Self {
        self.fixtures().flows.insert(ticker, flows);
        self
    }

    pub fn with_quotes(self, quotes: Vec<DailyQuote>) -> Self {
        self.fixtures().quotes = quotes;
        self
    }

    pub fn with_high52(self, entries: Vec<High52Entry>) -> Self {
        self.fixtures().high52 = entries;
        self
    }

    /// Inject a failure for one operation and target.
    ///
    /// Targets are the ticker, index code, market name, `MARKET/investor`
    /// pair, market scope or page number, depending on the operation.
    pub fn with_failure(
        self,
        operation: &'static str,
        target: impl Into<String>,
        mode: FailureMode,
    ) -> Self {
        self.log().failures.insert((operation, target.into()), mode);
        self
    }

    /// Calls made to `operation` across all targets.
    pub fn calls(&self, operation: &str) -> u32 {
        self.log()
            .counts
            .iter()
            .filter(|((name, _), _)| *name == operation)
            .map(|(_, count)| *count)
            .sum()
    }

    pub fn calls_for(&self, operation: &str, target: &str) -> u32 {
        self.log()
            .counts
            .iter()
            .filter(|((name, key), _)| *name == operation && key == target)
            .map(|(_, count)| *count)
            .sum()
    }

    fn fixtures(&self) -> std::sync::MutexGuard<'_, Fixtures> {
        self.fixtures.lock().expect("fixture lock is not poisoned")
    }

    fn log(&self) -> std::sync::MutexGuard<'_, CallLog> {
        self.calls.lock().expect("call log lock is not poisoned")
    }

    /// Count the call and apply any injected failure.
    fn record(&self, operation: &'static str, target: String) -> Result<(), ProviderError> {
        let mut log = self.log();
        *log.counts.entry((operation, target.clone())).or_insert(0) += 1;

        let key = (operation, target);
        match log.failures.get(&key).copied() {
            Some(FailureMode::Always) => Err(injected(operation, &key.1)),
            Some(FailureMode::Times(remaining)) if remaining > 0 => {
                log.failures.insert(key.clone(), FailureMode::Times(remaining - 1));
                Err(injected(operation, &key.1))
            }
            _ => Ok(()),
        }
    }
}

fn injected(operation: &str, target: &str) -> ProviderError {
    ProviderError::transport(format!("injected failure for {operation}({target})"))
}

fn within(series: &TimeSeries, range: DateRange) -> Result<TimeSeries, ProviderError> {
    TimeSeries::new(
        series
            .points()
            .iter()
            .filter(|point| point.date >= range.start && point.date <= range.end)
            .copied()
            .collect(),
    )
    .map_err(|error| ProviderError::internal(error.to_string()))
}

fn flow_columns(category: InvestorCategory, detail: bool) -> bool {
    category == InvestorCategory::Foreign || category.requires_detail() == detail
}

impl MarketDataProvider for StaticMarketData {
    fn id(&self) -> &'static str {
        "static"
    }

    fn price_series<'a>(&'a self, req: PriceSeriesRequest) -> ProviderFuture<'a, TimeSeries> {
        Box::pin(async move {
            self.record("price_series", req.ticker.to_string())?;
            match self.fixtures().prices.get(&req.ticker) {
                Some(series) => within(series, req.range),
                None => Ok(TimeSeries::default()),
            }
        })
    }

    fn index_series<'a>(&'a self, req: IndexSeriesRequest) -> ProviderFuture<'a, TimeSeries> {
        Box::pin(async move {
            self.record("index_series", req.index.to_string())?;
            match self.fixtures().indices.get(&req.index) {
                Some(series) => within(series, req.range),
                None => Ok(TimeSeries::default()),
            }
        })
    }

    fn net_buying<'a>(&'a self, req: NetBuyingRequest) -> ProviderFuture<'a, Vec<NetBuyingRecord>> {
        Box::pin(async move {
            self.record("net_buying", format!("{}/{}", req.market, req.investor))?;
            Ok(self
                .fixtures()
                .net_buying
                .get(&(req.market, req.investor))
                .cloned()
                .unwrap_or_default())
        })
    }

    fn instrument_list<'a>(&'a self, market: Market) -> ProviderFuture<'a, Vec<Ticker>> {
        Box::pin(async move {
            self.record("instrument_list", market.to_string())?;
            Ok(self
                .fixtures()
                .listings
                .get(&market)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn instrument_name<'a>(&'a self, ticker: Ticker) -> ProviderFuture<'a, String> {
        Box::pin(async move {
            self.record("instrument_name", ticker.to_string())?;
            Ok(self
                .fixtures()
                .names
                .get(&ticker)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn investor_flows<'a>(&'a self, req: InvestorFlowRequest) -> ProviderFuture<'a, InvestorFlows> {
        Box::pin(async move {
            self.record("investor_flows", req.ticker.to_string())?;
            let fixtures = self.fixtures();
            let Some(flows) = fixtures.flows.get(&req.ticker) else {
                return Ok(InvestorFlows::default());
            };

            let rows = flows
                .rows
                .iter()
                .filter(|row| row.date >= req.range.start && row.date <= req.range.end)
                .map(|row| InvestorFlowRow {
                    date: row.date,
                    values: row
                        .values
                        .iter()
                        .filter(|(category, _)| flow_columns(**category, req.detail))
                        .map(|(category, value)| (*category, *value))
                        .collect(),
                })
                .collect();

            Ok(InvestorFlows {
                ticker: Some(req.ticker),
                rows,
            })
        })
    }

    fn daily_quotes<'a>(&'a self, req: DailyQuotesRequest) -> ProviderFuture<'a, Vec<DailyQuote>> {
        Box::pin(async move {
            self.record("daily_quotes", req.scope.to_string())?;
            Ok(self
                .fixtures()
                .quotes
                .iter()
                .filter(|quote| match req.scope {
                    MarketScope::All => true,
                    MarketScope::Only(market) => quote.market == Some(market),
                })
                .cloned()
                .collect())
        })
    }
}

impl High52Source for StaticMarketData {
    fn id(&self) -> &'static str {
        "static"
    }

    fn high52_page<'a>(&'a self, req: High52Request) -> ProviderFuture<'a, High52Page> {
        Box::pin(async move {
            self.record("high52_page", req.page.to_string())?;
            let fixtures = self.fixtures();
            let total_count = fixtures.high52.len();
            let entries = fixtures
                .high52
                .iter()
                .skip((req.page - 1).saturating_mul(req.page_size))
                .take(req.page_size)
                .cloned()
                .collect();
            Ok(High52Page {
                total_count,
                entries,
            })
        })
    }
}

struct SampleListing {
    code: &'static str,
    name: &'static str,
    base_price: f64,
    daily_drift: f64,
}

const KOSPI_SAMPLE: [SampleListing; 6] = [
    SampleListing { code: "005930", name: "삼성전자", base_price: 55_000.0, daily_drift: 0.0009 },
    SampleListing { code: "000660", name: "SK하이닉스", base_price: 120_000.0, daily_drift: 0.0021 },
    SampleListing { code: "035420", name: "NAVER", base_price: 190_000.0, daily_drift: -0.0004 },
    SampleListing { code: "005380", name: "현대차", base_price: 210_000.0, daily_drift: 0.0006 },
    SampleListing { code: "051910", name: "LG화학", base_price: 420_000.0, daily_drift: -0.0015 },
    SampleListing { code: "068270", name: "셀트리온", base_price: 165_000.0, daily_drift: 0.0012 },
];

const KOSDAQ_SAMPLE: [SampleListing; 6] = [
    SampleListing { code: "247540", name: "에코프로비엠", base_price: 230_000.0, daily_drift: -0.0011 },
    SampleListing { code: "086520", name: "에코프로", base_price: 480_000.0, daily_drift: -0.0018 },
    SampleListing { code: "196170", name: "알테오젠", base_price: 95_000.0, daily_drift: 0.0035 },
    SampleListing { code: "035760", name: "CJ ENM", base_price: 70_000.0, daily_drift: 0.0002 },
    SampleListing { code: "293490", name: "카카오게임즈", base_price: 25_000.0, daily_drift: -0.0007 },
    SampleListing { code: "263750", name: "펄어비스", base_price: 38_000.0, daily_drift: 0.0010 },
];

const SAMPLE_TRADING_DAYS: usize = 260;

/// Weekdays ending at `end`, oldest first.
fn trading_days(end: TradeDate, count: usize) -> Vec<TradeDate> {
    let mut days = Vec::with_capacity(count);
    let mut offset = 0u32;
    while days.len() < count {
        let date = end.minus_days(offset);
        if !matches!(date.into_inner().weekday(), Weekday::Saturday | Weekday::Sunday) {
            days.push(date);
        }
        offset += 1;
    }
    days.reverse();
    days
}

fn synthetic_closes(days: &[TradeDate], base: f64, drift: f64, phase: f64) -> BTreeMap<TradeDate, f64> {
    days.iter()
        .enumerate()
        .map(|(step, date)| {
            let step = step as f64;
            let wobble = 1.0 + 0.015 * (step * 0.21 + phase).sin();
            (*date, (base * (drift * step).exp() * wobble).round())
        })
        .collect()
}

impl StaticMarketData {
    /// Deterministic two-market data set ending at `run_date`.
    pub fn sample(run_date: TradeDate) -> Result<Self, ProviderError> {
        let days = trading_days(run_date, SAMPLE_TRADING_DAYS);
        let mut data = Self::new();
        let mut quotes = Vec::new();
        let mut high52 = Vec::new();

        let to_series = |closes: BTreeMap<TradeDate, f64>| {
            TimeSeries::from_pairs(closes).map_err(|error| ProviderError::internal(error.to_string()))
        };

        for (market, listings, index_drift) in [
            (Market::Kospi, &KOSPI_SAMPLE, 0.0004),
            (Market::Kosdaq, &KOSDAQ_SAMPLE, -0.0002),
        ] {
            let benchmark = market.benchmark();
            let index_base = if market == Market::Kospi { 2_500.0 } else { 750.0 };
            data = data.with_index_series(
                benchmark,
                to_series(synthetic_closes(&days, index_base, index_drift, 0.0))?,
            );

            let mut tickers = Vec::new();
            for (position, listing) in listings.iter().enumerate() {
                let ticker = Ticker::parse(listing.code)
                    .map_err(|error| ProviderError::internal(error.to_string()))?;
                let closes = synthetic_closes(
                    &days,
                    listing.base_price,
                    listing.daily_drift,
                    position as f64 * 0.7,
                );
                let last_close = closes.values().next_back().copied().unwrap_or(listing.base_price);
                let peak = closes.values().copied().fold(f64::MIN, f64::max);

                quotes.push(DailyQuote {
                    ticker: ticker.clone(),
                    name: listing.name.to_owned(),
                    market: Some(market),
                    close: last_close,
                    volume: 150_000 + 97_331 * ((position as u64 * 7 + 3) % 13),
                    trading_value: last_close * 250_000.0,
                });

                if last_close >= peak * 0.97 {
                    high52.push(High52Entry {
                        ticker: listing.code.to_owned(),
                        name: listing.name.to_owned(),
                        close_price: format!("{last_close:.0}"),
                        change_ratio: format!("{:.2}", listing.daily_drift * 1_000.0),
                        market_value: String::from("12조 3,456억"),
                        trading_value: String::from("1,234억"),
                        entity_type: String::from("stock"),
                    });
                }

                data = data
                    .with_name(ticker.clone(), listing.name)
                    .with_price_series(ticker.clone(), to_series(closes)?)
                    .with_flows(ticker.clone(), sample_flows(&ticker, &days, position));
                tickers.push(ticker);
            }

            for (slot, investor) in InvestorCategory::ALL.iter().enumerate() {
                let records = listings
                    .iter()
                    .zip(&tickers)
                    .enumerate()
                    .map(|(position, (listing, ticker))| NetBuyingRecord {
                        ticker: ticker.clone(),
                        name: listing.name.to_owned(),
                        investor: *investor,
                        amount: ((position * 7 + slot * 3) % 11) as f64 * 1.3e9 - 4.0e9,
                    })
                    .collect();
                data = data.with_net_buying(market, *investor, records);
            }

            data = data.with_listing(market, tickers);
        }

        high52.push(High52Entry {
            ticker: String::from("069500"),
            name: String::from("KODEX 200"),
            close_price: String::from("36,000"),
            change_ratio: String::from("0.85"),
            market_value: String::from("6조 1,000억"),
            trading_value: String::from("2,100억"),
            entity_type: String::from("etf"),
        });

        Ok(data.with_quotes(quotes).with_high52(high52))
    }
}

/// Fifteen sessions of flows whose positive run length differs per category.
fn sample_flows(ticker: &Ticker, days: &[TradeDate], position: usize) -> InvestorFlows {
    let recent: Vec<TradeDate> = days.iter().rev().take(15).copied().collect();
    let rows = recent
        .iter()
        .enumerate()
        .map(|(age, date)| InvestorFlowRow {
            date: *date,
            values: InvestorCategory::ALL
                .iter()
                .enumerate()
                .map(|(slot, category)| {
                    let run = (position + slot * 2) % 6;
                    let value = if age < run { 2.5e8 * (run - age) as f64 } else { -1.1e8 };
                    (*category, value)
                })
                .collect(),
        })
        .collect();

    InvestorFlows {
        ticker: Some(ticker.clone()),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(code: &str) -> Ticker {
        Ticker::parse(code).expect("valid")
    }

    #[tokio::test]
    async fn missing_fixture_answers_empty() {
        let data = StaticMarketData::new();
        let list = data.instrument_list(Market::Kosdaq).await.expect("answered");
        assert!(list.is_empty());
        assert_eq!(data.calls("instrument_list"), 1);
    }

    #[tokio::test]
    async fn times_failure_recovers_after_budget() {
        let data = StaticMarketData::new()
            .with_name(ticker("005930"), "삼성전자")
            .with_failure("instrument_name", "005930", FailureMode::Times(2));

        assert!(data.instrument_name(ticker("005930")).await.is_err());
        assert!(data.instrument_name(ticker("005930")).await.is_err());
        assert_eq!(
            data.instrument_name(ticker("005930")).await.expect("recovered"),
            "삼성전자"
        );
        assert_eq!(data.calls_for("instrument_name", "005930"), 3);
    }

    #[tokio::test]
    async fn flows_respect_detail_columns() {
        let run_date = TradeDate::parse("20250217").expect("valid");
        let data = StaticMarketData::sample(run_date).expect("sample");
        let range = DateRange::new(run_date.minus_days(15), run_date).expect("valid");

        let summary = data
            .investor_flows(InvestorFlowRequest {
                ticker: ticker("005930"),
                range,
                detail: false,
            })
            .await
            .expect("answered");
        let row = summary.rows.first().expect("rows");
        assert!(row.values.contains_key(&InvestorCategory::InstitutionTotal));
        assert!(!row.values.contains_key(&InvestorCategory::PensionFund));
    }

    #[tokio::test]
    async fn sample_pages_high52_listing() {
        let run_date = TradeDate::parse("20250217").expect("valid");
        let data = StaticMarketData::sample(run_date).expect("sample");
        let page = data
            .high52_page(High52Request::new(1, 100).expect("valid"))
            .await
            .expect("answered");
        assert_eq!(page.total_count, page.entries.len());
        assert!(page.entries.iter().any(|entry| !entry.is_stock()));
    }
}
