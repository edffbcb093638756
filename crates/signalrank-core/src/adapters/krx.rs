use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::data_source::{
    DailyQuotesRequest, DateRange, IndexSeriesRequest, InvestorFlowRequest, MarketDataProvider,
    NetBuyingRequest, PriceSeriesRequest, ProviderError, ProviderFuture,
};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::{
    DailyQuote, InvestorCategory, InvestorFlowRow, InvestorFlows, Market, NetBuyingRecord, Ticker,
    TimeSeries, TradeDate,
};

/// JSON endpoint of the KRX market data portal.
pub const KRX_DATA_URL: &str = "http://data.krx.co.kr/comm/bldAttendant/getJsonData.cmd";

const KRX_REFERER: &str = "http://data.krx.co.kr/contents/MDC/MDI/mdiLoader/index.cmd";
const KRX_TIMEOUT: Duration = Duration::from_secs(15);

const BLD_ALL_QUOTES: &str = "dbms/MDC/STAT/standard/MDCSTAT01501";
const BLD_STOCK_HISTORY: &str = "dbms/MDC/STAT/standard/MDCSTAT01701";
const BLD_INDEX_HISTORY: &str = "dbms/MDC/STAT/standard/MDCSTAT00301";
const BLD_DIRECTORY: &str = "dbms/MDC/STAT/standard/MDCSTAT01901";
const BLD_NET_PURCHASES: &str = "dbms/MDC/STAT/standard/MDCSTAT02401";
const BLD_INVESTOR_FLOWS: &str = "dbms/MDC/STAT/standard/MDCSTAT02303";

/// One listed security of the KRX directory.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Listing {
    ticker: Ticker,
    isin: String,
    name: String,
    market: Option<Market>,
}

/// KRX data portal adapter.
///
/// Every endpoint is a form-encoded POST selecting a screen through the `bld`
/// parameter. The security directory (short code, ISIN and name) is loaded
/// on first use and kept for the lifetime of the adapter.
#[derive(Clone)]
pub struct KrxAdapter {
    http_client: Arc<dyn HttpClient>,
    endpoint: String,
    directory: Arc<Mutex<Option<Arc<Vec<Listing>>>>>,
}

impl Default for KrxAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }
}

impl KrxAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            endpoint: String::from(KRX_DATA_URL),
            directory: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn post(&self, bld: &str, params: &[(&str, &str)]) -> Result<Vec<KrxRow>, ProviderError> {
        let request = HttpRequest::post(&self.endpoint)
            .header("referer", KRX_REFERER)
            .form([("bld", bld), ("locale", "ko_KR")])
            .form(params.iter().copied())
            .timeout(KRX_TIMEOUT);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| ProviderError::transport(format!("krx transport error: {}", e.message())))?;

        if !response.is_success() {
            return Err(ProviderError::status(response.status, "krx"));
        }

        parse_rows(&response.body)
    }

    async fn directory(&self) -> Result<Arc<Vec<Listing>>, ProviderError> {
        if let Some(listings) = self
            .directory
            .lock()
            .expect("krx directory lock is not poisoned")
            .as_ref()
        {
            return Ok(Arc::clone(listings));
        }

        let rows = self
            .post(BLD_DIRECTORY, &[("mktId", "ALL"), ("share", "1"), ("csvxls_isNo", "false")])
            .await?;
        let listings: Vec<Listing> = rows.iter().filter_map(Listing::from_row).collect();
        if listings.is_empty() {
            // Left unset so the next call reloads it.
            return Ok(Arc::new(listings));
        }

        let listings = Arc::new(listings);
        *self
            .directory
            .lock()
            .expect("krx directory lock is not poisoned") = Some(Arc::clone(&listings));
        Ok(listings)
    }

    async fn isin(&self, ticker: &Ticker) -> Result<String, ProviderError> {
        self.directory()
            .await?
            .iter()
            .find(|listing| &listing.ticker == ticker)
            .map(|listing| listing.isin.clone())
            .ok_or_else(|| ProviderError::invalid_request(format!("krx directory has no '{ticker}'")))
    }
}

impl MarketDataProvider for KrxAdapter {
    fn id(&self) -> &'static str {
        "krx"
    }

    fn price_series<'a>(&'a self, req: PriceSeriesRequest) -> ProviderFuture<'a, TimeSeries> {
        Box::pin(async move {
            let isin = self.isin(&req.ticker).await?;
            let (start, end) = compact_range(req.range);
            let rows = self
                .post(
                    BLD_STOCK_HISTORY,
                    &[
                        ("isuCd", isin.as_str()),
                        ("strtDd", start.as_str()),
                        ("endDd", end.as_str()),
                        ("adjStkPrc", "2"),
                    ],
                )
                .await?;
            close_series(&rows, "TDD_CLSPRC")
        })
    }

    fn index_series<'a>(&'a self, req: IndexSeriesRequest) -> ProviderFuture<'a, TimeSeries> {
        Box::pin(async move {
            let (start, end) = compact_range(req.range);
            let rows = self
                .post(
                    BLD_INDEX_HISTORY,
                    &[
                        ("indIdx", req.index.family()),
                        ("indIdx2", req.index.member()),
                        ("strtDd", start.as_str()),
                        ("endDd", end.as_str()),
                    ],
                )
                .await?;
            close_series(&rows, "CLSPRC_IDX")
        })
    }

    fn net_buying<'a>(&'a self, req: NetBuyingRequest) -> ProviderFuture<'a, Vec<NetBuyingRecord>> {
        Box::pin(async move {
            let (start, end) = compact_range(req.range);
            let rows = self
                .post(
                    BLD_NET_PURCHASES,
                    &[
                        ("mktId", req.market.provider_id()),
                        ("invstTpCd", req.investor.provider_code()),
                        ("strtDd", start.as_str()),
                        ("endDd", end.as_str()),
                    ],
                )
                .await?;

            Ok(rows
                .iter()
                .filter_map(|row| {
                    Some(NetBuyingRecord {
                        ticker: Ticker::parse(row.text("ISU_SRT_CD")?).ok()?,
                        name: row.text("ISU_NM").unwrap_or_default().to_owned(),
                        investor: req.investor,
                        amount: row.number("NETBID_TRDVAL")?,
                    })
                })
                .collect())
        })
    }

    fn instrument_list<'a>(&'a self, market: Market) -> ProviderFuture<'a, Vec<Ticker>> {
        Box::pin(async move {
            Ok(self
                .directory()
                .await?
                .iter()
                .filter(|listing| listing.market == Some(market))
                .map(|listing| listing.ticker.clone())
                .collect())
        })
    }

    fn instrument_name<'a>(&'a self, ticker: Ticker) -> ProviderFuture<'a, String> {
        Box::pin(async move {
            Ok(self
                .directory()
                .await?
                .iter()
                .find(|listing| listing.ticker == ticker)
                .map(|listing| listing.name.clone())
                .unwrap_or_default())
        })
    }

    fn investor_flows<'a>(&'a self, req: InvestorFlowRequest) -> ProviderFuture<'a, InvestorFlows> {
        Box::pin(async move {
            let isin = self.isin(&req.ticker).await?;
            let (start, end) = compact_range(req.range);
            let detail_view = if req.detail { "1" } else { "0" };
            let rows = self
                .post(
                    BLD_INVESTOR_FLOWS,
                    &[
                        ("isuCd", isin.as_str()),
                        ("strtDd", start.as_str()),
                        ("endDd", end.as_str()),
                        ("inqTpCd", "2"),
                        ("trdVolVal", "2"),
                        ("askBid", "3"),
                        ("detailView", detail_view),
                    ],
                )
                .await?;

            let mut flows = Vec::with_capacity(rows.len());
            for row in &rows {
                let Some(date) = row.text("TRD_DD") else {
                    continue;
                };
                let date = TradeDate::parse(date).map_err(|e| ProviderError::parse(e.to_string()))?;
                let values: BTreeMap<InvestorCategory, f64> = InvestorCategory::ALL
                    .iter()
                    .filter_map(|category| {
                        let column = flow_column(*category, req.detail)?;
                        row.number(column).map(|value| (*category, value))
                    })
                    .collect();
                flows.push(InvestorFlowRow { date, values });
            }

            Ok(InvestorFlows {
                ticker: Some(req.ticker),
                rows: flows,
            })
        })
    }

    fn daily_quotes<'a>(&'a self, req: DailyQuotesRequest) -> ProviderFuture<'a, Vec<DailyQuote>> {
        Box::pin(async move {
            let date = req.date.compact();
            let rows = self
                .post(
                    BLD_ALL_QUOTES,
                    &[("mktId", req.scope.provider_id()), ("trdDd", date.as_str()), ("share", "1"), ("money", "1")],
                )
                .await?;

            Ok(rows
                .iter()
                .filter_map(|row| {
                    Some(DailyQuote {
                        ticker: Ticker::parse(row.text("ISU_SRT_CD")?).ok()?,
                        name: row.text("ISU_ABBRV").unwrap_or_default().to_owned(),
                        market: row.text("MKT_NM").and_then(market_from_label),
                        close: row.number("TDD_CLSPRC")?,
                        volume: row.number("ACC_TRDVOL").map(|v| v.max(0.0) as u64).unwrap_or(0),
                        trading_value: row.number("ACC_TRDVAL").unwrap_or(0.0),
                    })
                })
                .collect())
        })
    }
}

/// Trading-value column of `category` in the per-date investor screen.
fn flow_column(category: InvestorCategory, detail: bool) -> Option<&'static str> {
    match (category, detail) {
        (InvestorCategory::InvestmentTrust, true) => Some("TRDVAL3"),
        (InvestorCategory::PrivateEquity, true) => Some("TRDVAL4"),
        (InvestorCategory::PensionFund, true) => Some("TRDVAL7"),
        (InvestorCategory::Foreign, true) => Some("TRDVAL10"),
        (InvestorCategory::InstitutionTotal, false) => Some("TRDVAL1"),
        (InvestorCategory::Foreign, false) => Some("TRDVAL4"),
        _ => None,
    }
}

fn market_from_label(label: &str) -> Option<Market> {
    if label.starts_with("KOSDAQ") {
        Some(Market::Kosdaq)
    } else if label.starts_with("KOSPI") || label.starts_with("유가") {
        Some(Market::Kospi)
    } else {
        None
    }
}

fn compact_range(range: DateRange) -> (String, String) {
    (range.start.compact(), range.end.compact())
}

fn close_series(rows: &[KrxRow], column: &str) -> Result<TimeSeries, ProviderError> {
    let mut pairs = Vec::with_capacity(rows.len());
    for row in rows {
        let (Some(date), Some(close)) = (row.text("TRD_DD"), row.number(column)) else {
            continue;
        };
        let date = TradeDate::parse(date).map_err(|e| ProviderError::parse(e.to_string()))?;
        pairs.push((date, close));
    }
    TimeSeries::from_pairs(pairs).map_err(|e| ProviderError::parse(format!("krx series: {e}")))
}

/// Parse a KRX number such as `"-1,234.5"`. `"-"` and blanks mean no value.
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|ch| *ch != ',').collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn parse_rows(body: &str) -> Result<Vec<KrxRow>, ProviderError> {
    let envelope: KrxEnvelope = serde_json::from_str(body)
        .map_err(|e| ProviderError::parse(format!("failed to parse krx response: {e}")))?;
    Ok(envelope.rows)
}

// ============================================================================
// KRX response structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct KrxEnvelope {
    #[serde(rename = "OutBlock_1", alias = "output", alias = "block1", default)]
    rows: Vec<KrxRow>,
}

#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct KrxRow(BTreeMap<String, Value>);

impl KrxRow {
    fn text(&self, column: &str) -> Option<&str> {
        match self.0.get(column)? {
            Value::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    fn number(&self, column: &str) -> Option<f64> {
        match self.0.get(column)? {
            Value::String(value) => parse_number(value),
            Value::Number(value) => value.as_f64(),
            _ => None,
        }
    }
}

impl Listing {
    fn from_row(row: &KrxRow) -> Option<Self> {
        Some(Self {
            ticker: Ticker::parse(row.text("ISU_SRT_CD")?).ok()?,
            isin: row.text("ISU_CD")?.to_owned(),
            name: row.text("ISU_ABBRV").unwrap_or_default().to_owned(),
            market: row.text("MKT_TP_NM").and_then(market_from_label),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpFuture, HttpResponse};
    use crate::{IndexCode, MarketScope};

    const DIRECTORY: &str = r#"{"OutBlock_1":[
        {"ISU_CD":"KR7005930003","ISU_SRT_CD":"005930","ISU_ABBRV":"삼성전자","MKT_TP_NM":"KOSPI"},
        {"ISU_CD":"KR7247540008","ISU_SRT_CD":"247540","ISU_ABBRV":"에코프로비엠","MKT_TP_NM":"KOSDAQ GLOBAL"}
    ]}"#;

    /// Answers by `bld` and records every request body.
    #[derive(Default)]
    struct CannedKrx {
        bodies: Mutex<Vec<String>>,
        responses: BTreeMap<&'static str, (u16, &'static str)>,
    }

    impl HttpClient for CannedKrx {
        fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
            Box::pin(async move {
                let body = request.form_body().unwrap_or_default();
                self.bodies.lock().expect("lock").push(body);
                let screen = request.form_value("bld").unwrap_or_default();
                let answer = self
                    .responses
                    .iter()
                    .find(|(bld, _)| screen.contains(*bld))
                    .map(|(_, answer)| *answer);
                match answer {
                    Some((status, json)) => Ok(HttpResponse {
                        status,
                        body: json.to_owned(),
                    }),
                    None => Err(HttpError::new("connection refused")),
                }
            })
        }
    }

    fn adapter(responses: &[(&'static str, u16, &'static str)]) -> (KrxAdapter, Arc<CannedKrx>) {
        let client = Arc::new(CannedKrx {
            bodies: Mutex::new(Vec::new()),
            responses: responses
                .iter()
                .map(|(bld, status, body)| (*bld, (*status, *body)))
                .collect(),
        });
        (KrxAdapter::with_http_client(client.clone()), client)
    }

    fn range() -> DateRange {
        DateRange::new(
            TradeDate::parse("20250203").expect("valid"),
            TradeDate::parse("20250217").expect("valid"),
        )
        .expect("valid")
    }

    #[test]
    fn numbers_tolerate_separators_and_dashes() {
        assert_eq!(parse_number("-1,234,500"), Some(-1_234_500.0));
        assert_eq!(parse_number(" 2,500.5 "), Some(2_500.5));
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number(""), None);
    }

    #[tokio::test]
    async fn price_history_goes_through_the_isin() {
        let (adapter, client) = adapter(&[
            (BLD_DIRECTORY, 200, DIRECTORY),
            (
                BLD_STOCK_HISTORY,
                200,
                r#"{"output":[
                    {"TRD_DD":"2025/02/17","TDD_CLSPRC":"56,000"},
                    {"TRD_DD":"2025/02/14","TDD_CLSPRC":"55,800"}
                ]}"#,
            ),
        ]);

        let series = adapter
            .price_series(PriceSeriesRequest {
                ticker: Ticker::parse("005930").expect("valid"),
                range: range(),
            })
            .await
            .expect("series");

        assert_eq!(series.values_most_recent_first(), vec![56_000.0, 55_800.0]);
        let bodies = client.bodies.lock().expect("lock");
        assert!(bodies[1].contains("isuCd=KR7005930003"));
        assert!(bodies[1].contains("strtDd=20250203"));
    }

    #[tokio::test]
    async fn directory_is_loaded_once_and_split_by_market() {
        let (adapter, client) = adapter(&[(BLD_DIRECTORY, 200, DIRECTORY)]);

        let kosdaq = adapter.instrument_list(Market::Kosdaq).await.expect("listed");
        let name = adapter
            .instrument_name(Ticker::parse("005930").expect("valid"))
            .await
            .expect("named");

        assert_eq!(kosdaq, vec![Ticker::parse("247540").expect("valid")]);
        assert_eq!(name, "삼성전자");
        assert_eq!(client.bodies.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn index_request_splits_family_and_member() {
        let (adapter, client) = adapter(&[(
            BLD_INDEX_HISTORY,
            200,
            r#"{"output":[{"TRD_DD":"2025/02/17","CLSPRC_IDX":"2,591.05"}]}"#,
        )]);

        let series = adapter
            .index_series(IndexSeriesRequest {
                index: IndexCode::parse("2001").expect("valid"),
                range: range(),
            })
            .await
            .expect("series");

        assert_eq!(series.len(), 1);
        let bodies = client.bodies.lock().expect("lock");
        assert!(bodies[0].contains("indIdx=2&indIdx2=001"));
    }

    #[tokio::test]
    async fn investor_flows_map_summary_columns() {
        let (adapter, _) = adapter(&[
            (BLD_DIRECTORY, 200, DIRECTORY),
            (
                BLD_INVESTOR_FLOWS,
                200,
                r#"{"output":[
                    {"TRD_DD":"2025/02/17","TRDVAL1":"1,000","TRDVAL2":"-5","TRDVAL3":"7","TRDVAL4":"-2,000"}
                ]}"#,
            ),
        ]);

        let flows = adapter
            .investor_flows(InvestorFlowRequest {
                ticker: Ticker::parse("005930").expect("valid"),
                range: range(),
                detail: false,
            })
            .await
            .expect("flows");

        let row = &flows.rows[0];
        assert_eq!(row.values.get(&InvestorCategory::InstitutionTotal), Some(&1_000.0));
        assert_eq!(row.values.get(&InvestorCategory::Foreign), Some(&-2_000.0));
        assert!(!row.values.contains_key(&InvestorCategory::PensionFund));
    }

    #[tokio::test]
    async fn daily_quotes_skip_rows_without_close() {
        let (adapter, _) = adapter(&[(
            BLD_ALL_QUOTES,
            200,
            r#"{"OutBlock_1":[
                {"ISU_SRT_CD":"005930","ISU_ABBRV":"삼성전자","MKT_NM":"KOSPI","TDD_CLSPRC":"56,000","ACC_TRDVOL":"12,345,678","ACC_TRDVAL":"691,000,000,000"},
                {"ISU_SRT_CD":"000020","ISU_ABBRV":"동화약품","MKT_NM":"KOSPI","TDD_CLSPRC":"-","ACC_TRDVOL":"0","ACC_TRDVAL":"0"}
            ]}"#,
        )]);

        let quotes = adapter
            .daily_quotes(DailyQuotesRequest {
                date: TradeDate::parse("20250217").expect("valid"),
                scope: MarketScope::All,
            })
            .await
            .expect("quotes");

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].volume, 12_345_678);
        assert_eq!(quotes[0].market, Some(Market::Kospi));
    }

    #[tokio::test]
    async fn non_success_status_is_a_status_error() {
        let (adapter, _) = adapter(&[(BLD_NET_PURCHASES, 503, "")]);

        let error = adapter
            .net_buying(NetBuyingRequest {
                market: Market::Kospi,
                investor: InvestorCategory::Foreign,
                range: range(),
            })
            .await
            .expect_err("must fail");

        assert_eq!(error.code(), "provider.status");
    }
}
