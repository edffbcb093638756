use std::sync::Arc;

use serde::Deserialize;

use crate::data_source::{High52Request, High52Source, ProviderError, ProviderFuture};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::{High52Entry, High52Page};

/// Mobile stock API listing instruments at a 52-week high.
pub const NAVER_HIGH52_URL: &str = "https://m.stock.naver.com/api/stocks/high52week/all";

/// Naver Finance adapter for the 52-week-high listing.
#[derive(Clone)]
pub struct NaverAdapter {
    http_client: Arc<dyn HttpClient>,
    endpoint: String,
}

impl Default for NaverAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }
}

impl NaverAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            endpoint: String::from(NAVER_HIGH52_URL),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn request(&self, req: High52Request) -> HttpRequest {
        HttpRequest::get(&self.endpoint)
            .query("page", req.page)
            .query("pageSize", req.page_size)
            .header("referer", "https://m.stock.naver.com/")
    }
}

impl High52Source for NaverAdapter {
    fn id(&self) -> &'static str {
        "naver"
    }

    fn high52_page<'a>(&'a self, req: High52Request) -> ProviderFuture<'a, High52Page> {
        Box::pin(async move {
            let response = self
                .http_client
                .execute(self.request(req))
                .await
                .map_err(|e| ProviderError::transport(format!("naver transport error: {}", e.message())))?;

            if !response.is_success() {
                return Err(ProviderError::status(response.status, "naver"));
            }

            parse_page(&response.body)
        })
    }
}

fn parse_page(body: &str) -> Result<High52Page, ProviderError> {
    let response: NaverHigh52Response = serde_json::from_str(body)
        .map_err(|e| ProviderError::parse(format!("failed to parse naver 52-week page: {e}")))?;

    Ok(High52Page {
        total_count: response.total_count,
        entries: response
            .stocks
            .into_iter()
            .map(|stock| High52Entry {
                ticker: stock.item_code,
                name: stock.stock_name,
                close_price: stock.close_price,
                change_ratio: stock.fluctuations_ratio,
                market_value: stock.market_value_hangeul,
                trading_value: stock.accumulated_trading_value_krw_hangeul,
                entity_type: stock.stock_end_type,
            })
            .collect(),
    })
}

// ============================================================================
// Naver API response structures
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NaverHigh52Response {
    #[serde(default)]
    total_count: usize,
    #[serde(default)]
    stocks: Vec<NaverStock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NaverStock {
    item_code: String,
    stock_name: String,
    #[serde(default)]
    close_price: String,
    #[serde(default)]
    fluctuations_ratio: String,
    #[serde(default)]
    market_value_hangeul: String,
    #[serde(default)]
    accumulated_trading_value_krw_hangeul: String,
    #[serde(default)]
    stock_end_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::NoopHttpClient;

    #[test]
    fn page_request_carries_paging_query() {
        let adapter = NaverAdapter::with_http_client(Arc::new(NoopHttpClient));
        let request = adapter.request(High52Request::new(2, 100).expect("valid"));
        assert_eq!(
            request.full_url(),
            "https://m.stock.naver.com/api/stocks/high52week/all?page=2&pageSize=100"
        );
    }

    #[test]
    fn parses_listing_fields() {
        let page = parse_page(
            r#"{"totalCount":42,"stocks":[
                {"itemCode":"005930","stockName":"삼성전자","closePrice":"81,000",
                 "fluctuationsRatio":"2.15","marketValueHangeul":"483조 5,487억",
                 "accumulatedTradingValueKrwHangeul":"1조 2,345억","stockEndType":"stock"},
                {"itemCode":"069500","stockName":"KODEX 200","stockEndType":"etf"}
            ]}"#,
        )
        .expect("parsed");

        assert_eq!(page.total_count, 42);
        assert_eq!(page.entries.len(), 2);
        assert!(page.entries[0].is_stock());
        assert_eq!(page.entries[0].trading_value, "1조 2,345억");
        assert!(!page.entries[1].is_stock());
    }

    #[tokio::test]
    async fn empty_object_is_an_empty_page() {
        let adapter = NaverAdapter::with_http_client(Arc::new(NoopHttpClient));
        let page = adapter
            .high52_page(High52Request::new(1, 100).expect("valid"))
            .await
            .expect("parsed");
        assert!(page.entries.is_empty());
    }
}
