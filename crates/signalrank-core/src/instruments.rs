use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::data_source::MarketDataProvider;
use crate::retry::{OperationDescriptor, ResilientFetcher};
use crate::{Instrument, Market, Ticker, UNKNOWN_NAME};

/// Listing and display-name lookups with a per-run name memo.
///
/// Names are display-only: a lookup is tried once, without alerting, and a
/// failure resolves to [`UNKNOWN_NAME`], which is memoized as well.
pub struct InstrumentResolver {
    provider: Arc<dyn MarketDataProvider>,
    fetcher: ResilientFetcher,
    names: Mutex<HashMap<Ticker, String>>,
}

impl InstrumentResolver {
    pub fn new(provider: Arc<dyn MarketDataProvider>, fetcher: ResilientFetcher) -> Self {
        Self {
            provider,
            fetcher,
            names: Mutex::new(HashMap::new()),
        }
    }

    /// Listed tickers of `market`, or `None` once retries are exhausted.
    pub async fn listed(&self, market: Market) -> Option<Vec<Ticker>> {
        let operation = OperationDescriptor::new("instrument_list", market.as_str());
        let provider = self.provider.as_ref();
        self.fetcher
            .fetch(&operation, move || provider.instrument_list(market))
            .await
            .ok()
    }

    /// Seed the memo with a name that arrived alongside other data.
    pub fn remember(&self, ticker: &Ticker, name: &str) {
        if name.trim().is_empty() {
            return;
        }
        self.names
            .lock()
            .expect("name memo lock is not poisoned")
            .entry(ticker.clone())
            .or_insert_with(|| name.to_owned());
    }

    pub async fn name(&self, ticker: &Ticker) -> String {
        if let Some(name) = self.cached(ticker) {
            return name;
        }

        let name = match self.provider.instrument_name(ticker.clone()).await {
            Ok(name) if !name.trim().is_empty() => name,
            Ok(_) => UNKNOWN_NAME.to_owned(),
            Err(error) => {
                tracing::debug!(ticker = %ticker, error = %error, "name lookup failed");
                UNKNOWN_NAME.to_owned()
            }
        };

        self.names
            .lock()
            .expect("name memo lock is not poisoned")
            .insert(ticker.clone(), name.clone());
        name
    }

    pub async fn resolve(&self, ticker: &Ticker, market: Option<Market>) -> Instrument {
        let name = self.name(ticker).await;
        Instrument::new(ticker.clone(), name, market)
    }

    pub fn memo_len(&self) -> usize {
        self.names
            .lock()
            .expect("name memo lock is not poisoned")
            .len()
    }

    fn cached(&self, ticker: &Ticker) -> Option<String> {
        self.names
            .lock()
            .expect("name memo lock is not poisoned")
            .get(ticker)
            .cloned()
    }
}

impl std::fmt::Debug for InstrumentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentResolver")
            .field("provider", &self.provider.id())
            .field("memoized", &self.memo_len())
            .finish()
    }
}
