use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::High52Config;
use crate::data_source::{High52Request, High52Source};
use crate::retry::{OperationDescriptor, ResilientFetcher};
use crate::throttling::Pacer;
use crate::{High52Entry, TradeDate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct High52Row {
    pub rank: usize,
    pub entry: High52Entry,
}

/// Stocks at a 52-week high, in provider order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct High52Report {
    pub run_date: TradeDate,
    /// Listing size reported by the provider, all entity types included.
    pub total_count: usize,
    pub rows_per_page: usize,
    pub rows: Vec<High52Row>,
}

impl High52Report {
    /// Rows split into rendered pages.
    pub fn pages(&self) -> Vec<&[High52Row]> {
        self.rows.chunks(self.rows_per_page.max(1)).collect()
    }
}

pub struct High52ReportBuilder {
    source: Arc<dyn High52Source>,
    fetcher: ResilientFetcher,
    pacer: Pacer,
    config: High52Config,
}

impl High52ReportBuilder {
    pub fn new(
        source: Arc<dyn High52Source>,
        fetcher: ResilientFetcher,
        pacer: Pacer,
        config: High52Config,
    ) -> Self {
        Self {
            source,
            fetcher,
            pacer,
            config,
        }
    }

    /// Walk the listing until `limit` stocks are collected or it runs out.
    ///
    /// A page that fails permanently ends the walk; whatever was collected
    /// before it is still reported.
    pub async fn build(&self, run_date: TradeDate) -> Option<High52Report> {
        let mut stocks: Vec<High52Entry> = Vec::new();
        let mut total_count = 0;
        let mut page = 1;

        loop {
            let Ok(request) = High52Request::new(page, self.config.page_size) else {
                break;
            };
            self.pacer.pace().await;

            let operation = OperationDescriptor::new("high52_page", page.to_string())
                .with_param("page_size", self.config.page_size);
            let source = self.source.as_ref();
            let Some(listing) = self
                .fetcher
                .fetch(&operation, move || source.high52_page(request))
                .await
                .ok()
            else {
                break;
            };

            total_count = listing.total_count;
            stocks.extend(listing.entries.into_iter().filter(High52Entry::is_stock));

            let exhausted = page.saturating_mul(self.config.page_size) >= total_count;
            if stocks.len() >= self.config.limit || exhausted {
                break;
            }
            page += 1;
        }

        stocks.truncate(self.config.limit);
        tracing::info!(rows = stocks.len(), total_count, "52-week highs collected");
        if stocks.is_empty() {
            return None;
        }

        Some(High52Report {
            run_date,
            total_count,
            rows_per_page: self.config.rows_per_page,
            rows: stocks
                .into_iter()
                .enumerate()
                .map(|(index, entry)| High52Row {
                    rank: index + 1,
                    entry,
                })
                .collect(),
        })
    }
}
