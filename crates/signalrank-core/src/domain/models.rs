use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{InvestorCategory, Market, SeriesPoint, Ticker, TimeSeries, TradeDate, ValidationError};

/// Display name used when the name lookup fails.
pub const UNKNOWN_NAME: &str = "알 수 없음";

/// Listed instrument with its resolved display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub ticker: Ticker,
    pub name: String,
    pub market: Option<Market>,
}

impl Instrument {
    pub fn new(ticker: Ticker, name: impl Into<String>, market: Option<Market>) -> Self {
        Self {
            ticker,
            name: name.into(),
            market,
        }
    }
}

/// Net buying amount (KRW, signed) of one investor category for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetBuyingRecord {
    pub ticker: Ticker,
    pub name: String,
    pub investor: InvestorCategory,
    pub amount: f64,
}

/// Per-date signed net buying of each investor category for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorFlowRow {
    pub date: TradeDate,
    pub values: BTreeMap<InvestorCategory, f64>,
}

/// Investor flow table for one ticker over a date range.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InvestorFlows {
    pub ticker: Option<Ticker>,
    pub rows: Vec<InvestorFlowRow>,
}

impl InvestorFlows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Series of one category. Rows without that column are skipped.
    pub fn series_for(&self, investor: InvestorCategory) -> Result<TimeSeries, ValidationError> {
        TimeSeries::new(
            self.rows
                .iter()
                .filter_map(|row| {
                    row.values
                        .get(&investor)
                        .map(|value| SeriesPoint {
                            date: row.date,
                            value: *value,
                        })
                })
                .collect(),
        )
    }
}

/// End-of-day quote row of the whole-market listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyQuote {
    pub ticker: Ticker,
    pub name: String,
    pub market: Option<Market>,
    pub close: f64,
    pub volume: u64,
    pub trading_value: f64,
}

/// Relative strength of one instrument over one lookback period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsWindowResult {
    pub instrument: Instrument,
    pub period: usize,
    pub raw_ratio: f64,
    pub score: f64,
}

/// One ranked row. Only built for instruments whose metric resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub rank: usize,
    pub instrument: Instrument,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak: Option<usize>,
}

impl RankingEntry {
    /// Copy of this row carrying a streak length.
    pub fn with_streak(&self, streak: Option<usize>) -> Self {
        Self {
            streak,
            ..self.clone()
        }
    }
}

/// Instrument trading at a 52-week high.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct High52Entry {
    pub ticker: String,
    pub name: String,
    pub close_price: String,
    pub change_ratio: String,
    pub market_value: String,
    pub trading_value: String,
    pub entity_type: String,
}

impl High52Entry {
    pub fn is_stock(&self) -> bool {
        self.entity_type == "stock"
    }
}

/// One page of the 52-week-high listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct High52Page {
    pub total_count: usize,
    pub entries: Vec<High52Entry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u8) -> TradeDate {
        TradeDate::from_ymd(2025, 2, day).expect("valid date")
    }

    #[test]
    fn flow_series_picks_one_category() {
        let flows = InvestorFlows {
            ticker: None,
            rows: vec![
                InvestorFlowRow {
                    date: date(14),
                    values: BTreeMap::from([
                        (InvestorCategory::Foreign, 10.0),
                        (InvestorCategory::InstitutionTotal, -3.0),
                    ]),
                },
                InvestorFlowRow {
                    date: date(17),
                    values: BTreeMap::from([(InvestorCategory::Foreign, 7.0)]),
                },
            ],
        };

        let foreign = flows.series_for(InvestorCategory::Foreign).expect("valid");
        assert_eq!(foreign.values_most_recent_first(), vec![7.0, 10.0]);

        let institution = flows
            .series_for(InvestorCategory::InstitutionTotal)
            .expect("valid");
        assert_eq!(institution.len(), 1);
    }

    #[test]
    fn with_streak_keeps_rank_and_value() {
        let entry = RankingEntry {
            rank: 2,
            instrument: Instrument::new(Ticker::parse("005930").expect("valid"), "삼성전자", None),
            value: 1.5e9,
            streak: None,
        };
        let enriched = entry.with_streak(Some(3));
        assert_eq!(enriched.rank, 2);
        assert_eq!(enriched.value, entry.value);
        assert_eq!(enriched.streak, Some(3));
        assert_eq!(entry.streak, None);
    }
}
