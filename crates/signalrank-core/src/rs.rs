//! Relative strength of an instrument against its market benchmark.
//!
//! For a lookback of `period` trading days the two close series are aligned
//! on their common dates and cut to the latest `period` points. The
//! compounded return of each side gives
//! `raw = (1 + instrument) / (1 + benchmark)`, which is mapped onto
//! `50 + scale * log_base(raw)` and clipped to `[0, 100]`. Parity scores 50.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data_source::{DateRange, IndexSeriesRequest, MarketDataProvider, PriceSeriesRequest};
use crate::retry::{OperationDescriptor, ResilientFetcher};
use crate::{IndexCode, Instrument, RsWindowResult, Ticker, TimeSeries, TradeDate, ValidationError};

/// Normalization constants of the RS score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsConfig {
    pub base: f64,
    pub scale: f64,
}

impl Default for RsConfig {
    fn default() -> Self {
        Self {
            base: 2.0,
            scale: 50.0,
        }
    }
}

impl RsConfig {
    pub fn new(base: f64, scale: f64) -> Result<Self, ValidationError> {
        if !base.is_finite() || base <= 0.0 || base == 1.0 {
            return Err(ValidationError::InvalidLogBase {
                value: base.to_string(),
            });
        }
        if !scale.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "rs scale" });
        }
        Ok(Self { base, scale })
    }

    /// Map a raw ratio onto the clipped 0-100 score.
    pub fn normalize(&self, raw_ratio: f64) -> f64 {
        if raw_ratio.is_nan() || raw_ratio <= 0.0 {
            return 0.0;
        }
        let score = 50.0 + self.scale * raw_ratio.log(self.base);
        if score.is_nan() {
            return 0.0;
        }
        score.clamp(0.0, 100.0)
    }
}

/// Score of one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsScore {
    pub raw_ratio: f64,
    pub score: f64,
    pub window_len: usize,
}

/// Common dates of both series, latest `period` of them, oldest first.
pub fn aligned_window(
    instrument: &TimeSeries,
    benchmark: &TimeSeries,
    period: usize,
) -> Vec<(TradeDate, f64, f64)> {
    let benchmark_by_date = benchmark.by_date();
    let common: Vec<(TradeDate, f64, f64)> = instrument
        .points()
        .iter()
        .filter_map(|point| {
            benchmark_by_date
                .get(&point.date)
                .map(|bench| (point.date, point.value, *bench))
        })
        .collect();

    let skip = common.len().saturating_sub(period);
    common.into_iter().skip(skip).collect()
}

/// `Π(1 + pct_change) - 1` over consecutive prices.
///
/// Needs at least two prices, all strictly positive.
pub fn cumulative_return(prices: &[f64]) -> Option<f64> {
    if prices.len() < 2 || prices.iter().any(|price| !price.is_finite() || *price <= 0.0) {
        return None;
    }

    let growth = prices
        .windows(2)
        .map(|pair| 1.0 + (pair[1] / pair[0] - 1.0))
        .product::<f64>();
    Some(growth - 1.0)
}

/// RS score of `instrument` against `benchmark` over `period` aligned points.
pub fn compute_rs(
    instrument: &TimeSeries,
    benchmark: &TimeSeries,
    period: usize,
    config: &RsConfig,
) -> Option<RsScore> {
    if period == 0 {
        return None;
    }

    let window = aligned_window(instrument, benchmark, period);
    let instrument_prices: Vec<f64> = window.iter().map(|(_, price, _)| *price).collect();
    let benchmark_prices: Vec<f64> = window.iter().map(|(_, _, price)| *price).collect();

    let instrument_return = cumulative_return(&instrument_prices)?;
    let benchmark_return = cumulative_return(&benchmark_prices)?;

    let raw_ratio = (1.0 + instrument_return) / (1.0 + benchmark_return);
    if !raw_ratio.is_finite() {
        return None;
    }

    Some(RsScore {
        raw_ratio,
        score: config.normalize(raw_ratio),
        window_len: window.len(),
    })
}

/// Fetches the two close series through the resilient fetcher and scores them.
#[derive(Clone)]
pub struct RsCalculator {
    provider: Arc<dyn MarketDataProvider>,
    fetcher: ResilientFetcher,
    config: RsConfig,
}

impl RsCalculator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        fetcher: ResilientFetcher,
        config: RsConfig,
    ) -> Self {
        Self {
            provider,
            fetcher,
            config,
        }
    }

    pub fn config(&self) -> &RsConfig {
        &self.config
    }

    /// Calendar range wide enough to hold `period` trading days.
    pub fn history_range(run_date: TradeDate, period: usize) -> DateRange {
        let days = u32::try_from(period.saturating_mul(2)).unwrap_or(u32::MAX);
        DateRange {
            start: run_date.minus_days(days),
            end: run_date,
        }
    }

    pub async fn fetch_instrument(&self, ticker: &Ticker, range: DateRange) -> Option<TimeSeries> {
        let operation = OperationDescriptor::new("price_series", ticker.as_str())
            .with_param("range", range);
        let provider = self.provider.as_ref();
        let request = PriceSeriesRequest {
            ticker: ticker.clone(),
            range,
        };
        self.fetcher
            .fetch(&operation, move || provider.price_series(request.clone()))
            .await
            .ok()
    }

    pub async fn fetch_benchmark(&self, index: &IndexCode, range: DateRange) -> Option<TimeSeries> {
        let operation = OperationDescriptor::new("index_series", index.as_str())
            .with_param("range", range);
        let provider = self.provider.as_ref();
        let request = IndexSeriesRequest {
            index: index.clone(),
            range,
        };
        self.fetcher
            .fetch(&operation, move || provider.index_series(request.clone()))
            .await
            .ok()
    }

    /// Score one instrument for one period against an already fetched benchmark.
    ///
    /// Returns `None` when the instrument series is unavailable or the
    /// aligned window is too short to score.
    pub async fn score_against(
        &self,
        instrument: &Instrument,
        benchmark: &TimeSeries,
        period: usize,
        run_date: TradeDate,
    ) -> Option<RsWindowResult> {
        let range = Self::history_range(run_date, period);
        let series = self.fetch_instrument(&instrument.ticker, range).await?;
        let score = compute_rs(&series, benchmark, period, &self.config)?;
        Some(RsWindowResult {
            instrument: instrument.clone(),
            period,
            raw_ratio: score.raw_ratio,
            score: score.score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(closes: &[f64]) -> TimeSeries {
        let start = TradeDate::from_ymd(2025, 1, 1).expect("valid");
        TimeSeries::from_pairs(closes.iter().enumerate().map(|(offset, close)| {
            let date = TradeDate::from(
                start
                    .into_inner()
                    .checked_add(time::Duration::days(offset as i64))
                    .expect("in range"),
            );
            (date, *close)
        }))
        .expect("valid series")
    }

    #[test]
    fn parity_scores_exactly_fifty() {
        let config = RsConfig::default();
        assert_eq!(config.normalize(1.0), 50.0);

        let stock = series(&[100.0, 110.0, 121.0]);
        let index = series(&[1000.0, 1100.0, 1210.0]);
        let score = compute_rs(&stock, &index, 3, &config).expect("scorable");
        assert!((score.raw_ratio - 1.0).abs() < 1e-12);
        assert!((score.score - 50.0).abs() < 1e-9);
    }

    #[test]
    fn doubling_against_flat_benchmark_scores_one_hundred() {
        let config = RsConfig::default();
        let stock = series(&[10.0, 20.0]);
        let index = series(&[500.0, 500.0]);
        let score = compute_rs(&stock, &index, 20, &config).expect("scorable");
        assert_eq!(score.raw_ratio, 2.0);
        assert_eq!(score.score, 100.0);
        assert_eq!(score.window_len, 2);
    }

    #[test]
    fn extreme_ratios_are_clipped() {
        let config = RsConfig::default();
        assert_eq!(config.normalize(1000.0), 100.0);
        assert_eq!(config.normalize(0.0001), 0.0);
        assert_eq!(config.normalize(0.0), 0.0);
    }

    #[test]
    fn normalization_is_monotone() {
        let config = RsConfig::default();
        let ratios = [0.0001, 0.25, 0.5, 0.9, 1.0, 1.1, 1.5, 2.0, 10.0, 1000.0];
        let scores: Vec<f64> = ratios.iter().map(|r| config.normalize(*r)).collect();
        assert!(scores.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!((config.normalize(0.5) - 0.0).abs() < 1e-9);
        assert!((config.normalize(1.5) - (50.0 + 50.0 * 1.5_f64.log2())).abs() < 1e-9);
    }

    #[test]
    fn window_uses_latest_common_dates_only() {
        let stock = series(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let index = TimeSeries::new(stock.points()[1..].to_vec()).expect("valid");
        let window = aligned_window(&stock, &index, 3);
        let closes: Vec<f64> = window.iter().map(|(_, price, _)| *price).collect();
        assert_eq!(closes, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn single_point_window_is_not_scorable() {
        let config = RsConfig::default();
        let stock = series(&[10.0, 12.0]);
        let index = series(&[100.0, 90.0]);
        assert!(compute_rs(&stock, &index, 1, &config).is_none());
        assert!(compute_rs(&stock, &index, 0, &config).is_none());
    }

    #[test]
    fn cumulative_return_compounds_daily_changes() {
        let value = cumulative_return(&[100.0, 110.0, 99.0]).expect("valid");
        assert!((value - (-0.01)).abs() < 1e-12);
        assert!(cumulative_return(&[100.0, 0.0]).is_none());
    }

    #[test]
    fn config_rejects_degenerate_base() {
        assert!(RsConfig::new(1.0, 50.0).is_err());
        assert!(RsConfig::new(-2.0, 50.0).is_err());
        assert!(RsConfig::new(10.0, 25.0).is_ok());
    }
}
