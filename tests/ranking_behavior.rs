//! Behavior-driven tests for ranking, streaks and relative strength
//!
//! These tests verify the ordering rules of ranked tables and the scoring
//! rules of the relative-strength calculation.

use std::sync::Arc;

use signalrank_core::{
    compute_rs, consecutive_positive_run, top_n, FailureMode, Instrument, RsCalculator, RsConfig,
    StaticMarketData, Ticker, TimeSeries, TradeDate,
};
use signalrank_tests::fetcher;

fn instrument(code: &str) -> Instrument {
    Instrument::new(Ticker::parse(code).expect("valid"), code, None)
}

fn series(end: TradeDate, closes: &[f64]) -> TimeSeries {
    let days = closes.len() as u32;
    TimeSeries::from_pairs(
        closes
            .iter()
            .enumerate()
            .map(|(offset, close)| (end.minus_days(days - 1 - offset as u32), *close)),
    )
    .expect("valid series")
}

// =============================================================================
// Ranking: Ordering
// =============================================================================

#[test]
fn when_values_tie_system_keeps_discovery_order() {
    // Given: Two instruments with equal metrics ahead of a lower one
    let candidates = vec![
        (instrument("00000A"), Some(100.0)),
        (instrument("00000B"), Some(100.0)),
        (instrument("00000C"), Some(80.0)),
    ];

    // When: The top two are ranked
    let ranked = top_n(candidates, 2);

    // Then: The tie keeps input order
    let order: Vec<&str> = ranked.iter().map(|e| e.instrument.ticker.as_str()).collect();
    assert_eq!(order, vec!["00000A", "00000B"]);
}

#[test]
fn when_ranking_system_orders_descending_and_truncates() {
    // Given: Three scored instruments
    let candidates = vec![
        (instrument("00000A"), Some(120.0)),
        (instrument("00000B"), Some(90.0)),
        (instrument("00000C"), Some(200.0)),
    ];

    // When: The top two are ranked
    let ranked = top_n(candidates, 2);

    // Then: The highest values come first with 1-based ranks
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].instrument.ticker.as_str(), "00000C");
    assert_eq!(ranked[0].value, 200.0);
    assert_eq!(ranked[0].rank, 1);
    assert_eq!(ranked[1].instrument.ticker.as_str(), "00000A");
    assert_eq!(ranked[1].value, 120.0);
    assert_eq!(ranked[1].rank, 2);
}

#[test]
fn when_metrics_fail_system_excludes_instead_of_padding() {
    // Given: One resolved metric among failures
    let candidates = vec![
        (instrument("00000A"), None),
        (instrument("00000B"), Some(5.0)),
        (instrument("00000C"), Some(f64::INFINITY)),
    ];

    // When: Fifteen rows are requested
    let ranked = top_n(candidates, 15);

    // Then: Only the resolved instrument appears
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].instrument.ticker.as_str(), "00000B");
}

// =============================================================================
// Streaks
// =============================================================================

#[test]
fn when_series_starts_positive_system_counts_until_first_non_positive() {
    assert_eq!(consecutive_positive_run(&[5.0, 3.0, -1.0, 4.0]), 2);
    assert_eq!(consecutive_positive_run(&[-1.0, 5.0, 5.0]), 0);
    assert_eq!(consecutive_positive_run(&[]), 0);
}

// =============================================================================
// Relative Strength
// =============================================================================

#[test]
fn when_instrument_tracks_benchmark_system_scores_parity() {
    // Given: An instrument moving exactly like its benchmark
    let end = TradeDate::parse("20250217").expect("valid");
    let stock = series(end, &[100.0, 105.0, 99.75, 104.7375]);
    let index = series(end, &[2_000.0, 2_100.0, 1_995.0, 2_094.75]);

    // When: RS is computed over the whole window
    let score = compute_rs(&stock, &index, 4, &RsConfig::default()).expect("scorable");

    // Then: The score is 50
    assert!((score.score - 50.0).abs() < 1e-9);
}

#[test]
fn when_outperformance_grows_system_score_never_decreases() {
    // Given: Instruments with increasing final prices against one benchmark
    let end = TradeDate::parse("20250217").expect("valid");
    let index = series(end, &[1_000.0, 1_010.0, 1_020.0]);
    let config = RsConfig::default();

    // When: Each is scored
    let scores: Vec<f64> = [80.0, 95.0, 102.0, 150.0, 400.0]
        .iter()
        .map(|last| {
            let stock = series(end, &[100.0, 100.0, *last]);
            compute_rs(&stock, &index, 3, &config).expect("scorable").score
        })
        .collect();

    // Then: Scores are monotone and clipped to [0, 100]
    assert!(scores.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(scores.iter().all(|score| (0.0..=100.0).contains(score)));
    assert_eq!(scores[4], 100.0);
}

#[tokio::test]
async fn when_price_history_always_fails_system_skips_instrument_with_one_alert() {
    // Given: A price series that fails on every attempt
    let end = TradeDate::parse("20250217").expect("valid");
    let data = StaticMarketData::new()
        .with_price_series(
            Ticker::parse("005930").expect("valid"),
            series(end, &[100.0, 101.0, 102.0]),
        )
        .with_failure("price_series", "005930", FailureMode::Always);
    let (fetcher, alerter) = fetcher(3);
    let calculator = RsCalculator::new(Arc::new(data.clone()), fetcher, RsConfig::default());
    let benchmark = series(end, &[1_000.0, 1_000.0, 1_000.0]);

    // When: The instrument is scored
    let result = calculator
        .score_against(&instrument("005930"), &benchmark, 3, end)
        .await;

    // Then: No score is produced, never a placeholder 0
    assert!(result.is_none());
    assert_eq!(data.calls_for("price_series", "005930"), 3);
    assert_eq!(alerter.count(), 1);
}
