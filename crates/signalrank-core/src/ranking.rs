//! Top-N ranking of per-instrument metrics.
//!
//! Ranking happens in two stages. [`RankingAggregator::evaluate`] walks the
//! instruments one at a time and records each metric (or its absence);
//! [`top_n`] then keeps the best `n` resolved values. Enrichment such as the
//! net-buying streak produces new entries and never reorders a table.

use std::collections::HashSet;
use std::future::Future;

use crate::throttling::Pacer;
use crate::{Instrument, RankingEntry};

/// Progress is logged after this many evaluated instruments.
const PROGRESS_EVERY: usize = 50;

/// Rank `candidates` by value, highest first, and keep at most `n` rows.
///
/// * Candidates without a finite metric are dropped.
/// * A ticker seen more than once keeps its first valid occurrence only.
/// * Equal values keep their input order.
/// * Ranks are 1-based and assigned after sorting.
pub fn top_n<I>(candidates: I, n: usize) -> Vec<RankingEntry>
where
    I: IntoIterator<Item = (Instrument, Option<f64>)>,
{
    let mut seen = HashSet::new();
    let mut valid: Vec<(Instrument, f64)> = candidates
        .into_iter()
        .filter_map(|(instrument, value)| match value {
            Some(value) if value.is_finite() => Some((instrument, value)),
            _ => None,
        })
        .filter(|(instrument, _)| seen.insert(instrument.ticker.clone()))
        .collect();

    // `sort_by` is stable, so ties stay in discovery order.
    valid.sort_by(|left, right| right.1.total_cmp(&left.1));

    valid
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(index, (instrument, value))| RankingEntry {
            rank: index + 1,
            instrument,
            value,
            streak: None,
        })
        .collect()
}

/// Evaluates a metric per instrument, strictly one after another.
#[derive(Debug, Clone)]
pub struct RankingAggregator {
    pacer: Pacer,
}

impl RankingAggregator {
    pub fn new(pacer: Pacer) -> Self {
        Self { pacer }
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    /// Run `metric` for every instrument, pacing between calls.
    pub async fn evaluate<T, F, Fut>(&self, label: &str, items: Vec<T>, mut metric: F) -> Vec<(T, Option<f64>)>
    where
        F: FnMut(&T) -> Fut,
        Fut: Future<Output = Option<f64>>,
    {
        let total = items.len();
        let mut evaluated = Vec::with_capacity(total);

        for (index, item) in items.into_iter().enumerate() {
            self.pacer.pace().await;
            let value = metric(&item).await;
            evaluated.push((item, value));

            let done = index + 1;
            if done % PROGRESS_EVERY == 0 || done == total {
                tracing::info!(label, done, total, "metric evaluation progress");
            }
        }

        evaluated
    }

    /// Evaluate and rank in one call.
    pub async fn rank<F, Fut>(&self, label: &str, instruments: Vec<Instrument>, n: usize, metric: F) -> Vec<RankingEntry>
    where
        F: FnMut(&Instrument) -> Fut,
        Fut: Future<Output = Option<f64>>,
    {
        let evaluated = self.evaluate(label, instruments, metric).await;
        top_n(evaluated, n)
    }
}
