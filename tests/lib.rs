// Shared helpers for the behaviour suites
use std::sync::Arc;
use std::time::Duration;

use signalrank_core::{RecordingAlerter, ResilientFetcher, RetryPolicy};

/// Fetcher with no delay between attempts, wired to a recording alerter.
pub fn fetcher(max_attempts: u32) -> (ResilientFetcher, RecordingAlerter) {
    let alerter = RecordingAlerter::new();
    let fetcher = ResilientFetcher::new(
        RetryPolicy::new(max_attempts, Duration::ZERO),
        Arc::new(alerter.clone()),
    );
    (fetcher, alerter)
}
