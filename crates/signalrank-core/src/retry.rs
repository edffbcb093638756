//! Bounded retry with a fixed delay around one provider call.
//!
//! Every provider endpoint is fetched through [`ResilientFetcher::fetch`].
//! A single attempt fails transiently when the call errors or when it
//! returns an empty payload; both are retried the same way. Once the attempt
//! budget is spent the caller gets [`FetchOutcome::PermanentFailure`] and
//! exactly one alert is sent.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::alert::Alerter;
use crate::data_source::ProviderError;
use crate::{High52Page, InvestorFlows, TimeSeries};

/// Attempt budget and fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `0` behaves like `1`.
    pub max_attempts: u32,
    /// Wait before each reattempt.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(20),
        }
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Single attempt, no waiting.
    pub const fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Describes a retried call for logs and alerts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub operation: &'static str,
    pub target: String,
    pub params: Vec<(&'static str, String)>,
}

impl OperationDescriptor {
    pub fn new(operation: &'static str, target: impl Into<String>) -> Self {
        Self {
            operation,
            target: target.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.params.push((name, value.to_string()));
        self
    }
}

impl Display for OperationDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.operation, self.target)
    }
}

/// Decides whether a successful call carried data.
pub trait FetchPayload {
    fn is_empty_payload(&self) -> bool;
}

impl<T> FetchPayload for Vec<T> {
    fn is_empty_payload(&self) -> bool {
        self.is_empty()
    }
}

impl FetchPayload for String {
    fn is_empty_payload(&self) -> bool {
        self.trim().is_empty()
    }
}

impl FetchPayload for TimeSeries {
    fn is_empty_payload(&self) -> bool {
        self.is_empty()
    }
}

impl FetchPayload for InvestorFlows {
    fn is_empty_payload(&self) -> bool {
        self.is_empty()
    }
}

impl FetchPayload for High52Page {
    fn is_empty_payload(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Why a single attempt did not produce data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    Empty,
    Provider(ProviderError),
}

impl Display for AttemptFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("empty result"),
            Self::Provider(error) => Display::fmt(error, f),
        }
    }
}

/// Retries exhausted for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub operation: OperationDescriptor,
    pub attempts: u32,
    pub last_failure: AttemptFailure,
}

impl FetchFailure {
    /// Operator-facing alert text.
    pub fn alert_message(&self) -> String {
        let mut message = format!(
            "❌ data fetch failed\n\noperation: {}\ntarget: {}\n",
            self.operation.operation, self.operation.target
        );
        for (name, value) in &self.operation.params {
            message.push_str(&format!("{name}: {value}\n"));
        }
        message.push_str(&format!(
            "\nall {} attempts failed (last: {})",
            self.attempts, self.last_failure
        ));
        message
    }
}

impl Display for FetchFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} failed after {} attempts: {}",
            self.operation, self.attempts, self.last_failure
        )
    }
}

impl std::error::Error for FetchFailure {}

/// Result of a retried fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Success(T),
    PermanentFailure(FetchFailure),
}

impl<T> FetchOutcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::PermanentFailure(_) => None,
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_result(self) -> Result<T, FetchFailure> {
        match self {
            Self::Success(value) => Ok(value),
            Self::PermanentFailure(failure) => Err(failure),
        }
    }
}

/// Runs provider calls under a [`RetryPolicy`] and alerts on exhaustion.
#[derive(Clone)]
pub struct ResilientFetcher {
    policy: RetryPolicy,
    alerter: Arc<dyn Alerter>,
}

impl ResilientFetcher {
    pub fn new(policy: RetryPolicy, alerter: Arc<dyn Alerter>) -> Self {
        Self { policy, alerter }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn alerter(&self) -> &Arc<dyn Alerter> {
        &self.alerter
    }

    /// Invoke `call` until it yields a non-empty payload or the budget runs out.
    pub async fn fetch<T, F, Fut>(&self, operation: &OperationDescriptor, mut call: F) -> FetchOutcome<T>
    where
        T: FetchPayload,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.policy.effective_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let failure = match call().await {
                Ok(value) if !value.is_empty_payload() => return FetchOutcome::Success(value),
                Ok(_) => AttemptFailure::Empty,
                Err(error) => AttemptFailure::Provider(error),
            };

            tracing::warn!(
                operation = operation.operation,
                target = %operation.target,
                attempt,
                max_attempts,
                reason = %failure,
                "fetch attempt failed"
            );

            if attempt >= max_attempts {
                let failure = FetchFailure {
                    operation: operation.clone(),
                    attempts: attempt,
                    last_failure: failure,
                };
                tracing::error!(failure = %failure, "retries exhausted");
                self.alerter.notify(&failure.alert_message()).await;
                return FetchOutcome::PermanentFailure(failure);
            }

            if !self.policy.delay.is_zero() {
                tracing::info!(
                    delay_secs = self.policy.delay.as_secs_f64(),
                    "retrying after fixed delay"
                );
                tokio::time::sleep(self.policy.delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::alert::RecordingAlerter;

    fn fetcher(max_attempts: u32) -> (ResilientFetcher, RecordingAlerter) {
        let alerter = RecordingAlerter::new();
        let fetcher = ResilientFetcher::new(
            RetryPolicy::new(max_attempts, Duration::ZERO),
            Arc::new(alerter.clone()),
        );
        (fetcher, alerter)
    }

    #[test]
    fn default_policy_is_five_attempts_twenty_seconds_apart() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_secs(20));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).effective_attempts(), 1);
    }

    #[tokio::test]
    async fn empty_payload_is_retried_like_an_error() {
        let (fetcher, alerter) = fetcher(3);
        let calls = AtomicU32::new(0);
        let op = OperationDescriptor::new("instrument_list", "KOSPI");

        let outcome = fetcher
            .fetch(&op, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    match n {
                        0 => Ok(Vec::<u32>::new()),
                        1 => Err(ProviderError::transport("reset by peer")),
                        _ => Ok(vec![7]),
                    }
                }
            })
            .await;

        assert_eq!(outcome, FetchOutcome::Success(vec![7]));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(alerter.count(), 0);
    }

    #[tokio::test]
    async fn zero_attempt_budget_still_calls_once() {
        let (fetcher, alerter) = fetcher(0);
        let calls = AtomicU32::new(0);
        let op = OperationDescriptor::new("instrument_name", "005930");

        let outcome = fetcher
            .fetch(&op, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(String::new()) }
            })
            .await;

        assert!(!outcome.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(alerter.count(), 1);
    }

    #[test]
    fn alert_message_names_operation_target_and_params() {
        let failure = FetchFailure {
            operation: OperationDescriptor::new("price_series", "005930")
                .with_param("period", "20250101~20250217"),
            attempts: 5,
            last_failure: AttemptFailure::Empty,
        };
        let message = failure.alert_message();
        assert!(message.contains("operation: price_series"));
        assert!(message.contains("target: 005930"));
        assert!(message.contains("period: 20250101~20250217"));
        assert!(message.contains("all 5 attempts failed"));
    }
}
