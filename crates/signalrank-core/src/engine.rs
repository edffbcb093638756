//! Runs the report steps of one trading day.
//!
//! Steps execute in the order requested, strictly one after another. Before
//! each step the sink checks its configuration; a [`ConfigError`] raises one
//! alert and aborts that step only. A step whose data is entirely
//! unavailable publishes nothing and is reported as empty.
//!
//! [`ConfigError`]: crate::ConfigError

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::alert::Alerter;
use crate::config::{RunContext, SignalConfig};
use crate::data_source::{High52Source, MarketDataProvider};
use crate::instruments::InstrumentResolver;
use crate::ranking::RankingAggregator;
use crate::reports::{
    High52ReportBuilder, InvestorReportBuilder, Report, ReportKind, RsReportBuilder,
    VolumeReportBuilder,
};
use crate::retry::ResilientFetcher;
use crate::rs::RsCalculator;
use crate::sink::{PublishedReport, ReportSink};
use crate::throttling::Pacer;
use crate::TradeDate;

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Published { location: String },
    Empty,
    Aborted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub kind: ReportKind,
    pub outcome: StepOutcome,
    /// The published report, kept for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_date: TradeDate,
    pub steps: Vec<StepResult>,
}

impl RunSummary {
    /// Every step published a report.
    pub fn is_complete(&self) -> bool {
        self.steps
            .iter()
            .all(|step| matches!(step.outcome, StepOutcome::Published { .. }))
    }

    pub fn aborted(&self) -> impl Iterator<Item = &StepResult> {
        self.steps
            .iter()
            .filter(|step| matches!(step.outcome, StepOutcome::Aborted { .. }))
    }

    pub fn reports(&self) -> impl Iterator<Item = &Report> {
        self.steps.iter().filter_map(|step| step.report.as_ref())
    }
}

/// Signal engine over one provider, one 52-week source and one sink.
pub struct SignalEngine {
    config: SignalConfig,
    provider: Arc<dyn MarketDataProvider>,
    high52: Arc<dyn High52Source>,
    sink: Arc<dyn ReportSink>,
    alerter: Arc<dyn Alerter>,
}

impl SignalEngine {
    pub fn new(
        config: SignalConfig,
        provider: Arc<dyn MarketDataProvider>,
        high52: Arc<dyn High52Source>,
        sink: Arc<dyn ReportSink>,
        alerter: Arc<dyn Alerter>,
    ) -> Self {
        Self {
            config,
            provider,
            high52,
            sink,
            alerter,
        }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Run `kinds` for `run`. The name memo lives for this call only.
    pub async fn run(&self, run: &RunContext, kinds: &[ReportKind]) -> RunSummary {
        let fetcher = ResilientFetcher::new(self.config.retry, Arc::clone(&self.alerter));
        let resolver = Arc::new(InstrumentResolver::new(
            Arc::clone(&self.provider),
            fetcher.clone(),
        ));

        tracing::info!(
            run_date = %run.run_date,
            provider = self.provider.id(),
            sink = self.sink.id(),
            steps = kinds.len(),
            "signal run started"
        );

        let mut steps = Vec::with_capacity(kinds.len());
        for kind in kinds {
            steps.push(self.step(*kind, run, &fetcher, &resolver).await);
        }

        let summary = RunSummary {
            run_date: run.run_date,
            steps,
        };
        tracing::info!(complete = summary.is_complete(), "signal run finished");
        summary
    }

    async fn step(
        &self,
        kind: ReportKind,
        run: &RunContext,
        fetcher: &ResilientFetcher,
        resolver: &Arc<InstrumentResolver>,
    ) -> StepResult {
        tracing::info!(step = %kind, "step started");

        if let Err(error) = self.sink.ensure_ready() {
            tracing::error!(step = %kind, error = %error, "step aborted by configuration error");
            self.alerter
                .notify(&format!(
                    "⚠️ {kind} report aborted\n\nconfiguration error: {error}"
                ))
                .await;
            return StepResult {
                kind,
                outcome: StepOutcome::Aborted {
                    reason: error.to_string(),
                },
                report: None,
            };
        }

        let Some(report) = self.build(kind, run, fetcher, resolver).await else {
            tracing::warn!(step = %kind, "no data for step, nothing published");
            return StepResult {
                kind,
                outcome: StepOutcome::Empty,
                report: None,
            };
        };

        match self.sink.publish(&report).await {
            Ok(PublishedReport { location, .. }) => {
                tracing::info!(step = %kind, location = %location, "step published");
                StepResult {
                    kind,
                    outcome: StepOutcome::Published { location },
                    report: Some(report),
                }
            }
            Err(error) => {
                tracing::error!(step = %kind, error = %error, "publishing failed");
                self.alerter
                    .notify(&format!("⚠️ {kind} report could not be published\n\n{error}"))
                    .await;
                StepResult {
                    kind,
                    outcome: StepOutcome::Aborted {
                        reason: error.to_string(),
                    },
                    report: None,
                }
            }
        }
    }

    async fn build(
        &self,
        kind: ReportKind,
        run: &RunContext,
        fetcher: &ResilientFetcher,
        resolver: &Arc<InstrumentResolver>,
    ) -> Option<Report> {
        let pacing = self.config.pacing;
        match kind {
            ReportKind::Volume => VolumeReportBuilder::new(Arc::clone(&self.provider), fetcher.clone())
                .build(run)
                .await
                .map(Report::Volume),
            ReportKind::Investors => InvestorReportBuilder::new(
                Arc::clone(&self.provider),
                fetcher.clone(),
                Arc::clone(resolver),
                Pacer::new(pacing.instrument),
            )
            .build(run)
            .await
            .map(Report::Investors),
            ReportKind::RelativeStrength => RsReportBuilder::new(
                RsCalculator::new(Arc::clone(&self.provider), fetcher.clone(), self.config.rs),
                Arc::clone(resolver),
                RankingAggregator::new(Pacer::new(pacing.instrument)),
                Pacer::new(pacing.market),
            )
            .build(run)
            .await
            .map(Report::RelativeStrength),
            ReportKind::High52 => High52ReportBuilder::new(
                Arc::clone(&self.high52),
                fetcher.clone(),
                Pacer::new(pacing.page),
                self.config.high52,
            )
            .build(run.run_date)
            .await
            .map(Report::High52),
        }
    }
}
