mod report;
mod run;

use std::time::{Duration, Instant};

use signalrank_core::{
    PacingConfig, ProviderSet, ProviderSetBuilder, RunContext, SignalConfig, TradeDate,
    ValidationError,
};
use tracing::Instrument;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::{RunId, RunMetadata, RunMode};
use crate::output::RunEnvelope;

pub async fn run(cli: &Cli) -> Result<RunEnvelope, CliError> {
    let started = Instant::now();
    let run_id = RunId::new_v4();

    let config = configure(cli, |name| std::env::var(name).ok())?;
    let run_date = match cli.date.as_deref() {
        Some(raw) => TradeDate::parse(raw)?,
        None => TradeDate::today(),
    };
    let context = RunContext::for_date(run_date, &config)?;
    let mode = if cli.mock { RunMode::Mock } else { RunMode::Live };
    let providers = providers(mode, run_date, &config)?;
    let kinds = cli.command.kinds();

    let span = tracing::info_span!("run", run_id = %run_id, mode = ?mode);
    let summary = match &cli.command {
        Command::Run(_) => {
            run::run(config, &context, &kinds, providers, cli.pretty)
                .instrument(span)
                .await
        }
        _ => {
            report::run(config, &context, &kinds, providers, cli.pretty)
                .instrument(span)
                .await
        }
    };

    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let meta = RunMetadata::new(run_id, run_date, mode, elapsed_ms)?;
    Ok(RunEnvelope { meta, summary })
}

/// Defaults, then `SIGNALRANK_*` variables from `lookup`, then flags.
fn configure<F>(cli: &Cli, lookup: F) -> Result<SignalConfig, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = SignalConfig::default().overlay(lookup)?;

    if let Some(dir) = &cli.output_dir {
        config.output_dir = Some(dir.clone());
    }
    if let Some(top_n) = cli.top_n {
        config.top_n = top_n;
    }
    if let Some(attempts) = cli.retry_attempts {
        config.retry.max_attempts = attempts;
    }
    if let Some(seconds) = cli.retry_delay_secs {
        config.retry.delay = Duration::try_from_secs_f64(seconds).map_err(|_| {
            ValidationError::NonFiniteValue {
                field: "retry_delay_secs",
            }
        })?;
    }

    match &cli.command {
        Command::Rs(args) if !args.periods.is_empty() => {
            config.rs_periods = args.periods.clone();
        }
        Command::High52(args) => {
            if let Some(limit) = args.limit {
                config.high52.limit = limit;
            }
        }
        _ => {}
    }

    if cli.mock {
        config.pacing = PacingConfig::none();
    }

    config.validate()?;
    Ok(config)
}

fn providers(mode: RunMode, run_date: TradeDate, config: &SignalConfig) -> Result<ProviderSet, CliError> {
    let builder = ProviderSetBuilder::new().with_alert_config(config.alert.clone());
    let builder = match mode {
        RunMode::Mock => builder.with_mock_mode(run_date),
        RunMode::Live => builder,
    };
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use signalrank_core::{ReportKind, StepOutcome};

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn mock_run(cli: &Cli) -> (SignalConfig, RunContext, ProviderSet) {
        let config = configure(cli, no_env).expect("config");
        let run_date = TradeDate::parse("20250217").expect("valid");
        let context = RunContext::for_date(run_date, &config).expect("context");
        let providers = providers(RunMode::Mock, run_date, &config).expect("providers");
        (config, context, providers)
    }

    #[test]
    fn flags_override_environment() {
        let cli = Cli::parse_from(["signalrank", "volume", "--top-n", "5", "--retry-attempts", "2"]);
        let config = configure(&cli, |name| {
            (name == "SIGNALRANK_RETRY_MAX_ATTEMPTS").then(|| String::from("7"))
        })
        .expect("config");
        assert_eq!(config.top_n, 5);
        assert_eq!(config.retry.max_attempts, 2);
    }

    #[test]
    fn negative_retry_delay_is_rejected() {
        let cli = Cli::parse_from(["signalrank", "volume", "--retry-delay-secs=-1"]);
        let error = configure(&cli, no_env).expect_err("must reject");
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn rs_periods_replace_defaults() {
        let cli = Cli::parse_from(["signalrank", "rs", "--periods", "5,10"]);
        let config = configure(&cli, no_env).expect("config");
        assert_eq!(config.rs_periods, vec![5, 10]);
    }

    #[tokio::test]
    async fn single_report_without_output_dir_stays_in_memory() {
        let cli = Cli::parse_from(["signalrank", "volume", "--mock"]);
        let (config, context, providers) = mock_run(&cli);

        let summary = report::run(config, &context, &cli.command.kinds(), providers, false).await;

        assert!(summary.is_complete());
        assert_eq!(summary.steps[0].kind, ReportKind::Volume);
        assert!(matches!(
            &summary.steps[0].outcome,
            StepOutcome::Published { location } if location == "memory"
        ));
    }

    #[tokio::test]
    async fn daily_run_without_output_dir_aborts_each_step() {
        let cli = Cli::parse_from(["signalrank", "run", "--reports", "volume,high52", "--mock"]);
        let (config, context, providers) = mock_run(&cli);

        let summary = run::run(config, &context, &cli.command.kinds(), providers, false).await;

        assert_eq!(summary.aborted().count(), 2);
    }

    #[tokio::test]
    async fn daily_run_writes_report_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output_dir = dir.path().to_string_lossy().into_owned();
        let cli = Cli::parse_from([
            "signalrank",
            "run",
            "--reports",
            "volume",
            "--mock",
            "--output-dir",
            output_dir.as_str(),
        ]);
        let (config, context, providers) = mock_run(&cli);

        let summary = run::run(config, &context, &cli.command.kinds(), providers, true).await;

        assert!(summary.is_complete());
        assert!(dir.path().join("volume_20250217.json").is_file());
    }
}
