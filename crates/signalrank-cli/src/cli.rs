//! CLI argument definitions for signalrank.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Run every report step and write JSON files |
//! | `volume` | Whole-exchange trading volume ranking |
//! | `investors` | Net buying per investor category with streaks |
//! | `rs` | Relative strength ranking per market and period |
//! | `high52` | Stocks at a 52-week high |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--date` | today (KST) | Run date, `YYYYMMDD` or `YYYY-MM-DD` |
//! | `--mock` | `false` | Serve deterministic fixtures instead of KRX/Naver |
//! | `--format` | `table` | Output format (table, json) |
//! | `--pretty` | `false` | Pretty-print JSON output and files |
//! | `--output-dir` | `SIGNALRANK_OUTPUT_DIR` | Directory for report files |
//! | `--top-n` | `15` | Rows per ranking table |
//! | `--retry-attempts` | `5` | Attempts per provider call |
//! | `--retry-delay-secs` | `20` | Fixed delay between attempts |
//! | `--log-level` | `RUST_LOG` or `info` | Tracing filter directive |
//!
//! # Examples
//!
//! ```bash
//! # Daily run, reports written as JSON files
//! signalrank run --output-dir ./reports
//!
//! # Relative strength for a past date, fixtures only
//! signalrank rs --date 20250217 --mock
//!
//! # Only two steps of the daily run
//! signalrank run --reports volume,high52 --output-dir ./reports
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use signalrank_core::ReportKind;

/// Daily KRX market-signal rankings
#[derive(Debug, Parser)]
#[command(
    name = "signalrank",
    author,
    version,
    about = "Daily KRX market-signal rankings",
    long_about = "signalrank builds the daily market-signal tables for the Korea Exchange:\n\
\n\
  • Trading volume top-N\n\
  • Foreign, institutional and fund net buying with buying streaks\n\
  • Relative strength against KOSPI/KOSDAQ over 20, 60 and 120 sessions\n\
  • Stocks at a 52-week high\n\
\n\
Provider calls are retried with a fixed delay; exhausted retries alert the operator."
)]
pub struct Cli {
    /// Run date (YYYYMMDD, YYYY/MM/DD or YYYY-MM-DD). Defaults to today in KST.
    #[arg(long, global = true)]
    pub date: Option<String>,

    /// Serve deterministic fixtures instead of live providers.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Directory receiving `<kind>_<YYYYMMDD>.json` report files.
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Rows per ranking table.
    #[arg(long, global = true)]
    pub top_n: Option<usize>,

    /// Attempts per provider call, including the first.
    #[arg(long, global = true)]
    pub retry_attempts: Option<u32>,

    /// Seconds to wait between attempts.
    #[arg(long, global = true)]
    pub retry_delay_secs: Option<f64>,

    /// Tracing filter, e.g. `info` or `signalrank_core=debug`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain-text tables for terminal display.
    Table,
    /// Single JSON object output.
    Json,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// 📅 Run the daily report steps in order.
    ///
    /// Reports are written to the output directory; a missing directory
    /// aborts every step with an operator alert.
    ///
    /// # Examples
    ///
    ///   signalrank run --output-dir ./reports
    ///   signalrank run --reports rs,high52 --output-dir ./reports
    Run(RunArgs),

    /// 📊 Whole-exchange trading volume ranking.
    Volume,

    /// 💰 Net buying per investor category with consecutive-buying streaks.
    Investors,

    /// 📈 Relative strength ranking against the market benchmark.
    Rs(RsArgs),

    /// 🔝 Stocks at a 52-week high.
    High52(High52Args),
}

impl Command {
    /// Report steps this command runs, in order.
    pub fn kinds(&self) -> Vec<ReportKind> {
        match self {
            Self::Run(args) if args.reports.is_empty() => ReportKind::ALL.to_vec(),
            Self::Run(args) => args.reports.clone(),
            Self::Volume => vec![ReportKind::Volume],
            Self::Investors => vec![ReportKind::Investors],
            Self::Rs(_) => vec![ReportKind::RelativeStrength],
            Self::High52(_) => vec![ReportKind::High52],
        }
    }
}

/// Arguments for the `run` command.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Comma-separated subset of steps (volume, investors, rs, high52).
    #[arg(long, value_delimiter = ',', value_parser = parse_report_kind)]
    pub reports: Vec<ReportKind>,
}

/// Arguments for the `rs` command.
#[derive(Debug, Args)]
pub struct RsArgs {
    /// Comma-separated lookback periods in sessions.
    #[arg(long, value_delimiter = ',')]
    pub periods: Vec<usize>,
}

/// Arguments for the `high52` command.
#[derive(Debug, Args)]
pub struct High52Args {
    /// Maximum number of stocks listed.
    #[arg(long)]
    pub limit: Option<usize>,
}

fn parse_report_kind(value: &str) -> Result<ReportKind, String> {
    value.parse().map_err(|error: signalrank_core::ValidationError| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_without_subset_covers_every_step() {
        let cli = Cli::parse_from(["signalrank", "run"]);
        assert_eq!(cli.command.kinds(), ReportKind::ALL.to_vec());
    }

    #[test]
    fn run_accepts_report_subset_with_aliases() {
        let cli = Cli::parse_from(["signalrank", "run", "--reports", "rs,high52"]);
        assert_eq!(
            cli.command.kinds(),
            vec![ReportKind::RelativeStrength, ReportKind::High52]
        );
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::parse_from([
            "signalrank",
            "rs",
            "--periods",
            "20,60",
            "--mock",
            "--date",
            "20250217",
            "--format",
            "json",
        ]);
        assert!(cli.mock);
        assert_eq!(cli.date.as_deref(), Some("20250217"));
        assert_eq!(cli.format, OutputFormat::Json);
        let Command::Rs(args) = &cli.command else {
            panic!("rs command expected");
        };
        assert_eq!(args.periods, vec![20, 60]);
    }

    #[test]
    fn unknown_report_kind_is_rejected() {
        let parsed = Cli::try_parse_from(["signalrank", "run", "--reports", "profits"]);
        assert!(parsed.is_err());
    }
}
