use serde::Serialize;
use signalrank_core::reports::{
    display_name, format_eok, High52Report, InvestorReport, RsReport, VolumeReport,
};
use signalrank_core::{Report, RunSummary, StepOutcome};

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::metadata::RunMetadata;

/// Everything printed for one invocation.
#[derive(Debug, Serialize)]
pub struct RunEnvelope {
    pub meta: RunMetadata,
    pub summary: RunSummary,
}

pub fn render(envelope: &RunEnvelope, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => print!("{}", render_table(envelope)),
    }

    Ok(())
}

fn render_table(envelope: &RunEnvelope) -> String {
    let mut out = String::new();
    out.push_str(&format!("run_id      : {}\n", envelope.meta.run_id));
    out.push_str(&format!("run_date    : {}\n", envelope.meta.run_date.display()));
    out.push_str(&format!("generated_at: {}\n", envelope.meta.generated_at));
    out.push_str(&format!("elapsed_ms  : {}\n", envelope.meta.elapsed_ms));

    for step in &envelope.summary.steps {
        let status = match &step.outcome {
            StepOutcome::Published { location } => format!("published -> {location}"),
            StepOutcome::Empty => String::from("no data"),
            StepOutcome::Aborted { reason } => format!("aborted: {reason}"),
        };
        out.push_str(&format!("\n[{}] {status}\n", step.kind));

        match &step.report {
            Some(Report::Volume(report)) => volume_table(&mut out, report),
            Some(Report::Investors(report)) => investor_tables(&mut out, report),
            Some(Report::RelativeStrength(report)) => rs_tables(&mut out, report),
            Some(Report::High52(report)) => high52_pages(&mut out, report),
            None => {}
        }
    }

    out
}

fn volume_table(out: &mut String, report: &VolumeReport) {
    out.push_str(&format!("{:>4}  {:<8} {:<20} {:>14} {:>12}\n", "#", "ticker", "name", "volume", "close"));
    for row in &report.rows {
        out.push_str(&format!(
            "{:>4}  {:<8} {:<20} {:>14} {:>12.0}\n",
            row.rank,
            row.instrument.ticker.as_str(),
            row.instrument.name,
            row.volume,
            row.close
        ));
    }
}

fn investor_tables(out: &mut String, report: &InvestorReport) {
    out.push_str(&format!(
        "streak window: {} ~ {}\n",
        report.lookback_start.display(),
        report.run_date.display()
    ));
    for group in &report.groups {
        out.push_str(&format!("\n{}\n", group.title()));
        for table in &group.tables {
            out.push_str(&format!("  {} (억)\n", table.investor.label()));
            for entry in &table.rows {
                out.push_str(&format!(
                    "  {:>4}  {:<24} {:>12}\n",
                    entry.rank,
                    display_name(entry),
                    format_eok(entry.value)
                ));
            }
        }
    }
}

fn rs_tables(out: &mut String, report: &RsReport) {
    for market in &report.markets {
        for period in &market.periods {
            out.push_str(&format!(
                "\n{} RS {}일 (vs {})\n",
                market.market,
                period.period,
                market.benchmark.as_str()
            ));
            for entry in &period.rows {
                out.push_str(&format!(
                    "  {:>4}  {:<8} {:<20} {:>6.1}\n",
                    entry.rank,
                    entry.instrument.ticker.as_str(),
                    entry.instrument.name,
                    entry.value
                ));
            }
        }
    }
}

fn high52_pages(out: &mut String, report: &High52Report) {
    let pages = report.pages();
    let total_pages = pages.len();
    for (index, page) in pages.into_iter().enumerate() {
        out.push_str(&format!("\npage {}/{}\n", index + 1, total_pages));
        for row in page {
            out.push_str(&format!(
                "  {:>4}  {:<8} {:<20} {:>10} {:>7}% {:>14}\n",
                row.rank,
                row.entry.ticker,
                row.entry.name,
                row.entry.close_price,
                row.entry.change_ratio,
                row.entry.market_value
            ));
        }
    }
}
