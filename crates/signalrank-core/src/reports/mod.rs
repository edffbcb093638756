//! Report builders and the report envelope handed to sinks.
//!
//! | Kind | Builder | Content |
//! |------|---------|---------|
//! | `volume` | [`VolumeReportBuilder`] | Whole-exchange top-N by traded volume |
//! | `investors` | [`InvestorReportBuilder`] | Net buying per investor category with streaks |
//! | `relative_strength` | [`RsReportBuilder`] | RS score ranking per market and period |
//! | `high52` | [`High52ReportBuilder`] | Stocks at a 52-week high |

mod high52;
mod investor;
mod relative_strength;
mod volume;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{TradeDate, ValidationError};

pub use high52::{High52Report, High52ReportBuilder, High52Row};
pub use investor::{
    display_name, format_eok, InvestorGroup, InvestorReport, InvestorReportBuilder, InvestorTable,
};
pub use relative_strength::{RsMarketTable, RsPeriodTable, RsReport, RsReportBuilder};
pub use volume::{VolumeReport, VolumeReportBuilder, VolumeRow};

/// Report steps of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Volume,
    Investors,
    RelativeStrength,
    High52,
}

impl ReportKind {
    pub const ALL: [Self; 4] = [
        Self::Volume,
        Self::Investors,
        Self::RelativeStrength,
        Self::High52,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Investors => "investors",
            Self::RelativeStrength => "relative_strength",
            Self::High52 => "high52",
        }
    }
}

impl Display for ReportKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "volume" => Ok(Self::Volume),
            "investors" | "investor" => Ok(Self::Investors),
            "relative_strength" | "rs" => Ok(Self::RelativeStrength),
            "high52" => Ok(Self::High52),
            _ => Err(ValidationError::InvalidReportKind {
                value: value.to_owned(),
            }),
        }
    }
}

/// A finished report, ready for a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "report", rename_all = "snake_case")]
pub enum Report {
    Volume(VolumeReport),
    Investors(InvestorReport),
    RelativeStrength(RsReport),
    High52(High52Report),
}

impl Report {
    pub fn kind(&self) -> ReportKind {
        match self {
            Self::Volume(_) => ReportKind::Volume,
            Self::Investors(_) => ReportKind::Investors,
            Self::RelativeStrength(_) => ReportKind::RelativeStrength,
            Self::High52(_) => ReportKind::High52,
        }
    }

    pub fn run_date(&self) -> TradeDate {
        match self {
            Self::Volume(report) => report.run_date,
            Self::Investors(report) => report.run_date,
            Self::RelativeStrength(report) => report.run_date,
            Self::High52(report) => report.run_date,
        }
    }

    /// `<kind>_<YYYYMMDD>.json`
    pub fn file_name(&self) -> String {
        format!("{}_{}.json", self.kind(), self.run_date().compact())
    }
}
