use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use signalrank_core::TradeDate;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::CliError;

/// Run identifier (UUID v4) tying log lines to the printed summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Where the data of a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Live,
    Mock,
}

/// Metadata printed alongside a run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: RunId,
    pub run_date: TradeDate,
    pub mode: RunMode,
    pub generated_at: String,
    pub elapsed_ms: u64,
}

impl RunMetadata {
    pub fn new(run_id: RunId, run_date: TradeDate, mode: RunMode, elapsed_ms: u64) -> Result<Self, CliError> {
        Ok(Self {
            run_id,
            run_date,
            mode,
            generated_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
            elapsed_ms,
        })
    }
}
