//! Report sinks.
//!
//! A sink is the hand-off point to rendering and delivery. The engine calls
//! [`ReportSink::ensure_ready`] before each step so that a misconfigured
//! sink aborts the step before any provider traffic happens.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::reports::{Report, ReportKind};
use crate::{ConfigError, SinkError};

/// Boxed future returned by [`ReportSink::publish`].
pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = Result<PublishedReport, SinkError>> + Send + 'a>>;

/// Where a report ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedReport {
    pub kind: ReportKind,
    pub location: String,
}

/// Receives finished reports.
pub trait ReportSink: Send + Sync {
    fn id(&self) -> &'static str;

    /// Check the configuration this sink depends on.
    fn ensure_ready(&self) -> Result<(), ConfigError>;

    fn publish<'a>(&'a self, report: &'a Report) -> SinkFuture<'a>;
}

/// Writes one JSON document per report into an output directory.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    output_dir: Option<PathBuf>,
    pretty: bool,
}

impl JsonFileSink {
    pub fn new(output_dir: Option<PathBuf>) -> Self {
        Self {
            output_dir,
            pretty: false,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    fn ready_dir(&self) -> Result<&PathBuf, ConfigError> {
        let dir = self.output_dir.as_ref().ok_or(ConfigError::MissingOutputDir)?;
        if !dir.is_dir() {
            return Err(ConfigError::OutputDirUnavailable { path: dir.clone() });
        }
        Ok(dir)
    }
}

impl ReportSink for JsonFileSink {
    fn id(&self) -> &'static str {
        "json_file"
    }

    fn ensure_ready(&self) -> Result<(), ConfigError> {
        self.ready_dir().map(|_| ())
    }

    fn publish<'a>(&'a self, report: &'a Report) -> SinkFuture<'a> {
        Box::pin(async move {
            let path = self.ready_dir()?.join(report.file_name());
            let body = if self.pretty {
                serde_json::to_vec_pretty(report)?
            } else {
                serde_json::to_vec(report)?
            };

            tokio::fs::write(&path, body)
                .await
                .map_err(|source| SinkError::Io {
                    name: report.file_name(),
                    source,
                })?;

            tracing::info!(path = %path.display(), "report written");
            Ok(PublishedReport {
                kind: report.kind(),
                location: path.display().to_string(),
            })
        })
    }
}

/// Keeps published reports in memory.
///
/// Used for stdout-only CLI runs and tests. A configured readiness error
/// makes every step abort.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    reports: Arc<Mutex<Vec<Report>>>,
    readiness: Option<ConfigError>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: ConfigError) -> Self {
        Self {
            reports: Arc::default(),
            readiness: Some(error),
        }
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports
            .lock()
            .expect("report store lock is not poisoned")
            .clone()
    }
}

impl ReportSink for MemorySink {
    fn id(&self) -> &'static str {
        "memory"
    }

    fn ensure_ready(&self) -> Result<(), ConfigError> {
        match &self.readiness {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn publish<'a>(&'a self, report: &'a Report) -> SinkFuture<'a> {
        Box::pin(async move {
            self.ensure_ready()?;
            self.reports
                .lock()
                .expect("report store lock is not poisoned")
                .push(report.clone());
            Ok(PublishedReport {
                kind: report.kind(),
                location: String::from("memory"),
            })
        })
    }
}
