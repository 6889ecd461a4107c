/*!
 * Report Persistence
 * Handing finished reports to a storage collaborator
 */

mod text;

pub use text::{render_comparison, render_report};

use crate::core::errors::Result;
use crate::orchestrator::{Comparison, ExecutionReport};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Destination for finished reports
pub trait ReportSink {
    /// Persist a single-mode report
    fn persist_report(&self, report: &ExecutionReport) -> Result<()>;

    /// Persist both reports of a comparison and the speedup summary
    fn persist_comparison(&self, comparison: &Comparison) -> Result<()>;
}

/// Writes `results_<mode>.json` and `report.txt` into a directory
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub const REPORT_FILE: &'static str = "report.txt";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the JSON results file for a report's mode
    pub fn results_path(&self, report: &ExecutionReport) -> PathBuf {
        self.dir.join(format!("results_{}.json", report.mode))
    }

    fn write(&self, name: &Path, content: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(name, content)?;
        info!(path = %name.display(), bytes = content.len(), "Report written");
        Ok(())
    }

    fn write_results(&self, report: &ExecutionReport) -> Result<()> {
        let json = serde_json::to_vec_pretty(report)?;
        self.write(&self.results_path(report), &json)
    }
}

impl ReportSink for JsonFileSink {
    fn persist_report(&self, report: &ExecutionReport) -> Result<()> {
        self.write_results(report)?;
        let text = render_report(report);
        self.write(&self.dir.join(Self::REPORT_FILE), text.as_bytes())
    }

    fn persist_comparison(&self, comparison: &Comparison) -> Result<()> {
        self.write_results(&comparison.parallel)?;
        self.write_results(&comparison.sequential)?;
        let text = render_comparison(comparison);
        self.write(&self.dir.join(Self::REPORT_FILE), text.as_bytes())
    }
}
