//! ---
//! slv_section: "04-harvest"
//! slv_subsection: "module"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Aggregated outcome of a harvest run."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use slv_persistence::HistorizeOutcome;

/// File name of the rendered report under the errors directory.
pub const REPORT_FILE_NAME: &str = "harvest_errors.txt";

/// Step of the run a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestStage {
    ControllerDevices,
    PageWrite,
    LogValues,
    Historize,
}

impl HarvestStage {
    fn as_str(&self) -> &'static str {
        match self {
            HarvestStage::ControllerDevices => "controller-devices",
            HarvestStage::PageWrite => "page-write",
            HarvestStage::LogValues => "log-values",
            HarvestStage::Historize => "historize",
        }
    }
}

/// A per-item failure that did not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestFailure {
    pub stage: HarvestStage,
    /// Controller, metric or file the failure concerns.
    pub subject: String,
    pub message: String,
}

/// Everything a run produced, passed back to the caller instead of kept globally.
#[derive(Debug, Clone, Default)]
pub struct HarvestReport {
    failures: Vec<HarvestFailure>,
    histories: Vec<HistorizeOutcome>,
    pages: Vec<PathBuf>,
}

impl HarvestReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failure(
        &mut self,
        stage: HarvestStage,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.failures.push(HarvestFailure {
            stage,
            subject: subject.into(),
            message: message.into(),
        });
    }

    pub fn record_history(&mut self, outcome: HistorizeOutcome) {
        self.histories.push(outcome);
    }

    pub fn record_page(&mut self, path: PathBuf) {
        self.pages.push(path);
    }

    /// Append another report's entries after this one's.
    pub fn merge(&mut self, other: HarvestReport) {
        self.failures.extend(other.failures);
        self.histories.extend(other.histories);
        self.pages.extend(other.pages);
    }

    pub fn failures(&self) -> &[HarvestFailure] {
        &self.failures
    }

    pub fn histories(&self) -> &[HistorizeOutcome] {
        &self.histories
    }

    pub fn pages(&self) -> &[PathBuf] {
        &self.pages
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Plain-text rendering, one failure per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for failure in &self.failures {
            let _ = writeln!(
                out,
                "[{}] {}: {}",
                failure.stage.as_str(),
                failure.subject,
                failure.message
            );
        }
        out
    }

    /// Write [`HarvestReport::render`] to `directory/harvest_errors.txt`,
    /// replacing the previous run's report.
    pub fn write_to(&self, directory: &Path) -> std::io::Result<PathBuf> {
        fs::create_dir_all(directory)?;
        let path = directory.join(REPORT_FILE_NAME);
        fs::write(&path, self.render())?;
        Ok(path)
    }
}
