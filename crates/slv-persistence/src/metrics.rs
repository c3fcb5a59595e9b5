//! ---
//! slv_section: "03-persistence"
//! slv_subsection: "module"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Prometheus counters for pages and history merges."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::{IntCounterVec, Opts, Registry};

use crate::history::HistorizeOutcome;
use crate::Result;

/// Metrics published by the persistence subsystem.
#[derive(Clone)]
pub struct HistoryMetrics {
    pages_written: IntCounterVec,
    merges: IntCounterVec,
    events_added: IntCounterVec,
    duplicates_dropped: IntCounterVec,
    #[allow(dead_code)]
    registry: Arc<Registry>,
}

impl HistoryMetrics {
    /// Register all persistence metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> Result<Self> {
        let pages_written = IntCounterVec::new(
            Opts::new(
                "slv_pages_written_total",
                "Total number of raw response pages written to disk",
            ),
            &["format"],
        )?;
        registry.register(Box::new(pages_written.clone()))?;

        let merges = IntCounterVec::new(
            Opts::new(
                "slv_history_merges_total",
                "Total number of completed history merges",
            ),
            &["history"],
        )?;
        registry.register(Box::new(merges.clone()))?;

        let events_added = IntCounterVec::new(
            Opts::new(
                "slv_history_events_added_total",
                "Total number of events that grew a history file",
            ),
            &["history"],
        )?;
        registry.register(Box::new(events_added.clone()))?;

        let duplicates_dropped = IntCounterVec::new(
            Opts::new(
                "slv_history_duplicates_dropped_total",
                "Total number of fetched events already present in a history file",
            ),
            &["history"],
        )?;
        registry.register(Box::new(duplicates_dropped.clone()))?;

        Ok(Self {
            pages_written,
            merges,
            events_added,
            duplicates_dropped,
            registry,
        })
    }

    /// Record a page written in `format`.
    pub fn record_page(&self, format: &str) {
        self.pages_written.with_label_values(&[format]).inc();
    }

    /// Record the counts of a completed merge, labelled by history file name.
    pub fn record_merge(&self, outcome: &HistorizeOutcome) {
        let history = outcome
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let labels = [history.as_str()];
        self.merges.with_label_values(&labels).inc();
        self.events_added
            .with_label_values(&labels)
            .inc_by(outcome.added() as u64);
        self.duplicates_dropped
            .with_label_values(&labels)
            .inc_by(outcome.duplicates as u64);
    }
}

impl std::fmt::Debug for HistoryMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryMetrics").finish_non_exhaustive()
    }
}
