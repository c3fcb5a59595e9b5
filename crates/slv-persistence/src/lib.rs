//! ---
//! slv_section: "03-persistence"
//! slv_subsection: "module"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Page materialization and history merging."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Disk side of the harvester: raw pages written in their fetched format and
//! per-device history files kept unique and time ordered.

use std::path::PathBuf;

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Error type for the persistence subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Wrapper for IO errors encountered while reading/writing files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON (de)serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Response body claimed to be XML but is not well formed.
    #[error("markup error: {0}")]
    Markup(#[from] roxmltree::Error),
    /// The parameter set carries no `ser` entry.
    #[error("parameters carry no 'ser' entry")]
    MissingFormat,
    /// The `ser` entry is neither `json` nor `xml`.
    #[error("unsupported serialization format '{0}'")]
    InvalidFormat(String),
    /// Sanitizing the file name hint left nothing.
    #[error("file name hint '{0}' is empty once sanitized")]
    EmptyFileName(String),
    /// Historization is only defined for JSON histories.
    #[error("history {path} is not a json history: {reason}")]
    FormatMismatch {
        /// History file involved.
        path: PathBuf,
        /// What did not match.
        reason: String,
    },
    /// An event carries a timestamp not in `YYYY-MM-DD HH:MM:SS` form.
    #[error("unparseable eventTime '{value}': {source}")]
    EventTime {
        /// Offending timestamp text.
        value: String,
        /// Parser failure.
        #[source]
        source: chrono::ParseError,
    },
    /// An event has no textual `eventTime` to order it by.
    #[error("log event has no eventTime: {0}")]
    MissingEventTime(String),
    /// Atomic replacement of a file failed.
    #[error("unable to replace file: {0}")]
    Persist(#[from] tempfile::PersistError),
    /// Response could not be decoded into log events.
    #[error(transparent)]
    Api(#[from] slv_api::ApiError),
    /// Wrapper for Prometheus metrics registration failures.
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

mod fs_util;
pub mod history;
pub mod materialize;
pub mod metrics;

pub use history::{historize, historize_dispatched, merge_events, HistorizeOutcome};
pub use materialize::{persist, persist_dispatched, sanitize_file_name};
pub use metrics::HistoryMetrics;
