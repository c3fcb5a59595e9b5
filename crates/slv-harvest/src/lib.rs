//! ---
//! slv_section: "04-harvest"
//! slv_subsection: "module"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Batch harvest of energy and switch telemetry."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
//! Enumerates controllers, locates their energy meters, fetches log values for
//! a time window and folds them into history files. Per-item failures end up
//! in a [`HarvestReport`]; only failures that make the run meaningless abort it.

/// Result alias used throughout the harvest crate.
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Failures that abort a harvest run.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Dispatch failed before any response was obtained, or the controller
    /// listing could not be decoded.
    #[error(transparent)]
    Api(#[from] slv_api::ApiError),
    /// The controller listing came back with a non-success status.
    #[error("{operation} returned HTTP {status}")]
    Status {
        operation: &'static str,
        status: u16,
    },
    /// Start and end instants do not form a usable window.
    #[error("invalid time window: {0}")]
    InvalidWindow(String),
}

pub mod harvest;
pub mod report;
pub mod window;

pub use harvest::{HarvestSettings, Harvester};
pub use report::{HarvestFailure, HarvestReport, HarvestStage, REPORT_FILE_NAME};
pub use window::{parse_instant, TimeWindow};
