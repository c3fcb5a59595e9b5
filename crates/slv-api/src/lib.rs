//! ---
//! slv_section: "02-remote-api"
//! slv_subsection: "module"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Remote SLV API encoding and dispatch."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
//! Parameter encoding, the catalogue of SLV operations and the dispatcher that
//! issues them over HTTP basic authentication.

/// Result alias used throughout the API crate.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Error type for encoding, dispatching and decoding SLV calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Requested serialization is neither `json` nor `xml`.
    #[error("invalid serialization format '{0}': expected 'json' or 'xml'")]
    InvalidFormat(String),
    /// Network or HTTP client failure. Never retried here.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Response body could not be decoded as the expected JSON shape.
    #[error("unable to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
    /// A controller has no attached device of the expected category.
    #[error("no device of category '{category}' found for controller {controller}")]
    NoMatchingDevice {
        /// Controller whose device list was searched.
        controller: String,
        /// Category that was looked for.
        category: String,
    },
}

pub mod client;
pub mod model;
pub mod operation;
pub mod params;

pub use client::{Credentials, Dispatched, OutgoingRequest, RawResponse, SlvClient, Transport};
pub use model::{ControllerDevice, ControllerSummary, LogEvent};
pub use operation::{Endpoint, Format, HttpMethod, Operation};
pub use params::{encode, ParamValue, ParameterSet, Scalar};
