//! ---
//! slv_section: "01-core-functionality"
//! slv_subsection: "module"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Shared primitives for the harvester crates."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
//! Configuration loading and tracing setup consumed by the SLV harvester
//! binaries and libraries.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, HarvestConfig, LoadedAppConfig, LoggingConfig, OutputConfig, ServiceConfig,
};
pub use logging::{bootstrap, init_tracing, LogFormat, LogGuards};
