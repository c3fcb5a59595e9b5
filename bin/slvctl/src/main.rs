//! ---
//! slv_section: "05-networking-external-interfaces"
//! slv_subsection: "binary"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Operator CLI issuing SLV operations and batch harvests."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use slv_api::{Credentials, SlvClient};
use slv_common::{bootstrap, init_tracing, AppConfig};
use tokio::runtime::Runtime;
use tracing::debug;

mod fetch;
mod harvest;

const DEFAULT_CONFIG: &str = "configs/slv.toml";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "StreetLight Vision telemetry utility",
    long_about = None
)]
struct Cli {
    /// Configuration file. `SLV_CONFIG` takes precedence, then configs/slv.toml.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Log filter directive, e.g. `debug` or `info,slv_api=trace`. Overrides SLV_LOG.
    #[arg(long = "log-level", global = true, value_name = "DIRECTIVE")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(subcommand, about = "Issue a single remote operation")]
    Fetch(fetch::FetchCommand),
    /// Fetch energy and switch log values for every controller.
    Harvest(harvest::HarvestOptions),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = {
        let _bootstrap = bootstrap();
        let mut candidates = Vec::new();
        if let Some(path) = &cli.config {
            candidates.push(path.clone());
        }
        candidates.push(PathBuf::from(DEFAULT_CONFIG));
        AppConfig::load_with_source(&candidates)?
    };
    let config = loaded.config;
    let _log_guards = init_tracing("slvctl", &config.logging, cli.log_level.as_deref())?;
    debug!(source = %loaded.source.display(), "configuration loaded");

    let client = build_client(&config)?;
    let runtime = Runtime::new().context("unable to start async runtime")?;
    match cli.command {
        Commands::Fetch(cmd) => fetch::run(cmd, &client, &config, &runtime)?,
        Commands::Harvest(opts) => harvest::run(opts, client, &config, &runtime)?,
    }
    Ok(())
}

fn build_client(config: &AppConfig) -> Result<SlvClient> {
    let password = config.service.resolve_password()?;
    let credentials = Credentials::new(config.service.username.clone(), password);
    SlvClient::with_reqwest(
        config.service.base_url.clone(),
        credentials,
        config.service.timeout,
    )
    .context("unable to build HTTP client")
}
