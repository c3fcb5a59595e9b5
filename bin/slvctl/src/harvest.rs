//! ---
//! slv_section: "05-networking-external-interfaces"
//! slv_subsection: "binary"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Batch harvest subcommand."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use prometheus::{Encoder, Registry, TextEncoder};
use slv_api::SlvClient;
use slv_common::AppConfig;
use slv_harvest::{parse_instant, HarvestReport, HarvestSettings, Harvester, TimeWindow};
use slv_persistence::HistoryMetrics;
use tokio::runtime::Runtime;
use tracing::warn;

#[derive(Debug, Args)]
pub struct HarvestOptions {
    /// Window start; defaults to yesterday at midnight.
    #[arg(long)]
    start: Option<String>,
    /// Window end; defaults to today at midnight.
    #[arg(long)]
    end: Option<String>,
    /// Merge fetched log values into history files.
    #[arg(long)]
    historize: bool,
    /// Override harvest.format for the log-value fetches.
    #[arg(long)]
    format: Option<String>,
    /// Write counters in Prometheus text format to this file after the run.
    #[arg(long = "metrics-file", value_name = "FILE")]
    metrics_file: Option<PathBuf>,
}

pub fn run(
    options: HarvestOptions,
    client: SlvClient,
    config: &AppConfig,
    runtime: &Runtime,
) -> Result<()> {
    let window = resolve_window(&options)?;
    let mut settings = HarvestSettings::from_config(config);
    if let Some(format) = options.format {
        settings.format = format;
    }

    let registry = Arc::new(Registry::new());
    let metrics = HistoryMetrics::new(registry.clone())?;
    let harvester = Harvester::new(client, settings).with_metrics(metrics);

    let report = runtime
        .block_on(harvester.run(&window, options.historize))
        .context("harvest aborted")?;
    let report_path = report
        .write_to(&config.output.errors_dir)
        .with_context(|| {
            format!(
                "unable to write harvest report under {}",
                config.output.errors_dir.display()
            )
        })?;
    render_report(&report, &report_path);

    if let Some(path) = options.metrics_file {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        fs::write(&path, buffer)
            .with_context(|| format!("unable to write metrics to {}", path.display()))?;
    }
    Ok(())
}

fn resolve_window(options: &HarvestOptions) -> Result<TimeWindow> {
    let default = TimeWindow::days_before(Local::now().date_naive(), 1)?;
    let start = match &options.start {
        Some(value) => parse_instant(value)?,
        None => default.start,
    };
    let end = match &options.end {
        Some(value) => parse_instant(value)?,
        None => default.end,
    };
    Ok(TimeWindow::new(start, end)?)
}

fn render_report(report: &HarvestReport, report_path: &std::path::Path) {
    println!(
        "Pages written: {}\nHistories updated: {}\nFailures: {}",
        report.pages().len(),
        report.histories().len(),
        report.failures().len()
    );
    for outcome in report.histories() {
        println!(
            "  {}: {} stored, {} added",
            outcome.path.display(),
            outcome.total,
            outcome.added()
        );
    }
    if !report.is_clean() {
        warn!(failures = report.failures().len(), "harvest completed with failures");
        println!("Failure details: {}", report_path.display());
    }
}
