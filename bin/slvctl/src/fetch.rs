//! ---
//! slv_section: "05-networking-external-interfaces"
//! slv_subsection: "binary"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "One subcommand per remote SLV operation."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use slv_api::{Dispatched, Operation, ParamValue, SlvClient};
use slv_common::AppConfig;
use slv_harvest::{parse_instant, TimeWindow};
use slv_persistence::{historize_dispatched, persist_dispatched, sanitize_file_name};
use tokio::runtime::Runtime;

#[derive(Debug, Subcommand)]
pub enum FetchCommand {
    /// List every controller of the installation.
    Controllers(PageOptions),
    /// Search geozones by name.
    Geozones(GeozoneSearch),
    /// List the direct children of a geozone.
    GeozoneChildren(GeozoneChildren),
    /// List the value descriptors of one device.
    Descriptors(Descriptors),
    /// List the devices attached to one or more controllers.
    Devices(Devices),
    /// Fetch log values for devices over a time window.
    LogValues(LogValues),
}

/// Options shared by every fetch.
#[derive(Debug, Args)]
pub struct PageOptions {
    /// Requested serialization (`json` or `xml`).
    #[arg(long, default_value = "json")]
    format: String,
    /// Write the page to disk instead of printing it.
    #[arg(long)]
    write: bool,
    /// Target directory for `--write` (defaults to output.data_dir).
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct GeozoneSearch {
    #[arg(long)]
    name: String,
    /// Match names containing the value instead of equal to it.
    #[arg(long)]
    partial: bool,
    #[command(flatten)]
    page: PageOptions,
}

#[derive(Debug, Args)]
pub struct GeozoneChildren {
    #[arg(long = "geozone-id")]
    geozone_id: i64,
    /// Ask the service to compute hierarchy information.
    #[arg(long)]
    hierarchy: bool,
    #[command(flatten)]
    page: PageOptions,
}

#[derive(Debug, Args)]
pub struct Descriptors {
    #[arg(long)]
    controller: String,
    /// Device identifier on the controller.
    #[arg(long = "id-on-controller")]
    id_on_controller: String,
    /// Epoch milliseconds; defaults to now.
    #[arg(long)]
    time: Option<i64>,
    #[command(flatten)]
    page: PageOptions,
}

#[derive(Debug, Args)]
pub struct Devices {
    /// Controller identifier, repeatable.
    #[arg(long = "controller", required = true, num_args = 1..)]
    controllers: Vec<String>,
    #[command(flatten)]
    page: PageOptions,
}

#[derive(Debug, Args)]
pub struct LogValues {
    /// Device identifier, repeatable.
    #[arg(long = "device", required = true, num_args = 1..)]
    devices: Vec<String>,
    /// Log value name, repeatable.
    #[arg(long = "name", required = true, num_args = 1..)]
    names: Vec<String>,
    /// Window start (`YYYY-MM-DD[ HH:MM:SS]` or `DD/MM/YYYY HH:MM:SS`).
    #[arg(long)]
    start: String,
    #[arg(long)]
    end: String,
    /// Merge the fetched events into the history under output.history_dir.
    #[arg(long)]
    history: bool,
    #[command(flatten)]
    page: PageOptions,
}

pub fn run(
    command: FetchCommand,
    client: &SlvClient,
    config: &AppConfig,
    runtime: &Runtime,
) -> Result<()> {
    let (operation, page, history) = match command {
        FetchCommand::Controllers(page) => (Operation::GetAllControllers, page, false),
        FetchCommand::Geozones(args) => (
            Operation::SearchGeozones {
                name: args.name,
                partial_match: args.partial,
            },
            args.page,
            false,
        ),
        FetchCommand::GeozoneChildren(args) => (
            Operation::GetGeozoneChildrenGeozones {
                geozone_id: args.geozone_id,
                compute_hierarchy_infos: args.hierarchy,
            },
            args.page,
            false,
        ),
        FetchCommand::Descriptors(args) => (
            Operation::GetDeviceValueDescriptors {
                controller_str_id: args.controller,
                id_on_controller: args.id_on_controller,
                time: args
                    .time
                    .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
            },
            args.page,
            false,
        ),
        FetchCommand::Devices(args) => (
            Operation::GetControllerDevices {
                controller_str_id: param_value(args.controllers),
            },
            args.page,
            false,
        ),
        FetchCommand::LogValues(args) => {
            let window = TimeWindow::new(parse_instant(&args.start)?, parse_instant(&args.end)?)?;
            (
                Operation::GetDevicesLogValues {
                    device_id: param_value(args.devices),
                    name: param_value(args.names),
                    from: window.slv_from(),
                    to: window.slv_to(),
                },
                args.page,
                args.history,
            )
        }
    };

    let dispatched = runtime.block_on(client.call(operation, &page.format))?;
    if !dispatched.response.is_success() {
        bail!(
            "{} returned HTTP {}",
            dispatched.operation.method_name(),
            dispatched.response.status
        );
    }

    if page.write {
        let directory = page.out.unwrap_or_else(|| config.output.data_dir.clone());
        let path = persist_dispatched(&dispatched, &directory)?;
        println!("Page written: {}", path.display());
    } else {
        println!("{}", dispatched.response.text());
    }

    if history {
        historize_page(&dispatched, config)?;
    }
    Ok(())
}

/// One value stays scalar so it contributes to file names; several become a list.
fn param_value(mut values: Vec<String>) -> ParamValue {
    if values.len() == 1 {
        values.remove(0).into()
    } else {
        values.into()
    }
}

fn historize_page(dispatched: &Dispatched, config: &AppConfig) -> Result<()> {
    let Some(stem) = dispatched.operation.history_stem() else {
        return Ok(());
    };
    let path = config
        .output
        .history_dir
        .join(format!("{}.json", sanitize_file_name(&stem)));
    let outcome = historize_dispatched(&path, dispatched)?;
    println!(
        "History {}: {} stored, {} added, {} duplicates dropped",
        outcome.path.display(),
        outcome.total,
        outcome.added(),
        outcome.duplicates
    );
    Ok(())
}
