//! ---
//! slv_section: "01-core-functionality"
//! slv_subsection: "module"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Tracing subscriber setup for command-line runs."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing::subscriber::DefaultGuard;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "SLV_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Available console log formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    StructuredJson,
    #[default]
    Pretty,
}

/// Keeps the non-blocking writers flushing. Drop it last, when the command ends.
#[must_use = "dropping the guards stops log output"]
pub struct LogGuards {
    _file: WorkerGuard,
    _console: WorkerGuard,
}

/// Stderr-only subscriber for the window before configuration is loaded.
///
/// Scoped to the calling thread and removed when the guard drops, so the
/// configured subscriber can be installed globally afterwards.
pub fn bootstrap() -> DefaultGuard {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .set_default()
}

/// Install the process-wide subscriber for a command run.
///
/// Filter precedence: `directive` (a command-line override), `SLV_LOG`,
/// `RUST_LOG`, then `info`. Console output goes to stderr so results printed on
/// stdout stay clean; every event is also appended to a daily rolling JSON file
/// under `config.directory`. Fails if a global subscriber is already set.
pub fn init_tracing(
    service_name: &str,
    config: &LoggingConfig,
    directive: Option<&str>,
) -> Result<LogGuards> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!(
            "unable to create log directory {}",
            config.directory.display()
        )
    })?;
    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);
    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&config.directory, format!("{prefix}.log")));
    let (console_writer, console_guard) = tracing_appender::non_blocking(std::io::stderr());

    let console_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .json()
            .with_writer(console_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .compact()
            .with_writer(console_writer)
            .boxed(),
    };
    let file_layer = fmt::layer()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer)
        .boxed();

    tracing_subscriber::registry()
        .with(filter(directive))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    info!(service = %service_name, log_dir = %config.directory.display(), format = ?config.format, "tracing initialised");
    Ok(LogGuards {
        _file: file_guard,
        _console: console_guard,
    })
}

fn filter(directive: Option<&str>) -> EnvFilter {
    let requested = directive
        .map(str::to_owned)
        .or_else(|| std::env::var(LOG_ENV).ok())
        .or_else(|| std::env::var(EnvFilter::DEFAULT_ENV).ok());
    match requested {
        Some(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("invalid log directive '{directive}' ({err}); defaulting to {DEFAULT_DIRECTIVE}");
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }),
        None => EnvFilter::new(DEFAULT_DIRECTIVE),
    }
}
