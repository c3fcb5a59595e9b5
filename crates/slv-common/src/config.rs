//! ---
//! slv_section: "01-core-functionality"
//! slv_subsection: "module"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Configuration model and loading for the harvester."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_timeout() -> Option<Duration> {
    Some(Duration::from_secs(60))
}

fn default_password_env() -> String {
    "SLV_PASSWORD".to_owned()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_history_dir() -> PathBuf {
    PathBuf::from("data/history")
}

fn default_errors_dir() -> PathBuf {
    PathBuf::from("errors")
}

fn default_format() -> String {
    "json".to_owned()
}

fn default_counter_category() -> String {
    "electricalCounter".to_owned()
}

fn default_index_metric() -> String {
    "TotalKWHPositive".to_owned()
}

fn default_switch_metric() -> String {
    "DigitalOutput1".to_owned()
}

fn default_true() -> bool {
    true
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Primary configuration object for the harvester.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "SLV_CONFIG";

    /// Load configuration from disk, respecting the `SLV_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.service.validate()?;
        self.harvest.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Remote service location and the static credential pair used for basic auth.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Root URL of the SLV installation, without the `/api/...` suffix.
    pub base_url: String,
    pub username: String,
    /// Inline secret. The environment variable named by `password_env` wins when set.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_password_env")]
    pub password_env: String,
    #[serde(default = "default_timeout")]
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub timeout: Option<Duration>,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)
            .with_context(|| format!("service base_url '{}' is not a valid URL", self.base_url))?;
        if self.username.trim().is_empty() {
            return Err(anyhow!("service username cannot be empty"));
        }
        Ok(())
    }

    /// Resolve the secret, preferring the environment over the file.
    pub fn resolve_password(&self) -> Result<String> {
        if let Ok(secret) = std::env::var(&self.password_env) {
            if !secret.is_empty() {
                return Ok(secret);
            }
        }
        self.password.clone().ok_or_else(|| {
            anyhow!(
                "no password configured: set service.password or {}",
                self.password_env
            )
        })
    }
}

/// Directories receiving raw pages, histories and the harvest error report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_history_dir")]
    pub history_dir: PathBuf,
    #[serde(default = "default_errors_dir")]
    pub errors_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            history_dir: default_history_dir(),
            errors_dir: default_errors_dir(),
        }
    }
}

/// Parameters of the batch harvest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Serialization requested from the service (`json` or `xml`).
    #[serde(default = "default_format")]
    pub format: String,
    /// Device category identifying the energy meter under each controller.
    #[serde(default = "default_counter_category")]
    pub counter_category: String,
    /// Log value name carrying the cumulative energy index.
    #[serde(default = "default_index_metric")]
    pub index_metric: String,
    /// Log value name carrying the on/off switch output.
    #[serde(default = "default_switch_metric")]
    pub switch_metric: String,
    /// Persist every fetched page under `output.data_dir`.
    #[serde(default = "default_true")]
    pub write_pages: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            counter_category: default_counter_category(),
            index_metric: default_index_metric(),
            switch_metric: default_switch_metric(),
            write_pages: true,
        }
    }
}

impl HarvestConfig {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("counter_category", &self.counter_category),
            ("index_metric", &self.index_metric),
            ("switch_metric", &self.switch_metric),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("harvest {field} cannot be empty"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [service]
        base_url = "https://slv.example.invalid/reports"
        username = "operator"
        password = "secret"
    "#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: AppConfig = MINIMAL.parse().unwrap();
        assert_eq!(config.harvest.format, "json");
        assert_eq!(config.harvest.counter_category, "electricalCounter");
        assert_eq!(config.harvest.index_metric, "TotalKWHPositive");
        assert_eq!(config.harvest.switch_metric, "DigitalOutput1");
        assert!(config.harvest.write_pages);
        assert_eq!(config.output.history_dir, PathBuf::from("data/history"));
        assert_eq!(config.service.timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn rejects_unparsable_base_url() {
        let raw = r#"
            [service]
            base_url = "not a url"
            username = "operator"
        "#;
        assert!(raw.parse::<AppConfig>().is_err());
    }

    #[test]
    fn rejects_blank_username() {
        let raw = r#"
            [service]
            base_url = "https://slv.example.invalid"
            username = "  "
        "#;
        assert!(raw.parse::<AppConfig>().is_err());
    }

    #[test]
    fn timeout_is_read_in_seconds() {
        let raw = r#"
            [service]
            base_url = "https://slv.example.invalid"
            username = "operator"
            timeout = 5
        "#;
        let config: AppConfig = raw.parse().unwrap();
        assert_eq!(config.service.timeout, Some(Duration::from_secs(5)));
    }
}
