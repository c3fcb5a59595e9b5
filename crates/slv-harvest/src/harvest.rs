//! ---
//! slv_section: "04-harvest"
//! slv_subsection: "module"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Controller enumeration, log-value fetches and historization."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
use std::path::PathBuf;

use slv_api::model::{controllers_from_response, devices_from_response, find_device_by_category};
use slv_api::{ControllerSummary, Dispatched, Format, Operation, ParamValue, SlvClient};
use slv_common::AppConfig;
use slv_persistence::{historize_dispatched, persist_dispatched, sanitize_file_name, HistoryMetrics};
use tracing::{info, warn};

use crate::report::{HarvestReport, HarvestStage};
use crate::window::TimeWindow;
use crate::{HarvestError, Result};

/// Inputs of a run, detached from the configuration file layout.
#[derive(Debug, Clone)]
pub struct HarvestSettings {
    pub format: String,
    pub counter_category: String,
    pub index_metric: String,
    pub switch_metric: String,
    pub write_pages: bool,
    pub data_dir: PathBuf,
    pub history_dir: PathBuf,
}

impl HarvestSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            format: config.harvest.format.clone(),
            counter_category: config.harvest.counter_category.clone(),
            index_metric: config.harvest.index_metric.clone(),
            switch_metric: config.harvest.switch_metric.clone(),
            write_pages: config.harvest.write_pages,
            data_dir: config.output.data_dir.clone(),
            history_dir: config.output.history_dir.clone(),
        }
    }
}

/// Drives one harvest over every controller of an installation.
#[derive(Debug, Clone)]
pub struct Harvester {
    client: SlvClient,
    settings: HarvestSettings,
    metrics: Option<HistoryMetrics>,
}

impl Harvester {
    pub fn new(client: SlvClient, settings: HarvestSettings) -> Self {
        Self {
            client,
            settings,
            metrics: None,
        }
    }

    /// Count written pages and history merges in `metrics`.
    pub fn with_metrics(mut self, metrics: HistoryMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn settings(&self) -> &HarvestSettings {
        &self.settings
    }

    /// Fetch the energy index of every controller's counter and the switch
    /// output of every controller over `window`.
    ///
    /// Controller discovery is always requested as JSON since its content is
    /// read back. Log values use the configured format. Transport errors, an
    /// invalid format and an unusable controller listing abort the run; every
    /// other failure is recorded in the returned report.
    pub async fn run(&self, window: &TimeWindow, historize: bool) -> Result<HarvestReport> {
        let mut report = HarvestReport::new();
        info!(
            from = %window.slv_from(),
            to = %window.slv_to(),
            format = %self.settings.format,
            historize,
            "harvest started"
        );

        let listing = self
            .client
            .call(Operation::GetAllControllers, Format::Json.as_str())
            .await?;
        if !listing.response.is_success() {
            return Err(HarvestError::Status {
                operation: listing.operation.method_name(),
                status: listing.response.status,
            });
        }
        self.write_page(&listing, &mut report);
        let controllers = controllers_from_response(&listing.response)?;
        info!(count = controllers.len(), "controllers listed");

        let mut counter_ids = Vec::new();
        for controller in &controllers {
            if let Some(id) = self.locate_counter(controller, &mut report).await? {
                counter_ids.push(id);
            }
        }
        let controller_ids: Vec<i64> = controllers.iter().map(|c| c.id).collect();

        let settings = &self.settings;
        for (ids, metric) in [
            (counter_ids, &settings.index_metric),
            (controller_ids, &settings.switch_metric),
        ] {
            report.merge(self.fetch_metric(window, ids, metric, historize).await?);
        }

        info!(
            failures = report.failures().len(),
            histories = report.histories().len(),
            pages = report.pages().len(),
            "harvest finished"
        );
        Ok(report)
    }

    async fn locate_counter(
        &self,
        controller: &ControllerSummary,
        report: &mut HarvestReport,
    ) -> Result<Option<i64>> {
        let subject = controller.controller_str_id.as_str();
        let operation = Operation::GetControllerDevices {
            controller_str_id: subject.into(),
        };
        let dispatched = self.client.call(operation, Format::Json.as_str()).await?;
        if !dispatched.response.is_success() {
            report.record_failure(
                HarvestStage::ControllerDevices,
                subject,
                format!("HTTP {}", dispatched.response.status),
            );
            return Ok(None);
        }
        self.write_page(&dispatched, report);

        let devices = match devices_from_response(&dispatched.response) {
            Ok(devices) => devices,
            Err(err) => {
                report.record_failure(HarvestStage::ControllerDevices, subject, err.to_string());
                return Ok(None);
            }
        };
        match find_device_by_category(subject, &devices, &self.settings.counter_category) {
            Ok(device) => Ok(Some(device.id)),
            Err(err) => {
                warn!(controller = subject, "controller has no counter");
                report.record_failure(HarvestStage::ControllerDevices, subject, err.to_string());
                Ok(None)
            }
        }
    }

    /// One log-value fetch with its page write and merge, reported on its own.
    async fn fetch_metric(
        &self,
        window: &TimeWindow,
        device_ids: Vec<i64>,
        metric: &str,
        historize: bool,
    ) -> Result<HarvestReport> {
        let mut report = HarvestReport::new();
        if device_ids.is_empty() {
            warn!(metric, "no devices to fetch, skipping");
            return Ok(report);
        }
        let devices = device_ids.len();
        let operation = Operation::GetDevicesLogValues {
            device_id: ParamValue::many(device_ids),
            name: metric.into(),
            from: window.slv_from(),
            to: window.slv_to(),
        };
        let dispatched = self.client.call(operation, &self.settings.format).await?;
        if !dispatched.response.is_success() {
            report.record_failure(
                HarvestStage::LogValues,
                metric,
                format!("HTTP {}", dispatched.response.status),
            );
            return Ok(report);
        }
        info!(metric, devices, "log values fetched");
        self.write_page(&dispatched, &mut report);

        if historize {
            self.historize(&dispatched, &mut report);
        }
        Ok(report)
    }

    fn write_page(&self, dispatched: &Dispatched, report: &mut HarvestReport) {
        if !self.settings.write_pages {
            return;
        }
        match persist_dispatched(dispatched, &self.settings.data_dir) {
            Ok(path) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_page(dispatched.format.as_str());
                }
                report.record_page(path);
            }
            Err(err) => report.record_failure(
                HarvestStage::PageWrite,
                dispatched.operation.file_stem(),
                err.to_string(),
            ),
        }
    }

    fn historize(&self, dispatched: &Dispatched, report: &mut HarvestReport) {
        let Some(stem) = dispatched.operation.history_stem() else {
            return;
        };
        let path = self
            .settings
            .history_dir
            .join(format!("{}.json", sanitize_file_name(&stem)));
        match historize_dispatched(&path, dispatched) {
            Ok(outcome) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_merge(&outcome);
                }
                report.record_history(outcome);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "historization failed");
                report.record_failure(
                    HarvestStage::Historize,
                    path.display().to_string(),
                    err.to_string(),
                );
            }
        }
    }
}
