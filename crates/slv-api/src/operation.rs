//! ---
//! slv_section: "02-remote-api"
//! slv_subsection: "module"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Catalogue of remote SLV operations."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
use std::fmt;
use std::str::FromStr;

use crate::params::{ParamValue, ParameterSet};
use crate::ApiError;

/// Response serialization accepted by the `ser` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Xml,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
        }
    }

    /// File extension used when a page in this format is written to disk.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ApiError;

    /// Exact, case-sensitive match on `json` or `xml`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            other => Err(ApiError::InvalidFormat(other.to_owned())),
        }
    }
}

/// HTTP verb used by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// Service area an operation lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Asset and topology queries.
    Asset,
    /// Logging and log-value queries.
    Logging,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Asset => "/api/asset/",
            Endpoint::Logging => "/api/logging/",
        }
    }
}

/// A remote operation together with its operation-specific arguments.
///
/// The `ser` parameter is not part of the variant; it is injected by
/// [`Operation::parameters`] from the validated [`Format`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Every controller known to the installation.
    GetAllControllers,
    /// Geozones whose name matches, fully or partially.
    SearchGeozones { name: String, partial_match: bool },
    /// Direct children of a geozone.
    GetGeozoneChildrenGeozones {
        geozone_id: i64,
        compute_hierarchy_infos: bool,
    },
    /// Value descriptors exposed by one device.
    GetDeviceValueDescriptors {
        controller_str_id: String,
        id_on_controller: String,
        /// Epoch milliseconds sent as the `time` parameter.
        time: i64,
    },
    /// Devices attached to one or several controllers.
    GetControllerDevices { controller_str_id: ParamValue },
    /// Logged values for devices and value names over a window.
    ///
    /// `from` and `to` are passed through as given, in the service's
    /// `dd/mm/yyyy hh:mm:ss` notation.
    GetDevicesLogValues {
        device_id: ParamValue,
        name: ParamValue,
        from: String,
        to: String,
    },
}

impl Operation {
    /// Name of the remote method, appended to the endpoint path.
    pub fn method_name(&self) -> &'static str {
        match self {
            Operation::GetAllControllers => "getAllControllers",
            Operation::SearchGeozones { .. } => "searchGeozones",
            Operation::GetGeozoneChildrenGeozones { .. } => "getGeozoneChildrenGeozones",
            Operation::GetDeviceValueDescriptors { .. } => "getDeviceValueDescriptors",
            Operation::GetControllerDevices { .. } => "getControllerDevices",
            Operation::GetDevicesLogValues { .. } => "getDevicesLogValues",
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            Operation::GetDeviceValueDescriptors { .. } | Operation::GetDevicesLogValues { .. } => {
                Endpoint::Logging
            }
            _ => Endpoint::Asset,
        }
    }

    /// The bulk log-value fetch is posted because repeated `deviceId`/`name`
    /// pairs overflow practical URL lengths.
    pub fn http_method(&self) -> HttpMethod {
        match self {
            Operation::GetDevicesLogValues { .. } => HttpMethod::Post,
            _ => HttpMethod::Get,
        }
    }

    /// `baseUrl + endpointPath + operationName`, without any normalisation.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}{}", base_url, self.endpoint().path(), self.method_name())
    }

    /// Parameter set sent on the wire, in the order the service documents them.
    pub fn parameters(&self, format: Format) -> ParameterSet {
        let ser = format.as_str();
        match self {
            Operation::GetAllControllers => ParameterSet::new().with("ser", ser),
            Operation::SearchGeozones {
                name,
                partial_match,
            } => ParameterSet::new()
                .with("name", name.as_str())
                .with("partialMatch", *partial_match)
                .with("ser", ser),
            Operation::GetGeozoneChildrenGeozones {
                geozone_id,
                compute_hierarchy_infos,
            } => ParameterSet::new()
                .with("geozoneId", *geozone_id)
                .with("computeHierarchyInfos", *compute_hierarchy_infos)
                .with("ser", ser),
            Operation::GetDeviceValueDescriptors {
                controller_str_id,
                id_on_controller,
                time,
            } => ParameterSet::new()
                .with("controllerStrId", controller_str_id.as_str())
                .with("idOnController", id_on_controller.as_str())
                .with("ser", ser)
                .with("time", *time),
            Operation::GetControllerDevices { controller_str_id } => ParameterSet::new()
                .with("ser", ser)
                .with("controllerStrId", controller_str_id.clone()),
            Operation::GetDevicesLogValues {
                device_id,
                name,
                from,
                to,
            } => {
                let mut params = ParameterSet::new()
                    .with("ser", ser)
                    .with("from", from.as_str())
                    .with("to", to.as_str());
                params.encode("deviceId", device_id.clone(), 1);
                params.encode("name", name.clone(), 1);
                params
            }
        }
    }

    /// Unsanitized file name for a persisted page of this operation.
    ///
    /// List-valued parameters contribute nothing because no single literal
    /// represents them. Scalar values are appended with underscores, and the
    /// log-value fetch always ends with its date range.
    pub fn file_stem(&self) -> String {
        match self {
            Operation::GetDevicesLogValues { from, to, .. } => {
                let mut stem = self.log_values_prefix();
                stem.push('_');
                stem.push_str(from);
                stem.push('_');
                stem.push_str(to);
                stem
            }
            Operation::GetControllerDevices { controller_str_id } => {
                let mut stem = self.method_name().to_owned();
                if let Some(id) = controller_str_id.as_single() {
                    stem.push('_');
                    stem.push_str(&id.to_string());
                }
                stem
            }
            _ => self.method_name().to_owned(),
        }
    }

    /// Unsanitized history file name for log-value fetches: the page stem
    /// without the date range, suffixed with `_history`.
    pub fn history_stem(&self) -> Option<String> {
        match self {
            Operation::GetDevicesLogValues { .. } => {
                Some(format!("{}_history", self.log_values_prefix()))
            }
            _ => None,
        }
    }

    fn log_values_prefix(&self) -> String {
        let mut stem = self.method_name().to_owned();
        if let Operation::GetDevicesLogValues {
            device_id, name, ..
        } = self
        {
            for value in [device_id, name] {
                if let Some(single) = value.as_single() {
                    stem.push('_');
                    stem.push_str(&single.to_string());
                }
            }
        }
        stem
    }
}
