//! ---
//! slv_section: "02-remote-api"
//! slv_subsection: "module"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Typed views over SLV response payloads."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::RawResponse;
use crate::{ApiError, Result};

/// Key of the timestamp every log record carries.
pub const EVENT_TIME_KEY: &str = "eventTime";

/// One telemetry record returned by `getDevicesLogValues`.
///
/// Kept as the object the service sent, in its key order. Only `eventTime` is
/// ever interpreted; `deviceId`, `name` and `value` are exposed for reading but
/// not required. Equality is exact over every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogEvent(Map<String, Value>);

impl LogEvent {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// `eventTime` when present as text.
    pub fn event_time(&self) -> Option<&str> {
        self.0.get(EVENT_TIME_KEY).and_then(Value::as_str)
    }

    pub fn device_id(&self) -> Option<&Value> {
        self.0.get("deviceId")
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn value(&self) -> Option<&Value> {
        self.0.get("value")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

/// Entry of the `getAllControllers` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSummary {
    pub controller_str_id: String,
    pub id: i64,
    #[serde(default)]
    pub geo_zone_id: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ControllerEntry {
    controller_device: ControllerSummary,
}

/// Entry of the `getControllerDevices` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerDevice {
    pub id: i64,
    pub controller_str_id: String,
    pub category_str_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Controllers listed in a `getAllControllers` JSON response.
pub fn controllers_from_response(response: &RawResponse) -> Result<Vec<ControllerSummary>> {
    let entries: Vec<ControllerEntry> = response.json()?;
    Ok(entries
        .into_iter()
        .map(|entry| entry.controller_device)
        .collect())
}

/// Devices listed in a `getControllerDevices` JSON response.
pub fn devices_from_response(response: &RawResponse) -> Result<Vec<ControllerDevice>> {
    response.json()
}

/// Device of `category` among `devices`. When several match, the last one in
/// listing order is the controller's device.
pub fn find_device_by_category<'a>(
    controller: &str,
    devices: &'a [ControllerDevice],
    category: &str,
) -> Result<&'a ControllerDevice> {
    devices
        .iter()
        .rfind(|device| device.category_str_id == category)
        .ok_or_else(|| ApiError::NoMatchingDevice {
            controller: controller.to_owned(),
            category: category.to_owned(),
        })
}

/// Events in a `getDevicesLogValues` JSON response.
pub fn log_events_from_response(response: &RawResponse) -> Result<Vec<LogEvent>> {
    response.json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(body: serde_json::Value) -> RawResponse {
        RawResponse {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn log_event_keeps_fields_and_their_order() {
        let body = r#"{"name":"TotalKWHPositive","deviceId":101,"eventTime":"2024-01-01 00:10:00","value":1234.5,"info":null}"#;
        let event: LogEvent = serde_json::from_str(body).unwrap();
        assert_eq!(event.device_id(), Some(&json!(101)));
        assert_eq!(event.event_time(), Some("2024-01-01 00:10:00"));
        assert_eq!(serde_json::to_string(&event).unwrap(), body);
    }

    #[test]
    fn incomplete_records_are_accepted() {
        let events = log_events_from_response(&response(json!([
            {"deviceId": 1.5, "name": "DigitalOutput1", "eventTime": "2024-01-01 00:00:00"},
            {"deviceId": 18446744073709551615u64, "eventTime": "2024-01-01 00:00:00", "value": true},
            {"value": 3}
        ])))
        .unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].value(), None);
        assert_eq!(events[1].name(), None);
        assert_eq!(events[2].event_time(), None);
    }

    #[test]
    fn controllers_are_read_from_nested_device() {
        let body = json!([
            {"controllerDevice": {"controllerStrId": "C1", "id": 10, "geoZoneId": 3, "name": "x"}},
            {"controllerDevice": {"controllerStrId": "C2", "id": 11}}
        ]);
        let controllers = controllers_from_response(&response(body)).unwrap();
        assert_eq!(controllers.len(), 2);
        assert_eq!(controllers[0].geo_zone_id, Some(3));
        assert_eq!(controllers[1].controller_str_id, "C2");
        assert_eq!(controllers[1].geo_zone_id, None);
    }

    #[test]
    fn category_lookup_returns_last_match() {
        let devices: Vec<ControllerDevice> = serde_json::from_value(json!([
            {"id": 1, "controllerStrId": "C1", "categoryStrId": "streetlight"},
            {"id": 2, "controllerStrId": "C1", "categoryStrId": "electricalCounter"},
            {"id": 3, "controllerStrId": "C1", "categoryStrId": "electricalCounter"}
        ]))
        .unwrap();
        let found = find_device_by_category("C1", &devices, "electricalCounter").unwrap();
        assert_eq!(found.id, 3);
    }

    #[test]
    fn category_lookup_reports_missing_device() {
        let err = find_device_by_category("C9", &[], "electricalCounter").unwrap_err();
        match err {
            ApiError::NoMatchingDevice {
                controller,
                category,
            } => {
                assert_eq!(controller, "C9");
                assert_eq!(category, "electricalCounter");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
