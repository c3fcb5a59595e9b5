//! ---
//! slv_section: "03-persistence"
//! slv_subsection: "module"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Per-device history files: dedup, ordering and atomic rewrite."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use path_absolutize::Absolutize;
use slv_api::model::log_events_from_response;
use slv_api::{Dispatched, Format, LogEvent};
use tracing::{debug, info};

use crate::fs_util::{to_pretty_json, write_atomic};
use crate::{PersistenceError, Result};

/// Timestamp layout of `eventTime`.
pub const EVENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static HISTORY_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Counts describing one historization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorizeOutcome {
    /// History file that was written.
    pub path: PathBuf,
    /// Events read from the file before merging.
    pub existing: usize,
    /// Events offered by the caller.
    pub incoming: usize,
    /// Events dropped because an identical one was already present.
    pub duplicates: usize,
    /// Events stored after the merge.
    pub total: usize,
}

impl HistorizeOutcome {
    /// Growth of the history caused by this merge.
    pub fn added(&self) -> usize {
        self.total.saturating_sub(self.existing)
    }
}

/// Fold `new_events` into the history stored at `path`.
///
/// Existing events come first, then the new ones; identical records keep only
/// their first occurrence, and the result is stably sorted by `eventTime`. The
/// file is replaced atomically. Calls on the same path are serialized within
/// the process.
pub fn historize(path: &Path, new_events: Vec<LogEvent>) -> Result<HistorizeOutcome> {
    ensure_json_path(path)?;
    let (key, lock) = acquire_path_lock(path)?;
    let outcome = {
        let _guard = lock.lock();
        merge_into(path, new_events)
    };
    release_path_lock(&key, lock);
    let outcome = outcome?;

    info!(
        path = %path.display(),
        existing = outcome.existing,
        incoming = outcome.incoming,
        duplicates = outcome.duplicates,
        total = outcome.total,
        "history merged"
    );
    Ok(outcome)
}

fn merge_into(path: &Path, new_events: Vec<LogEvent>) -> Result<HistorizeOutcome> {
    let mut events = read_history(path)?;
    let existing = events.len();
    let incoming = new_events.len();
    events.extend(new_events);
    let combined = events.len();

    let merged = merge_events(events)?;
    write_atomic(path, &to_pretty_json(&merged)?)?;

    Ok(HistorizeOutcome {
        path: path.to_path_buf(),
        existing,
        incoming,
        duplicates: combined - merged.len(),
        total: merged.len(),
    })
}

/// Historize the events carried by a log-value response.
///
/// Only JSON responses participate in history merging.
pub fn historize_dispatched(path: &Path, dispatched: &Dispatched) -> Result<HistorizeOutcome> {
    if dispatched.format != Format::Json {
        return Err(PersistenceError::FormatMismatch {
            path: path.to_path_buf(),
            reason: format!(
                "{} was fetched as {}",
                dispatched.operation.method_name(),
                dispatched.format
            ),
        });
    }
    let events = log_events_from_response(&dispatched.response)?;
    historize(path, events)
}

/// Stable dedup followed by a stable sort on the parsed `eventTime`.
///
/// `eventTime` is the only field read; every event must carry it.
pub fn merge_events(events: Vec<LogEvent>) -> Result<Vec<LogEvent>> {
    let mut keyed = dedup_stable(events)
        .into_iter()
        .map(|event| event_instant(&event).map(|at| (at, event)))
        .collect::<Result<Vec<_>>>()?;
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, event)| event).collect())
}

/// Parse an `eventTime` value.
pub fn parse_event_time(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, EVENT_TIME_FORMAT).map_err(|source| {
        PersistenceError::EventTime {
            value: value.to_owned(),
            source,
        }
    })
}

fn event_instant(event: &LogEvent) -> Result<NaiveDateTime> {
    match event.event_time() {
        Some(value) => parse_event_time(value),
        None => Err(PersistenceError::MissingEventTime(
            serde_json::to_string(event)?,
        )),
    }
}

fn dedup_stable(events: Vec<LogEvent>) -> Vec<LogEvent> {
    // Bucketed by eventTime text; full equality decides within a bucket.
    let mut buckets: HashMap<Option<String>, Vec<usize>> = HashMap::new();
    let mut unique: Vec<LogEvent> = Vec::with_capacity(events.len());
    for event in events {
        let bucket = buckets
            .entry(event.event_time().map(str::to_owned))
            .or_default();
        if bucket.iter().any(|&index| unique[index] == event) {
            continue;
        }
        bucket.push(unique.len());
        unique.push(event);
    }
    unique
}

fn ensure_json_path(path: &Path) -> Result<()> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(())
    } else {
        Err(PersistenceError::FormatMismatch {
            path: path.to_path_buf(),
            reason: "history files must use the .json extension".into(),
        })
    }
}

fn read_history(path: &Path) -> Result<Vec<LogEvent>> {
    if !path.exists() {
        debug!(path = %path.display(), "history absent, starting empty");
        return Ok(Vec::new());
    }
    let bytes = fs::read(path)?;
    let value: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|err| PersistenceError::FormatMismatch {
            path: path.to_path_buf(),
            reason: format!("existing content is not json ({err})"),
        })?;
    if !value.is_array() {
        return Err(PersistenceError::FormatMismatch {
            path: path.to_path_buf(),
            reason: "existing content is not a json array".into(),
        });
    }
    Ok(serde_json::from_value(value)?)
}

fn acquire_path_lock(path: &Path) -> Result<(PathBuf, Arc<Mutex<()>>)> {
    let key = path.absolutize()?.into_owned();
    let lock = HISTORY_LOCKS.lock().entry(key.clone()).or_default().clone();
    Ok((key, lock))
}

/// Drop the registry entry once no other caller holds or waits for it.
fn release_path_lock(key: &Path, lock: Arc<Mutex<()>>) {
    let mut locks = HISTORY_LOCKS.lock();
    drop(lock);
    if locks
        .get(key)
        .is_some_and(|entry| Arc::strong_count(entry) == 1)
    {
        locks.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn event(time: &str, value: i64) -> LogEvent {
        serde_json::from_value(json!({
            "deviceId": 101,
            "name": "TotalKWHPositive",
            "eventTime": time,
            "value": value
        }))
        .unwrap()
    }

    #[test]
    fn merge_drops_duplicates_and_sorts() {
        let merged = merge_events(vec![
            event("2024-01-02 00:00:00", 1),
            event("2024-01-01 00:00:00", 2),
            event("2024-01-02 00:00:00", 1),
        ])
        .unwrap();
        assert_eq!(
            merged,
            vec![
                event("2024-01-01 00:00:00", 2),
                event("2024-01-02 00:00:00", 1)
            ]
        );
    }

    #[test]
    fn equal_timestamps_keep_concatenation_order() {
        let merged = merge_events(vec![
            event("2024-01-03 00:00:00", 9),
            event("2024-01-02 00:00:00", 5),
            event("2024-01-02 00:00:00", 3),
            event("2024-01-02 00:00:00", 4),
        ])
        .unwrap();
        let values: Vec<_> = merged.iter().map(|e| e.value().cloned()).collect();
        assert_eq!(
            values,
            vec![Some(json!(5)), Some(json!(3)), Some(json!(4)), Some(json!(9))]
        );
    }

    #[test]
    fn passthrough_difference_is_not_a_duplicate() {
        let mut a = event("2024-01-01 00:00:00", 1).into_fields();
        let mut b = a.clone();
        a.insert("info".into(), json!("x"));
        b.insert("info".into(), json!("y"));
        let merged = merge_events(vec![LogEvent::new(a), LogEvent::new(b)]).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn record_without_event_time_is_rejected() {
        let err = merge_events(vec![serde_json::from_value(json!({"deviceId": 1})).unwrap()])
            .unwrap_err();
        assert!(matches!(err, PersistenceError::MissingEventTime(ref record) if record.contains("deviceId")));
    }

    #[test]
    fn lock_registry_entry_is_released_after_merge() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("released.json");
        historize(&path, vec![event("2024-01-01 00:00:00", 1)]).unwrap();
        let key = path.absolutize().unwrap().into_owned();
        assert!(!HISTORY_LOCKS.lock().contains_key(&key));

        fs::write(&path, "{}").unwrap();
        assert!(historize(&path, Vec::new()).is_err());
        assert!(!HISTORY_LOCKS.lock().contains_key(&key));
    }

    #[test]
    fn bad_event_time_is_rejected() {
        let err = merge_events(vec![event("01/01/2024 00:00:00", 1)]).unwrap_err();
        assert!(matches!(err, PersistenceError::EventTime { .. }));
    }

    #[test]
    fn non_json_extension_is_a_format_mismatch() {
        let dir = tempdir().unwrap();
        let err = historize(&dir.path().join("history.xml"), Vec::new()).unwrap_err();
        assert!(matches!(err, PersistenceError::FormatMismatch { .. }));
    }

    #[test]
    fn markup_content_is_a_format_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "<events/>").unwrap();
        let err = historize(&path, vec![event("2024-01-01 00:00:00", 1)]).unwrap_err();
        assert!(matches!(err, PersistenceError::FormatMismatch { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "<events/>");
    }

    #[test]
    fn outcome_counts_are_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("h.json");
        historize(&path, vec![event("2024-01-02 00:00:00", 1)]).unwrap();
        let outcome = historize(
            &path,
            vec![
                event("2024-01-01 00:00:00", 2),
                event("2024-01-02 00:00:00", 1),
            ],
        )
        .unwrap();
        assert_eq!(outcome.existing, 1);
        assert_eq!(outcome.incoming, 2);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.added(), 1);
    }
}
