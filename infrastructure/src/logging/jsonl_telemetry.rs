//! JSONL file writer for gateway telemetry events.
//!
//! Each [`TelemetryEvent`] is serialized as a single JSON line with a
//! `type` field and `timestamp`, appended to the file via a buffered writer.
//! Events from several sessions can share one file.

use roundtable_application::ports::telemetry::{TelemetryEvent, TelemetrySink};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes after every event and on `Drop`.
pub struct JsonlTelemetrySink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlTelemetrySink {
    /// Open (or create) the file for appending.
    ///
    /// Creates parent directories as needed. Returns `None` if the file cannot
    /// be opened; telemetry is then simply disabled.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create telemetry directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open telemetry file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn to_record(event: TelemetryEvent, timestamp: String) -> Value {
    match event.payload {
        Value::Object(mut map) => {
            map.insert("type".to_string(), Value::String(event.event_type.to_string()));
            map.insert("timestamp".to_string(), Value::String(timestamp));
            Value::Object(map)
        }
        other => serde_json::json!({
            "type": event.event_type,
            "timestamp": timestamp,
            "data": other,
        }),
    }
}

impl TelemetrySink for JsonlTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let Ok(line) = serde_json::to_string(&to_record(event, timestamp)) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlTelemetrySink {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_events_become_jsonl_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry").join("calls.jsonl");
        let sink = JsonlTelemetrySink::new(&path).unwrap();

        sink.record(TelemetryEvent::new(
            TelemetryEvent::CALL_START,
            json!({"persona": "tech_lead", "purpose": "initial", "attempt": 1}),
        ));
        sink.record(TelemetryEvent::new(
            TelemetryEvent::CALL_SUCCESS,
            json!({"persona": "tech_lead", "input_tokens": 120}),
        ));
        drop(sink);

        let records = read_lines(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["type"], "call_start");
        assert_eq!(records[0]["persona"], "tech_lead");
        assert_eq!(records[0]["attempt"], 1);
        assert_eq!(records[1]["type"], "call_success");

        let timestamp = records[0]["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
        assert!(timestamp.ends_with('Z'));
    }

    #[test]
    fn test_reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.jsonl");

        for _ in 0..2 {
            let sink = JsonlTelemetrySink::new(&path).unwrap();
            sink.record(TelemetryEvent::new(TelemetryEvent::CALL_FAILURE, json!({"code": "timeout"})));
        }

        assert_eq!(read_lines(&path).len(), 2);
    }

    #[test]
    fn test_non_object_payload_is_wrapped() {
        let record = to_record(
            TelemetryEvent::new(TelemetryEvent::CALL_RETRY, json!("just a string")),
            "2026-01-01T00:00:00.000Z".to_string(),
        );

        assert_eq!(record["type"], "call_retry");
        assert_eq!(record["data"], "just a string");
    }
}
