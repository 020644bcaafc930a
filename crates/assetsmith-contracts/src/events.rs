use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Append-only JSONL session log, one compact object per line.
///
/// Every event carries `type`, `session_id` and `ts`; payload fields with
/// those names are replaced.
///
/// The file is reopened for every event. A discarding writer builds the same
/// events and returns them without touching disk.
#[derive(Debug, Clone)]
pub struct EventWriter {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    session_id: String,
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self::with_path(Some(path.into()), session_id.into())
    }

    pub fn discard(session_id: impl Into<String>) -> Self {
        Self::with_path(None, session_id.into())
    }

    fn with_path(path: Option<PathBuf>, session_id: String) -> Self {
        Self {
            shared: Arc::new(Shared {
                session_id,
                path,
                write_lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.shared.path.as_deref()
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    /// Writes `payload` (an object; anything else is stored under `data`)
    /// with the header fields and returns the event as written.
    pub fn emit(&self, event_type: &str, payload: Value) -> anyhow::Result<Value> {
        let mut event = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => Map::from_iter([("data".to_string(), other)]),
        };
        event.insert("type".to_string(), Value::from(event_type));
        event.insert("session_id".to_string(), Value::from(self.session_id()));
        event.insert("ts".to_string(), Value::from(now_utc_iso()));
        let event = Value::Object(event);

        if let Some(path) = self.shared.path.as_deref() {
            self.append_line(path, &serde_json::to_string(&event)?)?;
        }
        Ok(event)
    }

    fn append_line(&self, path: &Path, line: &str) -> anyhow::Result<()> {
        let _guard = self
            .shared
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event log lock poisoned"))?;
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open event log {}", path.display()))?;
        writeln!(file, "{line}").with_context(|| format!("failed to append to {}", path.display()))?;
        Ok(())
    }
}

pub fn new_session_id() -> String {
    format!("session-{}", Uuid::new_v4().simple())
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::DateTime;
    use serde_json::{json, Value};

    use super::{new_session_id, EventWriter};

    #[test]
    fn events_are_compact_lines_with_header() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("logs").join("events.jsonl");
        let writer = EventWriter::new(&path, "session-123");

        let emitted = writer.emit("asset_created", json!({ "category": "texture" }))?;
        writer.emit("session_finished", json!({ "total_assets": 1 }))?;

        let content = fs::read_to_string(&path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(!lines[0].contains('\n'));
        let first: Value = serde_json::from_str(lines[0])?;
        assert_eq!(first, emitted);
        assert_eq!(first["type"], json!("asset_created"));
        assert_eq!(first["session_id"], json!("session-123"));
        assert_eq!(first["category"], json!("texture"));
        DateTime::parse_from_rfc3339(first["ts"].as_str().unwrap_or(""))?;
        Ok(())
    }

    #[test]
    fn unwritable_log_is_an_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let logs = temp.path().join("logs");
        let writer = EventWriter::new(logs.join("events.jsonl"), "session-123");
        writer.emit("session_started", Value::Null)?;

        fs::remove_dir_all(&logs)?;
        fs::write(&logs, b"")?;
        assert!(writer.emit("asset_created", Value::Null).is_err());
        Ok(())
    }

    #[test]
    fn header_fields_cannot_be_spoofed() -> anyhow::Result<()> {
        let writer = EventWriter::discard("session-123");
        let emitted = writer.emit("session_started", json!({ "type": "other", "provider": "dryrun" }))?;
        assert_eq!(emitted["type"], json!("session_started"));
        assert_eq!(emitted["provider"], json!("dryrun"));
        Ok(())
    }

    #[test]
    fn non_object_payloads_land_under_data() -> anyhow::Result<()> {
        let writer = EventWriter::discard("session-x");
        assert!(writer.path().is_none());
        let emitted = writer.emit("note", json!(["a", "b"]))?;
        assert_eq!(emitted["data"], json!(["a", "b"]));
        let bare = writer.emit("noop", Value::Null)?;
        assert_eq!(bare.as_object().map(|map| map.len()), Some(3));
        assert!(new_session_id().starts_with("session-"));
        Ok(())
    }
}
