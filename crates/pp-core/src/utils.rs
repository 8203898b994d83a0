use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::{domain::Caller, errors::Error, Result};

// ============== Text Helpers ==============

/// RFC3339 timestamp in UTC (for logs/telemetry).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

/// Keep the first `max_len` characters, appending `...` when something was cut.
pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

// ============== Audit Logging ==============

const AUDIT_MAX_TEXT: usize = 500;

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,

    /// `chat` or `comments`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages_processed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waited_secs: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<f64>,
}

impl AuditEvent {
    fn base(event: &str, caller: Option<&Caller>) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            operator_id: caller.map(|c| c.id.0),
            operator: caller.map(Caller::display_name),
            kind: None,
            source: None,
            records: None,
            messages_processed: None,
            waited_secs: None,
            file_id: None,
            error: None,
            context: None,
            retry_after: None,
        }
    }

    pub fn collection(
        caller: &Caller,
        kind: &str,
        source: &str,
        records: usize,
        messages_processed: Option<u32>,
        waited_secs: f64,
    ) -> Self {
        Self {
            kind: Some(kind.to_string()),
            source: Some(source.to_string()),
            records: Some(records),
            messages_processed,
            waited_secs: Some(waited_secs),
            ..Self::base("collection", Some(caller))
        }
    }

    pub fn rate_limit(operation: &str, retry_after: f64) -> Self {
        Self {
            context: Some(operation.to_string()),
            retry_after: Some(retry_after),
            ..Self::base("rate_limit", None)
        }
    }

    pub fn error(caller: &Caller, error: &str, context: Option<&str>) -> Self {
        Self {
            error: Some(error.to_string()),
            context: context.map(|s| s.to_string()),
            ..Self::base("error", Some(caller))
        }
    }

    pub fn file_deleted(caller: &Caller, file_id: u64, filename: &str) -> Self {
        Self {
            file_id: Some(file_id),
            source: Some(filename.to_string()),
            ..Self::base("file_deleted", Some(caller))
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        if let Some(s) = &event.error {
            event.error = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }
        if let Some(s) = &event.context {
            event.context = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }
        if let Some(s) = &event.source {
            event.source = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(&event)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::External(
                "audit event is not a JSON object".to_string(),
            ));
        };
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            out.push_str(&json_value_to_display(v));
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

fn json_value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::String(s) => s.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.log"))
    }

    #[test]
    fn truncate_text_counts_chars_not_bytes() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("ab", 2), "ab");
        assert_eq!(truncate_text("привет мир", 6), "привет...");
    }

    #[test]
    fn audit_json_lines_skip_empty_fields() {
        let log = AuditLogger::new(tmp_file("pp-audit-json"), true);
        let caller = Caller::new(7);
        log.write(AuditEvent::collection(&caller, "chat", "Rust Chat", 12, None, 2.0))
            .unwrap();
        log.write(AuditEvent::rate_limit("list_participants", 3.0))
            .unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<serde_json::Value> = written
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "collection");
        assert_eq!(lines[0]["records"], 12);
        assert!(lines[0].get("messages_processed").is_none());
        assert_eq!(lines[1]["retry_after"], 3.0);
        assert!(lines[1].get("operator_id").is_none());
    }

    #[test]
    fn audit_plain_text_truncates_errors() {
        let log = AuditLogger::new(tmp_file("pp-audit-text"), false);
        let caller = Caller::new(7);
        let long = "e".repeat(AUDIT_MAX_TEXT + 20);
        log.write(AuditEvent::error(&caller, &long, Some("collect_members")))
            .unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        assert!(written.contains("event: error"));
        assert!(written.contains("..."));
        assert!(!written.contains(&long));
    }
}
