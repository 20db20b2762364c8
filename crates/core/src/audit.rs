use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::validation::{Severity, ValidationError};

const PREVIEW_CHARS: usize = 100;

/// Structured record of a guardrail decision, one per blocking
/// decision or validator error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditRecord {
    InputBlocked {
        topic_status: String,
        similarity_score: f32,
        query: String,
        session_id: String,
        occurred_at: DateTime<Utc>,
    },
    OutputError {
        error_type: String,
        severity: Severity,
        message: String,
        details: BTreeMap<String, Value>,
        session_id: String,
        response_preview: String,
        occurred_at: DateTime<Utc>,
    },
    CriticalBlock {
        error_type: String,
        message: String,
        details: BTreeMap<String, Value>,
        session_id: String,
        occurred_at: DateTime<Utc>,
    },
}

impl AuditRecord {
    pub fn input_blocked(
        topic_status: &str,
        similarity_score: f32,
        query: &str,
        session_id: &str,
    ) -> Self {
        Self::InputBlocked {
            topic_status: topic_status.to_string(),
            similarity_score,
            query: truncate(query),
            session_id: session_id.to_string(),
            occurred_at: Utc::now(),
        }
    }

    pub fn output_error(error: &ValidationError, session_id: &str, response: &str) -> Self {
        Self::OutputError {
            error_type: error.kind.as_str().to_string(),
            severity: error.severity,
            message: error.message.clone(),
            details: error.details.clone(),
            session_id: session_id.to_string(),
            response_preview: truncate(response),
            occurred_at: Utc::now(),
        }
    }

    pub fn critical_block(error: &ValidationError, session_id: &str) -> Self {
        Self::CriticalBlock {
            error_type: error.kind.as_str().to_string(),
            message: error.message.clone(),
            details: error.details.clone(),
            session_id: session_id.to_string(),
            occurred_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Self::InputBlocked { session_id, .. }
            | Self::OutputError { session_id, .. }
            | Self::CriticalBlock { session_id, .. } => session_id,
        }
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Write-sink for audit records. Implementations must not propagate
/// failures; a lost record must never abort a user-facing turn.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// Appends one JSON object per line. I/O failures are logged and
/// swallowed.
pub struct JsonlAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditSink {
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file: Mutex::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, record: AuditRecord) {
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(error) => {
                warn!(
                    event_name = "audit.serialize_failed",
                    error = %error,
                    "could not serialize audit record"
                );
                return;
            }
        };

        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(error) = writeln!(file, "{line}") {
            warn!(
                event_name = "audit.write_failed",
                path = %self.path.display(),
                error = %error,
                "could not append audit record"
            );
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl InMemoryAuditSink {
    pub fn records(&self) -> Vec<AuditRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, record: AuditRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use tempfile::TempDir;

    use crate::validation::{ErrorKind, Severity, ValidationError};

    use super::{AuditRecord, AuditSink, InMemoryAuditSink, JsonlAuditSink};

    fn critical_error() -> ValidationError {
        ValidationError {
            kind: ErrorKind::UnsafeRecommendation,
            severity: Severity::Critical,
            message: "response mentions `Pad Thai`".to_string(),
            details: BTreeMap::new(),
            correction: None,
        }
    }

    #[test]
    fn jsonl_sink_appends_one_record_per_line() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("logs").join("guardrails.jsonl");
        let sink = JsonlAuditSink::create(&path).expect("sink creates parent dirs");

        sink.record(AuditRecord::input_blocked("off_topic", 0.12, "weather?", "s-1"));
        sink.record(AuditRecord::critical_block(&critical_error(), "s-1"));

        let raw = fs::read_to_string(&path).expect("log file exists");
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AuditRecord = serde_json::from_str(lines[0]).expect("valid json line");
        assert!(matches!(first, AuditRecord::InputBlocked { ref topic_status, .. } if topic_status == "off_topic"));
        let second: AuditRecord = serde_json::from_str(lines[1]).expect("valid json line");
        assert!(matches!(second, AuditRecord::CriticalBlock { ref error_type, .. } if error_type == "unsafe_recommendation"));
    }

    #[test]
    fn long_queries_and_responses_are_truncated() {
        let long = "x".repeat(500);
        let record = AuditRecord::input_blocked("off_topic", 0.0, &long, "s-1");
        match record {
            AuditRecord::InputBlocked { query, .. } => assert_eq!(query.len(), 100),
            _ => panic!("expected input block record"),
        }

        let record = AuditRecord::output_error(&critical_error(), "s-1", &long);
        match record {
            AuditRecord::OutputError { response_preview, .. } => {
                assert_eq!(response_preview.len(), 100)
            }
            _ => panic!("expected output error record"),
        }
    }

    #[test]
    fn in_memory_sink_collects_records() {
        let sink = InMemoryAuditSink::default();
        sink.record(AuditRecord::critical_block(&critical_error(), "s-9"));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].session_id(), "s-9");
    }
}
