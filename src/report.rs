//! External forwarding of known-defect crash reports
//!
//! When the interceptor recognizes a crash as a known toolkit defect, it
//! wraps the event with the defect's fixed label and hands it to the editor's
//! external sink. The host application decides what a sink does: the stock
//! implementation appends JSON lines to a report file.

use crate::crash::CrashEvent;
use crate::error::SinkError;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// A crash wrapped with the fixed label of the known defect it matched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaggedCrash {
    /// Fixed identifying label of the matched defect
    pub label: String,
    /// The original crash, unmodified
    pub crash: CrashEvent,
}

impl TaggedCrash {
    /// Wrap a crash with a defect label
    pub fn new(label: impl Into<String>, crash: CrashEvent) -> Self {
        Self {
            label: label.into(),
            crash,
        }
    }
}

/// Sink receiving tagged known-defect reports from the interceptor
///
/// Delivery failures are swallowed by the interceptor; implementations
/// should still return them so the harness and tests can observe delivery.
#[cfg_attr(test, mockall::automock)]
pub trait ExternalSink: Send + Sync {
    /// Deliver one tagged crash
    fn log_crash(&self, crash: &TaggedCrash) -> Result<(), SinkError>;
}

/// Stock sink appending one JSON line per tagged crash to a report file
///
/// The file is opened in append mode on every delivery, so a sink can be
/// created before the report directory is fully provisioned and crash
/// reports from multiple processes interleave line by line.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Create a sink writing to the given report file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the report file this sink appends to
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ExternalSink for FileSink {
    fn log_crash(&self, crash: &TaggedCrash) -> Result<(), SinkError> {
        let line = serde_json::to_string(crash)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crash::CrashKind;
    use chrono::Utc;

    fn create_test_crash(message: &str) -> CrashEvent {
        CrashEvent {
            timestamp: Utc::now(),
            thread: "render".to_string(),
            os_thread_id: None,
            message: message.to_string(),
            location: None,
            backtrace: String::new(),
            kind: CrashKind::classify(message),
        }
    }

    #[test]
    fn test_tagged_crash_preserves_event() {
        let crash = create_test_crash("index out of bounds: the len is 2 but the index is 9");
        let tagged = TaggedCrash::new("KnownDefect", crash.clone());

        assert_eq!(tagged.label, "KnownDefect");
        assert_eq!(tagged.crash, crash);
    }

    #[test]
    fn test_file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crash-reports.jsonl");
        let sink = FileSink::new(&path);

        let first = TaggedCrash::new("DefectA", create_test_crash("first"));
        let second = TaggedCrash::new("DefectB", create_test_crash("second"));
        sink.log_crash(&first).unwrap();
        sink.log_crash(&second).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: TaggedCrash = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed, first);
        let parsed: TaggedCrash = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed, second);
    }

    #[test]
    fn test_file_sink_unwritable_path_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-subdir").join("reports.jsonl");
        let sink = FileSink::new(&path);

        let tagged = TaggedCrash::new("DefectA", create_test_crash("first"));
        let result = sink.log_crash(&tagged);

        assert!(matches!(result, Err(SinkError::IoError(_))));
    }
}
