//! Editor content capability and structured span reporting
//!
//! The interceptor never talks to the editor widget directly. It sees the
//! document through the `EditorContent` trait, which the embedding editor
//! implements on its own document model. Every operation may fail; the
//! interceptor recovers from each failure without propagating it.

use crate::error::SnapshotError;
use crate::report::ExternalSink;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Capability trait giving the interceptor read access to editor state
#[cfg_attr(test, mockall::automock)]
pub trait EditorContent: Send + Sync {
    /// Render the current document as plain text or HTML, without further escaping
    fn render_content(&self) -> Result<String, SnapshotError>;

    /// Produce a structured description of the current span and layout state
    fn span_report(&self) -> Result<SpanReport, SnapshotError>;

    /// Optional sink for forwarding known-defect reports to the host application
    fn external_sink(&self) -> Option<Arc<dyn ExternalSink>> {
        None
    }
}

/// Structured snapshot of the editor's span and layout state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanReport {
    /// Total length of the document in bytes
    pub content_len: usize,
    /// Number of layout blocks currently materialized
    pub block_count: usize,
    /// All spans attached to the document
    pub spans: Vec<SpanRecord>,
}

/// One span attached to the document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanRecord {
    /// Byte offset where the span starts
    pub start: usize,
    /// Byte offset one past the end of the span
    pub end: usize,
    /// Span kind as reported by the editor (bold, link, list item, ...)
    pub kind: String,
    /// Editor-specific span flags
    pub flags: u32,
}

/// In-memory `EditorContent` implementation over a plain text buffer
///
/// Used by the demo harness and by embedders that want crash diagnostics
/// before wiring up a full document model. Blocks are approximated as lines.
pub struct BufferSnapshot {
    content: String,
    spans: Vec<SpanRecord>,
    sink: Option<Arc<dyn ExternalSink>>,
}

impl BufferSnapshot {
    /// Create a snapshot provider over the given text
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            spans: Vec::new(),
            sink: None,
        }
    }

    /// Attach span records to the buffer
    pub fn with_spans(mut self, spans: Vec<SpanRecord>) -> Self {
        self.spans = spans;
        self
    }

    /// Attach an external sink for known-defect forwarding
    pub fn with_sink(mut self, sink: Arc<dyn ExternalSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl EditorContent for BufferSnapshot {
    fn render_content(&self) -> Result<String, SnapshotError> {
        Ok(self.content.clone())
    }

    fn span_report(&self) -> Result<SpanReport, SnapshotError> {
        Ok(SpanReport {
            content_len: self.content.len(),
            block_count: self.content.lines().count(),
            spans: self.spans.clone(),
        })
    }

    fn external_sink(&self) -> Option<Arc<dyn ExternalSink>> {
        self.sink.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{MockExternalSink, TaggedCrash};
    use std::sync::Mutex;

    #[test]
    fn test_span_report_serialization() {
        let report = SpanReport {
            content_len: 42,
            block_count: 3,
            spans: vec![SpanRecord {
                start: 0,
                end: 5,
                kind: "bold".to_string(),
                flags: 0x21,
            }],
        };

        let json = serde_json::to_string(&report).unwrap();
        let deserialized: SpanReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, deserialized);
    }

    #[test]
    fn test_buffer_snapshot_renders_content_verbatim() {
        let provider = BufferSnapshot::new("<p>Hello <b>world</b></p>");
        assert_eq!(
            provider.render_content().unwrap(),
            "<p>Hello <b>world</b></p>"
        );
    }

    #[test]
    fn test_buffer_snapshot_span_report() {
        let provider = BufferSnapshot::new("first line\nsecond line").with_spans(vec![
            SpanRecord {
                start: 0,
                end: 10,
                kind: "heading".to_string(),
                flags: 0,
            },
            SpanRecord {
                start: 11,
                end: 22,
                kind: "paragraph".to_string(),
                flags: 0,
            },
        ]);

        let report = provider.span_report().unwrap();
        assert_eq!(report.content_len, 22);
        assert_eq!(report.block_count, 2);
        assert_eq!(report.spans.len(), 2);
        assert_eq!(report.spans[0].kind, "heading");
    }

    #[test]
    fn test_buffer_snapshot_without_sink() {
        let provider = BufferSnapshot::new("text");
        assert!(provider.external_sink().is_none());
    }

    #[test]
    fn test_buffer_snapshot_exposes_attached_sink() {
        let delivered = Arc::new(Mutex::new(Vec::<TaggedCrash>::new()));
        let mut sink = MockExternalSink::new();
        let delivered_clone = delivered.clone();
        sink.expect_log_crash().returning(move |crash| {
            delivered_clone.lock().unwrap().push(crash.clone());
            Ok(())
        });

        let provider = BufferSnapshot::new("text").with_sink(Arc::new(sink));
        let exposed = provider.external_sink().expect("sink should be exposed");

        let tagged = TaggedCrash::new(
            "Defect",
            crate::crash::CrashEvent::new("main", "boom", None, ""),
        );
        exposed.log_crash(&tagged).unwrap();
        assert_eq!(delivered.lock().unwrap().len(), 1);
    }
}
