//! Core crash event types for the diagnostics pipeline
//!
//! This module defines the data structures used throughout the crate for
//! representing an uncaught panic: what happened, on which thread, and the
//! formatted backtrace captured at interception time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp type for consistent time handling across the crate
pub type Timestamp = DateTime<Utc>;

/// A single uncaught panic captured from the process-wide handler slot
///
/// The event is an owned record: it can be cloned, serialized, and forwarded
/// to external sinks without holding on to runtime panic state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrashEvent {
    /// When the crash was intercepted
    pub timestamp: Timestamp,
    /// Name of the thread the panic escaped on
    pub thread: String,
    /// OS-level thread id, when the platform exposes one
    pub os_thread_id: Option<u64>,
    /// Panic message extracted from the payload
    pub message: String,
    /// Source location reported by the runtime, as `file:line:column`
    pub location: Option<String>,
    /// Formatted backtrace captured at interception time
    pub backtrace: String,
    /// Classification of the panic
    pub kind: CrashKind,
}

/// Classification of a panic derived from the shape of its message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum CrashKind {
    /// Slice, string, or range indexing out of bounds
    IndexOutOfBounds,
    /// Failed assertion
    Assertion,
    /// Explicit panic or unrecognized payload
    Explicit,
}

impl CrashKind {
    /// Classify a panic message by the standard message shapes the runtime emits
    ///
    /// Classification is total: every message maps to exactly one kind, with
    /// `Explicit` as the catch-all.
    pub fn classify(message: &str) -> Self {
        let is_index_oob = message.starts_with("index out of bounds:")
            || ((message.starts_with("range start index")
                || message.starts_with("range end index"))
                && message.contains("out of range"))
            || (message.starts_with("byte index") && message.contains("out of bounds"));

        if is_index_oob {
            CrashKind::IndexOutOfBounds
        } else if message.starts_with("assertion") {
            CrashKind::Assertion
        } else {
            CrashKind::Explicit
        }
    }
}

impl CrashEvent {
    /// Build an event for the current thread with a freshly stamped timestamp
    ///
    /// # Arguments
    ///
    /// * `thread` - Name of the thread the panic escaped on
    /// * `message` - Panic message extracted from the payload
    /// * `location` - Source location, if the runtime reported one
    /// * `backtrace` - Formatted backtrace text
    pub fn new(
        thread: impl Into<String>,
        message: impl Into<String>,
        location: Option<String>,
        backtrace: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self {
            timestamp: Utc::now(),
            thread: thread.into(),
            os_thread_id: None,
            kind: CrashKind::classify(&message),
            message,
            location,
            backtrace: backtrace.into(),
        }
    }
}


// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    // Classification must be total: any message maps to a kind without panicking
    #[quickcheck]
    fn prop_classification_is_total(message: String) -> bool {
        matches!(
            CrashKind::classify(&message),
            CrashKind::IndexOutOfBounds | CrashKind::Assertion | CrashKind::Explicit
        )
    }

    // Kind round-trips through serde unchanged
    #[quickcheck]
    fn prop_event_roundtrip(message: String, thread: String) -> bool {
        let event = CrashEvent::new(thread, message, None, "bt");
        let json = serde_json::to_string(&event).unwrap();
        serde_json::from_str::<CrashEvent>(&json).unwrap() == event
    }
}
