//! Built-in log policy implementations
//!
//! These cover the common embedding cases: capture everything, capture only
//! certain crash kinds, suppress known-noisy messages, and cap the capture
//! rate. Editors with richer requirements implement `LogPolicy` themselves.

use crate::crash::{CrashEvent, CrashKind, Timestamp};
use crate::error::PolicyError;
use crate::policy::LogPolicy;
use chrono::{Duration, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Policy that captures diagnostics for every crash
pub struct AlwaysLogPolicy;

impl LogPolicy for AlwaysLogPolicy {
    fn should_log(&self, _crash: &CrashEvent) -> Result<bool, PolicyError> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "AlwaysLogPolicy"
    }
}

/// Policy that captures diagnostics only for the configured crash kinds
pub struct KindFilterPolicy {
    kinds: Vec<CrashKind>,
}

impl KindFilterPolicy {
    /// Create a policy capturing only the given kinds
    pub fn new(kinds: Vec<CrashKind>) -> Self {
        Self { kinds }
    }

    /// Create a policy capturing only out-of-bounds crashes
    pub fn with_defaults() -> Self {
        Self::new(vec![CrashKind::IndexOutOfBounds])
    }
}

impl LogPolicy for KindFilterPolicy {
    fn should_log(&self, crash: &CrashEvent) -> Result<bool, PolicyError> {
        Ok(self.kinds.contains(&crash.kind))
    }

    fn name(&self) -> &str {
        "KindFilterPolicy"
    }
}

/// Policy that skips capture when the panic message contains a known marker
///
/// Markers are matched case-insensitively as substrings of the message,
/// so `"poisoned"` suppresses both lock-poisoning shapes.
pub struct SuppressMarkersPolicy {
    markers: Vec<String>,
}

impl SuppressMarkersPolicy {
    /// Create a policy suppressing messages that contain any of the markers
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }
}

impl LogPolicy for SuppressMarkersPolicy {
    fn should_log(&self, crash: &CrashEvent) -> Result<bool, PolicyError> {
        let message = crash.message.to_lowercase();
        let suppressed = self
            .markers
            .iter()
            .any(|marker| message.contains(&marker.to_lowercase()));
        Ok(!suppressed)
    }

    fn name(&self) -> &str {
        "SuppressMarkersPolicy"
    }
}

/// Policy wrapper capping captures per sliding one-minute window
///
/// Crashes the inner policy declines are not counted against the window.
/// Once the cap is reached, further crashes within the window are declined.
pub struct ThrottledPolicy {
    inner: Box<dyn LogPolicy>,
    max_per_minute: usize,
    recent_captures: Mutex<VecDeque<Timestamp>>,
}

impl ThrottledPolicy {
    /// Wrap an inner policy with a per-minute capture cap
    ///
    /// # Arguments
    ///
    /// * `inner` - Policy consulted before the cap is applied
    /// * `max_per_minute` - Maximum number of captures allowed per minute
    pub fn new(inner: Box<dyn LogPolicy>, max_per_minute: usize) -> Self {
        Self {
            inner,
            max_per_minute,
            recent_captures: Mutex::new(VecDeque::new()),
        }
    }

    /// Number of captures recorded in the current window
    pub fn current_count(&self) -> usize {
        match self.recent_captures.lock() {
            Ok(mut window) => {
                Self::drop_expired(&mut window);
                window.len()
            }
            Err(_) => 0,
        }
    }

    /// Remove captures older than one minute from the tracking window
    fn drop_expired(window: &mut VecDeque<Timestamp>) {
        let cutoff = Utc::now() - Duration::minutes(1);
        window.retain(|&time| time > cutoff);
    }
}

impl LogPolicy for ThrottledPolicy {
    fn should_log(&self, crash: &CrashEvent) -> Result<bool, PolicyError> {
        if !self.inner.should_log(crash)? {
            return Ok(false);
        }

        let mut window = self
            .recent_captures
            .lock()
            .map_err(|_| PolicyError::StateUnavailable("capture window poisoned".to_string()))?;

        Self::drop_expired(&mut window);
        if window.len() < self.max_per_minute {
            window.push_back(Utc::now());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn name(&self) -> &str {
        "ThrottledPolicy"
    }
}
