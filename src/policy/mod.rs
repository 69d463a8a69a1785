//! Log policies deciding whether a crash warrants diagnostic capture

pub mod rules;

pub use rules::{AlwaysLogPolicy, KindFilterPolicy, SuppressMarkersPolicy, ThrottledPolicy};

use crate::crash::CrashEvent;
use crate::error::PolicyError;

/// Trait for policies that decide whether diagnostics are captured for a crash
///
/// The interceptor is fail-open: a dead policy reference or a policy error
/// both result in diagnostics being captured.
#[cfg_attr(test, mockall::automock)]
pub trait LogPolicy: Send + Sync {
    /// Decide whether the given crash should be logged
    fn should_log(&self, crash: &CrashEvent) -> Result<bool, PolicyError>;

    /// Get a human-readable name for this policy
    fn name(&self) -> &str;
}
