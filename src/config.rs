//! Configuration for the crash diagnostics pipeline
//!
//! Configuration is TOML, loaded with `Config::from_file`. Every section has
//! sensible defaults so embedders can start with an empty file.

use crate::crash::CrashKind;
use crate::error::ConfigError;
use crate::policy::{
    AlwaysLogPolicy, KindFilterPolicy, LogPolicy, SuppressMarkersPolicy, ThrottledPolicy,
};
use log::warn;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default byte cap for the logged content snapshot
pub const DEFAULT_MAX_SNAPSHOT_LEN: usize = 64 * 1024;

/// Smallest accepted snapshot cap; anything below cannot hold the ellipsis
const MIN_SNAPSHOT_LEN: usize = 16;

/// Top-level configuration for the diagnostics pipeline
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Capture policy settings
    pub policy: PolicyConfig,
    /// Host platform settings
    pub platform: PlatformConfig,
    /// Content snapshot settings
    pub snapshot: SnapshotConfig,
    /// Known-defect report settings
    pub report: ReportConfig,
}

/// Capture policy settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Capture mode
    pub mode: PolicyMode,
    /// Crash kinds captured in `kinds` mode
    pub kinds: Vec<CrashKind>,
    /// Message markers suppressed in `suppress` mode
    pub suppress_markers: Vec<String>,
    /// Sliding one-minute cap on captures, 0 disables throttling
    pub max_captures_per_minute: usize,
}

/// Capture mode selecting the base policy
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Capture diagnostics for every crash
    Always,
    /// Capture only the crash kinds listed in `kinds`
    Kinds,
    /// Capture everything except messages matching `suppress_markers`
    Suppress,
}

/// Host platform settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformConfig {
    /// Running toolkit build for defect matching, 0 if unknown
    pub toolkit_build: u32,
}

/// Content snapshot settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotConfig {
    /// Byte cap applied to the logged content snapshot
    pub max_content_len: usize,
}

/// Known-defect report settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Report file for the stock file sink, unset disables it
    pub path: Option<PathBuf>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            mode: PolicyMode::Always,
            kinds: Vec::new(),
            suppress_markers: Vec::new(),
            max_captures_per_minute: 0,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self { toolkit_build: 0 }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_content_len: DEFAULT_MAX_SNAPSHOT_LEN,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { path: None }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read,
    /// `ConfigError::TomlError` if it is not valid TOML, and
    /// `ConfigError::ValidationError` if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::ReadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configured values, warning about suspicious but usable ones
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snapshot.max_content_len < MIN_SNAPSHOT_LEN {
            return Err(ConfigError::ValidationError(format!(
                "snapshot.max_content_len must be at least {} bytes, got {}",
                MIN_SNAPSHOT_LEN, self.snapshot.max_content_len
            )));
        }

        if self.policy.mode == PolicyMode::Kinds && self.policy.kinds.is_empty() {
            warn!("policy.mode is 'kinds' with an empty kind list; no crash will be captured");
        }
        if self.policy.mode == PolicyMode::Suppress && self.policy.suppress_markers.is_empty() {
            warn!("policy.mode is 'suppress' with no markers; this behaves like 'always'");
        }

        Ok(())
    }

    /// Assemble the configured log policy stack
    ///
    /// The base policy follows `policy.mode`; a nonzero
    /// `max_captures_per_minute` wraps it in a throttle.
    pub fn build_policy(&self) -> Arc<dyn LogPolicy> {
        let base: Box<dyn LogPolicy> = match self.policy.mode {
            PolicyMode::Always => Box::new(AlwaysLogPolicy),
            PolicyMode::Kinds => Box::new(KindFilterPolicy::new(self.policy.kinds.clone())),
            PolicyMode::Suppress => Box::new(SuppressMarkersPolicy::new(
                self.policy.suppress_markers.clone(),
            )),
        };

        if self.policy.max_captures_per_minute > 0 {
            Arc::new(ThrottledPolicy::new(base, self.policy.max_captures_per_minute))
        } else {
            Arc::from(base)
        }
    }
}
