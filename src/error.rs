use thiserror::Error;

/// Errors that can occur when a log policy is consulted
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Policy state unavailable: {0}")]
    StateUnavailable(String),

    #[error("Policy evaluation failed: {0}")]
    EvaluationFailed(String),
}

/// Errors that can occur while capturing editor diagnostics
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Editor content unavailable: {0}")]
    ContentUnavailable(String),

    #[error("Failed to render content: {0}")]
    RenderFailed(String),

    #[error("Failed to assemble span report: {0}")]
    SpanReportFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur when forwarding a tagged crash to an external sink
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to deliver crash report: {0}")]
    DeliveryFailed(String),

    #[error("Failed to serialize crash report: {0}")]
    SerializeError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}
