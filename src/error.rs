use std::time::Duration;
use thiserror::Error;

/// Failures from invoking the vendor utility as a subprocess
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("executable '{command}' not found on PATH (are the drivers installed?)")]
    NotFound { command: String },

    #[error("'{command}' produced no result within {timeout:?} and was terminated")]
    TimedOut { command: String, timeout: Duration },

    #[error("'{command}' exited with status {code:?}: {stderr}")]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
}

/// Failures turning the vendor report into structured snapshots
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line {line}: field '{field}' is not a valid number: '{value}'")]
    MalformedField {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("line {line}: expected at least {expected} fields, found {found}")]
    TooFewFields {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// Failures applying a power-limit change
#[derive(Error, Debug)]
pub enum PowerLimitError {
    #[error("requested {requested} W is outside the supported range {min} W - {max} W")]
    OutOfRange {
        requested: f64,
        min: f64,
        max: f64,
    },

    #[error("permission denied: {detail}")]
    PermissionDenied { detail: String },

    #[error("device busy: {detail}")]
    DeviceBusy { detail: String },

    #[error("{detail}")]
    Underlying { detail: String },
}

/// Umbrella error for the sampling pipeline
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl TelemetryError {
    /// Short stable tag for logging and display, one per taxonomy leaf
    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryError::Execution(ExecutionError::NotFound { .. }) => "not-found",
            TelemetryError::Execution(ExecutionError::TimedOut { .. }) => "timed-out",
            TelemetryError::Execution(ExecutionError::NonZeroExit { .. }) => "non-zero-exit",
            TelemetryError::Execution(ExecutionError::Spawn { .. }) => "spawn-failed",
            TelemetryError::Parse(ParseError::MalformedField { .. }) => "malformed-field",
            TelemetryError::Parse(ParseError::TooFewFields { .. }) => "too-few-fields",
        }
    }
}

/// Result type alias for the telemetry pipeline
pub type Result<T> = std::result::Result<T, TelemetryError>;
