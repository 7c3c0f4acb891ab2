// stress-harness/src/error.rs
// Error taxonomy for the stress harness

use std::fmt;
use std::result;
use thiserror::Error;

/// Main error type for the stress harness
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Option resolution produced out-of-range or non-coercible values.
    /// Carries every field-level violation at once, not just the first.
    #[error("invalid options: {}", format_violations(.violations))]
    InvalidOptions { violations: Vec<OptionViolation> },

    /// The run completed but the observed pass rate fell below the
    /// configured threshold
    #[error("{function}: pass rate {observed_percent:.1}% is below the required {expected_percent:.1}% ({passes}/{total} iterations passed)")]
    ThresholdNotMet {
        function: String,
        expected_percent: f64,
        observed_percent: f64,
        passes: u64,
        total: u64,
    },

    /// A worker task died outside the per-iteration error handling
    /// (panic or scheduler failure); fatal to the whole run
    #[error("stress worker aborted the run: {message}")]
    WorkerAborted { message: String },

    /// Requested pid was absent from the process snapshot
    #[error("process {pid} not found")]
    ProcessNotFound { pid: i32 },

    /// Pid outside the space of real process ids
    #[error("invalid pid: {pid}")]
    InvalidPid { pid: i32 },

    /// start() called while the sampling loops are still active
    #[error("counter sampler is already running; call stop() first")]
    SamplerAlreadyRunning,

    /// A refresh or sampling tick failed
    #[error("sampling error: {0}")]
    Sampling(String),

    /// Artifact I/O errors
    #[error("I/O error: {operation} failed - {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization errors
    #[error("serialization error: {context} - {source}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl HarnessError {
    pub(crate) fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        HarnessError::Io {
            operation: operation.into(),
            source,
        }
    }

    pub(crate) fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        HarnessError::Serialization {
            context: context.into(),
            source,
        }
    }
}

/// A single field-level option validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionViolation {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl OptionViolation {
    pub fn new(field: &'static str, value: impl fmt::Display, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for OptionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {:?}: {}", self.field, self.value, self.message)
    }
}

fn format_violations(violations: &[OptionViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Typed marker for an expected, policy-level failure of the unit of work
/// under test. Anything else thrown from an iteration is classified as an
/// unexpected error.
#[derive(Error, Debug)]
#[error("assertion failed: {0}")]
pub struct AssertionFailure(pub String);

impl AssertionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result type alias for convenience
pub type Result<T> = result::Result<T, HarnessError>;
