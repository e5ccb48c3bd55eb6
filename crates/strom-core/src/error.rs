//! Error types for stage configuration and pipeline runs.

use thiserror::Error;

/// A stage rejected its arguments in [`Stage::configure`](crate::Stage::configure).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UsageError {
    /// Too many or too few arguments.
    #[error("{stage}: expected {expected}, got {got} argument(s)")]
    ArgumentCount {
        /// Stage name.
        stage: String,
        /// Human-readable description of what was expected.
        expected: String,
        /// Number of arguments received.
        got: usize,
    },

    /// An argument could not be parsed or is out of range.
    #[error("{stage}: invalid value '{value}' for {param}: {reason}")]
    InvalidValue {
        /// Stage name.
        stage: String,
        /// Parameter being parsed.
        param: String,
        /// Offending text.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl UsageError {
    /// Create an argument-count error.
    pub fn count(stage: &str, expected: impl Into<String>, got: usize) -> Self {
        UsageError::ArgumentCount {
            stage: stage.to_string(),
            expected: expected.into(),
            got,
        }
    }

    /// Create an invalid-value error.
    pub fn invalid(stage: &str, param: &str, value: &str, reason: impl Into<String>) -> Self {
        UsageError::InvalidValue {
            stage: stage.to_string(),
            param: param.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// A stage could not start for the negotiated signal descriptors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    /// The stage cannot handle this input/output combination.
    #[error("unsupported signal: {0}")]
    Unsupported(String),

    /// The stage's configuration is inconsistent with the signal.
    #[error("{0}")]
    Invalid(String),
}

/// Errors raised while building or running a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Contradictory stage requirements, detected before any stage starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A stage rejected its arguments.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// A stage failed to start.
    #[error("stage '{stage}' failed to start: {source}")]
    Stage {
        /// Name of the failing stage.
        stage: String,
        /// Underlying failure.
        #[source]
        source: StageError,
    },

    /// A stage broke the flow/drain progress contract.
    #[error("stage '{stage}' violated the {call} contract: {detail}")]
    ContractViolation {
        /// Name of the offending stage.
        stage: String,
        /// `process` or `drain`.
        call: &'static str,
        /// What was observed.
        detail: String,
    },

    /// Writing to the sink failed.
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),
}

impl PipelineError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        PipelineError::Configuration(message.into())
    }

    /// True for errors that are always a defect in a stage implementation.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, PipelineError::ContractViolation { .. })
    }
}

/// Convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
