//! Domain error types.

use crate::domain::lifecycle::StrategyStatus;

/// A parse error with position information for rule and indicator parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for ruletrader.
#[derive(Debug, thiserror::Error)]
pub enum RuletraderError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("cannot {operation} strategy in status {status}")]
    InvalidTransition {
        status: StrategyStatus,
        operation: &'static str,
    },

    #[error("strategy {id} not found")]
    NotFound { id: String },

    #[error("strategy {id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict { id: String, expected: u64, found: u64 },

    #[error("candle data error: {reason}")]
    DataProvider { reason: String },

    #[error("order submission error: {reason}")]
    OrderSubmission { reason: String },

    #[error("repository error: {reason}")]
    Repository { reason: String },

    #[error("event publish error: {reason}")]
    EventPublish { reason: String },

    #[error("simulation error: {reason}")]
    Simulation { reason: String },

    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RuletraderError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RuletraderError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<&RuletraderError> for std::process::ExitCode {
    fn from(err: &RuletraderError) -> Self {
        let code: u8 = match err {
            RuletraderError::Io(_) | RuletraderError::Timeout { .. } => 1,
            RuletraderError::ConfigParse { .. }
            | RuletraderError::ConfigMissing { .. }
            | RuletraderError::ConfigInvalid { .. } => 2,
            RuletraderError::DataProvider { .. }
            | RuletraderError::Repository { .. }
            | RuletraderError::EventPublish { .. }
            | RuletraderError::OrderSubmission { .. }
            | RuletraderError::NotFound { .. }
            | RuletraderError::Conflict { .. } => 3,
            RuletraderError::RuleParse(_) | RuletraderError::Validation { .. } => 4,
            RuletraderError::InvalidTransition { .. } | RuletraderError::Simulation { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
