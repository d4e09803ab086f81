//! Error types for the scheduler.

use thiserror::Error;

/// Errors that can occur in scheduler operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// A delay was requested from a sequence with no elements.
    #[error("delay sequence cannot be empty")]
    EmptySequence,

    /// A delay sequence contained a zero duration.
    #[error("delay at index {index} must be greater than zero")]
    ZeroDelay { index: usize },

    /// A delay list could not be parsed.
    #[error("invalid delay: {0}")]
    InvalidDelay(String),

    /// No tokio runtime was available to arm timers on.
    #[error("no tokio runtime available for timers")]
    NoRuntime,
}
