//! Error types for the bookwright pipeline.
//!
//! The taxonomy separates failures of the text-generation capability
//! (`GenerateError`) from failures of the pipeline itself
//! (`PipelineError`) and of the durable store (`StorageError`).

use crate::book::ProjectStatus;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by a [`TextGenerator`](crate::provider::TextGenerator).
#[derive(Debug, Clone, Error)]
pub enum GenerateError {
    /// Missing or invalid credential. Fatal for the run; the user must
    /// fix configuration before anything is retried.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The provider rejected the call for rate or quota reasons.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Provider-supplied message.
        message: String,
        /// Provider-suggested wait before the next attempt, if any.
        retry_after: Option<Duration>,
    },

    /// Connectivity failure or request timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The model answered but the expected structure could not be parsed.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The call was aborted through its cancellation token.
    ///
    /// Cancellation is a user-directed stop, not a failure; callers must
    /// suppress error alerts for this variant.
    #[error("generation cancelled: {0}")]
    Cancelled(String),
}

impl GenerateError {
    /// Creates a rate-limit error without a suggested wait.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after: None,
        }
    }

    /// Returns true if this error is a user-directed cancellation.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// A failure writing to or reading from the key-value store.
///
/// Storage failures never abort generation; they are logged and the run
/// continues with in-memory state only.
#[derive(Debug, Clone, Error)]
#[error("storage failure for key '{key}': {message}")]
pub struct StorageError {
    /// The key being accessed.
    pub key: String,
    /// Description of the failure (quota exceeded, backend down, ...).
    pub message: String,
}

impl StorageError {
    /// Creates a new storage error.
    #[must_use]
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// The main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A generation call failed and was not recovered.
    #[error(transparent)]
    Generation(#[from] GenerateError),

    /// A generation run is already active for this project.
    #[error("a generation run is already in progress for project {0}")]
    RunInProgress(Uuid),

    /// The project has no roadmap yet.
    #[error("project {0} has no roadmap")]
    MissingRoadmap(Uuid),

    /// Assembly was requested before every module completed.
    #[error("cannot assemble: {missing} of {total} modules are not completed")]
    ModulesIncomplete {
        /// Number of modules without a completed result.
        missing: usize,
        /// Total number of roadmap modules.
        total: usize,
    },

    /// A status transition that the project state machine forbids.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: ProjectStatus,
        /// Requested status.
        to: ProjectStatus,
    },

    /// A storage operation failed in a context where it matters
    /// (project deletion, explicit checkpoint inspection).
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PipelineError {
    /// Returns true if the underlying cause is a user-directed cancellation.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Generation(e) if e.is_cancellation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_error_display() {
        let err = GenerateError::rate_limited("429 too many requests");
        assert_eq!(err.to_string(), "rate limited: 429 too many requests");

        let err = GenerateError::Auth("missing api key".to_string());
        assert!(err.to_string().contains("authentication failed"));
    }

    #[test]
    fn test_cancellation_detection() {
        let err = GenerateError::Cancelled("user navigated away".to_string());
        assert!(err.is_cancellation());

        let wrapped = PipelineError::from(err);
        assert!(wrapped.is_cancellation());

        let other = PipelineError::from(GenerateError::Network("reset".to_string()));
        assert!(!other.is_cancellation());
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::new("checkpoint_abc", "quota exceeded");
        assert_eq!(
            err.to_string(),
            "storage failure for key 'checkpoint_abc': quota exceeded"
        );
    }

    #[test]
    fn test_modules_incomplete_display() {
        let err = PipelineError::ModulesIncomplete {
            missing: 2,
            total: 5,
        };
        assert!(err.to_string().contains("2 of 5"));
    }
}
