use std::time::Duration;

use thiserror::Error;

/// Which side of a language-model call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFailure {
    /// The backend server could not be reached at all.
    Unreachable,
    /// The backend answered but refused the call (bad key, quota, unknown model).
    Rejected,
    /// The backend answered with something that is not a completion.
    InvalidResponse,
}

impl std::fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unreachable => "unreachable",
            Self::Rejected => "rejected",
            Self::InvalidResponse => "invalid response",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Index '{index}' unavailable: {message}")]
    IndexUnavailable { index: String, message: String },

    #[error("Index '{index}' rejected the request: {message}")]
    IndexRejected { index: String, message: String },

    #[error("Vector dimension mismatch: index expects {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Generation backend {kind}: {message}")]
    GenerationBackend { kind: BackendFailure, message: String },

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: &'static str, after: Duration },

    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Failures worth another attempt by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::IndexUnavailable { .. }
                | Self::GenerationBackend { kind: BackendFailure::Unreachable, .. }
        )
    }

    /// Actionable text for a front end, one message per failure kind.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::GenerationBackend { kind: BackendFailure::Unreachable, .. } => {
                "Unable to connect to the language model server. Please check if the corresponding container has been started."
            }
            Self::GenerationBackend { kind: BackendFailure::Rejected, .. } => {
                "An error occurred while accessing the language model API. Check your API key."
            }
            Self::IndexUnavailable { .. } => {
                "Unable to reach the search index. Please check that Elasticsearch is running."
            }
            Self::Timeout { .. } => "The request took too long. Please try again.",
            Self::DimensionMismatch { .. } | Self::InvalidConfig(_) => {
                "The service is misconfigured. Check the embedding model and index settings."
            }
            _ => "An unexpected error occurred. Please try again or contact support if the problem persists.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failures_map_to_distinct_messages() {
        let unreachable = Error::GenerationBackend { kind: BackendFailure::Unreachable, message: "refused".into() };
        let rejected = Error::GenerationBackend { kind: BackendFailure::Rejected, message: "401".into() };
        assert_ne!(unreachable.user_message(), rejected.user_message());
        assert!(unreachable.user_message().contains("container"));
        assert!(rejected.user_message().contains("API key"));
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(Error::Timeout { operation: "search", after: Duration::from_secs(1) }.is_retryable());
        assert!(Error::IndexUnavailable { index: "i".into(), message: "down".into() }.is_retryable());
        assert!(!Error::GenerationBackend { kind: BackendFailure::Rejected, message: String::new() }.is_retryable());
        assert!(!Error::EmptyInput("sequences").is_retryable());
        assert!(!Error::DimensionMismatch { expected: 3, actual: 2 }.is_retryable());
    }
}
