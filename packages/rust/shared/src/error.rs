//! Error types for the migration planner.
//!
//! Library crates use [`PlannerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all planner operations.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Knowledge base retrieval error. Never escapes the retriever boundary.
    #[error("retrieval error: {0}")]
    Retrieval(String),

    /// The generative model call failed (credentials, throttling, bad response).
    #[error("generation error: {0}")]
    Generation(String),

    /// Artifact storage error (S3 or local directory).
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (malformed event, missing parameter, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// JSON/CSV encoding or decoding error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PlannerError>;

impl PlannerError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for PlannerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PlannerError::config("S3_BUCKET is not set");
        assert_eq!(err.to_string(), "config error: S3_BUCKET is not set");

        let err = PlannerError::Generation("ThrottlingException".into());
        assert!(err.to_string().starts_with("generation error:"));

        let err = PlannerError::validation("missing parameter app_id");
        assert!(err.to_string().contains("app_id"));
    }

    #[test]
    fn json_errors_become_serialization_errors() {
        let err: PlannerError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, PlannerError::Serialization(_)));
    }
}
