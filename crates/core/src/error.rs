//! Error types for IAMSage.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, embedding, LLM, knowledge base,
//! prompt and serialization errors.

use thiserror::Error;

/// Unified error type for IAMSage.
///
/// All library functions return `Result<T, AppError>`.
/// We never panic; errors are represented and propagated to the caller.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Hosted LLM errors (network, auth, quota)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding model errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Knowledge base, index and artifact errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error should stop the process rather than a single query.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_fatal() {
        assert!(AppError::Config("missing key".to_string()).is_fatal());
        assert!(!AppError::Llm("quota".to_string()).is_fatal());
        assert!(!AppError::Knowledge("empty".to_string()).is_fatal());
    }

    #[test]
    fn test_serde_json_conversion() {
        let err = serde_json::from_str::<Vec<u32>>("not json").unwrap_err();
        let app: AppError = err.into();
        assert!(matches!(app, AppError::Serialization(_)));
    }

    #[test]
    fn test_display_prefixes() {
        let err = AppError::Embedding("model not found".to_string());
        assert_eq!(err.to_string(), "Embedding error: model not found");
    }
}
