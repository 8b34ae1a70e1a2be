//! Error types for quiz-forge operations.
//!
//! Defines the error types shared by more than one subsystem:
//! - LLM transport failures
//! - Generation capability failures (unavailable / timed out)
//! - Template and rubric loading

use thiserror::Error;

/// Errors that can occur while talking to an LLM endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API base URL: LLM_API_BASE environment variable not set")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Empty completion returned by model '{0}'")]
    EmptyCompletion(String),
}

/// Failures of the generation capability as seen by the pipeline.
///
/// Both variants are retryable: the stage that hit them can be invoked again
/// without side effects beyond what was already committed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    /// Network, authentication or provider error.
    #[error("Generation unavailable: {0}")]
    Unavailable(String),

    /// The provider did not answer within the configured bound.
    #[error("Generation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        GenerationError::Unavailable(err.to_string())
    }
}

/// Errors that can occur while loading question templates and rubrics.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Unknown question type '{0}'")]
    UnknownQuestionType(String),

    #[error("Rubric '{name}' must have {expected} items, found {found}")]
    RubricSize {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Failed to parse template file '{path}': {message}")]
    ParseError { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
