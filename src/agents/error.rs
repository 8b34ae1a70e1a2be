//! Error types for stage agents.
//!
//! Each variant is classified as retryable or fatal; the classification
//! decides which [`super::StageOutcome`] a failed stage reports.

use thiserror::Error;

use crate::error::GenerationError;
use crate::records::{QuestionError, QuestionType};
use crate::utils::ExtractionError;

/// Errors that can occur while a stage agent runs.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The generation capability failed or timed out.
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// The reply for one objective/type pair held no usable question.
    #[error("Could not extract a {question_type} question for {objective_id}: {source}")]
    Extraction {
        objective_id: String,
        question_type: QuestionType,
        #[source]
        source: ExtractionError,
    },

    /// An extracted question broke its type's structural rules.
    #[error("Generated {question_type} question for {objective_id} is invalid: {source}")]
    InvalidQuestion {
        objective_id: String,
        question_type: QuestionType,
        #[source]
        source: QuestionError,
    },

    /// A ledger write was refused.
    #[error("Ledger update refused for question {question_id}: {source}")]
    Ledger {
        question_id: String,
        #[source]
        source: QuestionError,
    },

    /// The task lacks inputs the stage needs.
    #[error("Task is missing required input: {0}")]
    MissingInput(String),
}

impl AgentError {
    /// Whether running the same stage again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::Generation(_)
                | AgentError::Extraction { .. }
                | AgentError::InvalidQuestion { .. }
        )
    }
}

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AgentError::Generation(GenerationError::Timeout { seconds: 5 }).is_retryable());
        assert!(AgentError::Extraction {
            objective_id: "Obj.1".to_string(),
            question_type: QuestionType::SingleAnswer,
            source: ExtractionError::NotFound {
                content_preview: String::new()
            },
        }
        .is_retryable());
        assert!(!AgentError::MissingInput("objectives".to_string()).is_retryable());
        assert!(!AgentError::Ledger {
            question_id: "q".to_string(),
            source: QuestionError::MissingField("statement"),
        }
        .is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = AgentError::Generation(GenerationError::Timeout { seconds: 120 });
        assert_eq!(
            err.to_string(),
            "Generation failed: Generation timed out after 120 seconds"
        );
    }
}
