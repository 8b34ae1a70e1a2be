//! quiz_forge: staged authoring and validation of multiple-choice questions.
//!
//! A task moves through four stage agents (content, technical review,
//! design review, validator) driven by the pipeline coordinator. Model
//! output is untrusted text: it is parsed by the extraction utilities and
//! judged against fixed rubrics before anything is committed.

// Core modules
pub mod agents;
pub mod checklist;
pub mod cli;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod records;
pub mod storage;
pub mod template;
pub mod utils;

// Re-export commonly used error types
pub use error::{GenerationError, LlmError, TemplateError};
pub use pipeline::{PipelineCoordinator, PipelineError, Stage, TaskStatus, TaskStatusView};
