//! The stage-agent seam.

use async_trait::async_trait;
use tracing::{info, warn};

use super::error::AgentResult;
use crate::pipeline::state::Stage;
use crate::records::Task;
use crate::utils::RestrictedMatch;

/// Restricted-word check injected into every agent.
///
/// Must be pure: same text and words, same matches.
pub type WordScanner = fn(&str, &[String]) -> Vec<RestrictedMatch>;

/// The default scanner.
pub fn default_scanner() -> WordScanner {
    crate::utils::find_restricted_words::<String>
}

/// Result of running one stage.
#[derive(Debug)]
pub enum StageOutcome {
    /// The stage finished; the mutated task should be committed.
    Advanced(Box<Task>),
    /// The stage may succeed if run again; nothing should be committed.
    RetryableFailure(String),
    /// The stage cannot succeed as things stand.
    FatalFailure(String),
}

impl StageOutcome {
    /// Maps an agent result onto an outcome, classifying errors.
    pub fn from_result(stage: Stage, result: AgentResult<Task>) -> Self {
        match result {
            Ok(task) => {
                info!(task_id = %task.id, stage = %stage, "Stage advanced");
                StageOutcome::Advanced(Box::new(task))
            }
            Err(e) if e.is_retryable() => {
                warn!(stage = %stage, error = %e, "Stage failed, retryable");
                StageOutcome::RetryableFailure(e.to_string())
            }
            Err(e) => {
                warn!(stage = %stage, error = %e, "Stage failed, fatal");
                StageOutcome::FatalFailure(e.to_string())
            }
        }
    }
}

/// One pipeline stage.
///
/// `run` receives an owned copy of the task and hands back the mutated copy
/// inside [`StageOutcome::Advanced`]. A failed run leaves the caller's
/// state untouched.
#[async_trait]
pub trait StageAgent: Send + Sync {
    /// The stage this agent implements.
    fn stage(&self) -> Stage;

    /// Runs the stage over `task`.
    async fn run(&self, task: Task) -> StageOutcome;
}
