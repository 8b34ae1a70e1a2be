//! Pipeline coordinator.
//!
//! The coordinator is the only writer of task progress. Each operation on a
//! task runs under that task's lock for the whole load, run and save
//! sequence, so two callers never run stages of the same task at once.
//! Different tasks never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use super::config::PipelineConfig;
use super::state::{Stage, StageTransitions, TaskStatus, TaskStatusView};
use crate::agents::{
    default_scanner, ContentAgent, ReviewAgent, StageAgent, StageOutcome, ValidatorAgent,
};
use crate::checklist::ChecklistEngine;
use crate::llm::{LlmProvider, TextGenerator};
use crate::records::{Question, QuestionType, Report, Task};
use crate::storage::{StorageError, TaskStore};
use crate::template::{TemplateLoader, TemplateSet};
use crate::utils::{extract_objectives, Objective};

/// Errors returned by coordinator operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The requested stage is not runnable now. Nothing was changed.
    #[error("Stage '{stage}' cannot run on task {task_id}: {reason}")]
    OutOfOrderStage {
        task_id: String,
        stage: Stage,
        reason: String,
    },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// The stage failed but may succeed if invoked again.
    #[error("Stage '{stage}' failed and can be retried: {reason}")]
    Retryable { stage: Stage, reason: String },

    /// The stage failed for good; the task is now `failed`.
    #[error("Stage '{stage}' failed: {reason}")]
    Fatal { stage: Stage, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// `run_all` refuses failed tasks; recovery is a manual `advance`.
    #[error("Task {task_id} has failed: {reason}")]
    TaskFailed { task_id: String, reason: String },
}

/// What a caller gets back from `results`.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResults {
    pub status: TaskStatusView,
    pub approved_questions: Vec<Question>,
    pub reports: Vec<Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_document: Option<String>,
}

impl TaskResults {
    fn from_task(task: &Task) -> Self {
        Self {
            status: TaskStatusView::from_task(task),
            approved_questions: task.approved_questions().into_iter().cloned().collect(),
            reports: task.reports().to_vec(),
            final_document: task.final_document().map(str::to_string),
        }
    }
}

/// Failure of one stage execution, after persistence was handled.
enum StageFailure {
    Retryable(String),
    Fatal(String),
}

type TaskLock = Arc<tokio::sync::Mutex<()>>;

/// Drives tasks through content, rt, de and validator.
pub struct PipelineCoordinator {
    store: Arc<dyn TaskStore>,
    agents: HashMap<Stage, Arc<dyn StageAgent>>,
    transitions: StageTransitions,
    templates: TemplateSet,
    max_stage_attempts: u32,
    locks: Mutex<HashMap<String, TaskLock>>,
}

impl std::fmt::Debug for PipelineCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut stages: Vec<&Stage> = self.agents.keys().collect();
        stages.sort();
        f.debug_struct("PipelineCoordinator")
            .field("stages", &stages)
            .field("max_stage_attempts", &self.max_stage_attempts)
            .finish_non_exhaustive()
    }
}

impl PipelineCoordinator {
    /// Wires the default agents from `config` around one provider.
    ///
    /// Templates come from `config.templates_dir` when set, otherwise the
    /// built-ins are used.
    pub fn from_config(
        config: &PipelineConfig,
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn TaskStore>,
    ) -> Result<Self, PipelineError> {
        config
            .validate()
            .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;

        let templates = match &config.templates_dir {
            Some(dir) => TemplateLoader::new(dir)
                .load()
                .map_err(|e| PipelineError::InvalidInput(e.to_string()))?,
            None => TemplateSet::builtin(),
        };

        let generator = TextGenerator::new(provider, config.generation_timeout)
            .with_temperature(config.temperature);
        let scanner = default_scanner();
        let engine = ChecklistEngine::new(generator.clone(), config.review_max_tokens);

        PipelineCoordinatorBuilder::new()
            .store(store)
            .agent(Arc::new(ContentAgent::new(
                generator.clone(),
                config.content_max_tokens,
                scanner,
            )))
            .agent(Arc::new(ReviewAgent::technical(
                engine.clone(),
                templates.rt_rubric.clone(),
                scanner,
            )))
            .agent(Arc::new(ReviewAgent::design(
                engine,
                templates.de_rubric.clone(),
                scanner,
            )))
            .agent(Arc::new(ValidatorAgent::new(
                generator,
                config.validator_max_tokens,
                templates.rt_rubric.clone(),
                templates.de_rubric.clone(),
            )))
            .templates(templates)
            .max_stage_attempts(config.max_stage_attempts)
            .build()
    }

    /// Templates, rubrics and restricted words used for new tasks.
    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    // ========================================================================
    // Caller-facing operations
    // ========================================================================

    /// Creates a task from free-text objectives ("Obj.1: ...").
    pub async fn create_task(
        &self,
        objectives_text: &str,
        theory: &str,
        question_types: &[QuestionType],
    ) -> Result<TaskStatusView, PipelineError> {
        let objectives = extract_objectives(objectives_text)
            .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;
        self.create_task_with_objectives(objectives, theory, question_types)
            .await
    }

    /// Creates a task from already-parsed objectives.
    pub async fn create_task_with_objectives(
        &self,
        objectives: Vec<Objective>,
        theory: &str,
        question_types: &[QuestionType],
    ) -> Result<TaskStatusView, PipelineError> {
        if objectives.is_empty() {
            return Err(PipelineError::InvalidInput(
                "at least one learning objective is required".to_string(),
            ));
        }
        if theory.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "theory text must not be empty".to_string(),
            ));
        }
        if question_types.is_empty() {
            return Err(PipelineError::InvalidInput(
                "at least one question type is required".to_string(),
            ));
        }

        let templates = self
            .templates
            .select(question_types)
            .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;
        let task = Task::new(
            objectives,
            theory.trim(),
            templates,
            self.templates.restricted_words.clone(),
        );
        self.store.save_task(&task).await?;

        info!(
            task_id = %task.id,
            objectives = task.objectives.len(),
            question_types = task.templates.len(),
            "Task created"
        );
        Ok(TaskStatusView::from_task(&task))
    }

    /// Runs exactly `target` on the task if it is runnable now.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::OutOfOrderStage`] if the transition table refuses
    ///   `target`; nothing is changed
    /// - [`PipelineError::Retryable`] if the stage may succeed on a later
    ///   call; the task is left as it was
    /// - [`PipelineError::Fatal`] if the stage failed for good; the task is
    ///   marked `failed`
    pub async fn advance(&self, task_id: &str, target: Stage) -> Result<TaskStatusView, PipelineError> {
        let _guard = self.lock_task(task_id).await;

        let task = self.load(task_id).await?;
        self.transitions
            .check(&task, target)
            .map_err(|reason| PipelineError::OutOfOrderStage {
                task_id: task_id.to_string(),
                stage: target,
                reason,
            })?;

        match self.execute(task, target).await {
            Ok(task) => Ok(TaskStatusView::from_task(&task)),
            Err(StageFailure::Retryable(reason)) => Err(PipelineError::Retryable {
                stage: target,
                reason,
            }),
            Err(StageFailure::Fatal(reason)) => Err(PipelineError::Fatal {
                stage: target,
                reason,
            }),
        }
    }

    /// Runs the remaining stages in order until the task completes.
    ///
    /// Each stage is attempted up to `max_stage_attempts` times; running out
    /// of attempts fails the task. Completed stages are never re-run.
    pub async fn run_all(&self, task_id: &str) -> Result<TaskStatusView, PipelineError> {
        let _guard = self.lock_task(task_id).await;

        let mut task = self.load(task_id).await?;
        loop {
            match task.progress().status() {
                TaskStatus::Completed => return Ok(TaskStatusView::from_task(&task)),
                TaskStatus::Failed => {
                    return Err(PipelineError::TaskFailed {
                        task_id: task.id.clone(),
                        reason: task
                            .progress()
                            .failure_reason()
                            .unwrap_or("unknown")
                            .to_string(),
                    })
                }
                TaskStatus::Created | TaskStatus::InProgress => {}
            }

            let Some(stage) = task.progress().next_stage() else {
                return Ok(TaskStatusView::from_task(&task));
            };
            if let Err(reason) = self.transitions.check(&task, stage) {
                let reason = format!("cannot continue with stage '{}': {}", stage, reason);
                self.fail(task, &reason).await;
                return Err(PipelineError::Fatal { stage, reason });
            }

            task = self.run_with_retries(task, stage).await?;
        }
    }

    /// Current status of a task.
    pub async fn status(&self, task_id: &str) -> Result<TaskStatusView, PipelineError> {
        let task = self.load(task_id).await?;
        Ok(TaskStatusView::from_task(&task))
    }

    /// Approved questions, reports and final document of a task.
    pub async fn results(&self, task_id: &str) -> Result<TaskResults, PipelineError> {
        let task = self.load(task_id).await?;
        Ok(TaskResults::from_task(&task))
    }

    /// Loads the full task record.
    pub async fn task(&self, task_id: &str) -> Result<Task, PipelineError> {
        self.load(task_id).await
    }

    // ========================================================================
    // Stage execution
    // ========================================================================

    async fn run_with_retries(&self, mut task: Task, stage: Stage) -> Result<Task, PipelineError> {
        let mut last_reason = String::new();

        for attempt in 1..=self.max_stage_attempts {
            info!(task_id = %task.id, stage = %stage, attempt, "Running stage");
            match self.execute(task.clone(), stage).await {
                Ok(next) => return Ok(next),
                Err(StageFailure::Fatal(reason)) => {
                    return Err(PipelineError::Fatal { stage, reason });
                }
                Err(StageFailure::Retryable(reason)) => {
                    warn!(
                        task_id = %task.id,
                        stage = %stage,
                        attempt,
                        max_attempts = self.max_stage_attempts,
                        reason = %reason,
                        "Stage attempt failed"
                    );
                    last_reason = reason;
                    // The retryable path restored the stored copy.
                    task = self.load(&task.id).await?;
                    tokio::time::sleep(retry_backoff(attempt)).await;
                }
            }
        }

        let reason = format!(
            "stage '{}' failed after {} attempts: {}",
            stage, self.max_stage_attempts, last_reason
        );
        self.fail(task, &reason).await;
        Err(PipelineError::Fatal { stage, reason })
    }

    /// Runs one stage and commits its outcome.
    ///
    /// The task is persisted as running before the agent is invoked. On
    /// success the agent's task is committed with the stage recorded; on a
    /// retryable failure the original task is restored; on a fatal failure
    /// the original task is marked failed.
    async fn execute(&self, task: Task, stage: Stage) -> Result<Task, StageFailure> {
        let Some(agent) = self.agents.get(&stage).cloned() else {
            let reason = format!("no agent registered for stage '{}'", stage);
            return Err(self.fail(task, &reason).await);
        };

        let mut running = task.clone();
        running.progress_mut().mark_running(stage);
        if let Err(e) = self.store.save_task(&running).await {
            let reason = format!("could not persist running state: {}", e);
            return Err(self.fail(task, &reason).await);
        }

        match agent.run(running).await {
            StageOutcome::Advanced(next) => {
                let mut next = *next;
                next.progress_mut().mark_stage_completed(stage);

                if stage == Stage::Validator {
                    if !next.all_questions_terminal() || next.final_document().is_none() {
                        let reason = "validator finished without a terminal state for every question"
                            .to_string();
                        return Err(self.fail(task, &reason).await);
                    }
                    next.progress_mut().mark_completed();
                }

                if let Err(e) = self.store.save_task(&next).await {
                    let reason = format!("could not persist stage result: {}", e);
                    return Err(self.fail(task, &reason).await);
                }

                info!(
                    task_id = %next.id,
                    stage = %stage,
                    status = %next.progress().status(),
                    questions = next.questions.len(),
                    "Stage committed"
                );
                Ok(next)
            }
            StageOutcome::RetryableFailure(reason) => {
                if let Err(e) = self.store.save_task(&task).await {
                    let reason = format!("could not restore task after '{}': {}", reason, e);
                    return Err(self.fail(task, &reason).await);
                }
                Err(StageFailure::Retryable(reason))
            }
            StageOutcome::FatalFailure(reason) => Err(self.fail(task, &reason).await),
        }
    }

    /// Marks `task` failed and persists it, keeping earlier stage work.
    async fn fail(&self, mut task: Task, reason: &str) -> StageFailure {
        task.progress_mut().mark_failed(reason);
        error!(task_id = %task.id, reason = %reason, "Task failed");
        if let Err(e) = self.store.save_task(&task).await {
            error!(task_id = %task.id, error = %e, "Could not persist failed state");
        }
        StageFailure::Fatal(reason.to_string())
    }

    async fn load(&self, task_id: &str) -> Result<Task, PipelineError> {
        self.store.load_task(task_id).await.map_err(|e| match e {
            StorageError::NotFound(id) => PipelineError::TaskNotFound(id),
            StorageError::InvalidId(id) => PipelineError::InvalidInput(format!("invalid task id: {:?}", id)),
            other => PipelineError::Storage(other),
        })
    }

    async fn lock_task(&self, task_id: &str) -> TaskLockGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks
                .entry(task_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        let guard = lock.clone().lock_owned().await;
        TaskLockGuard {
            registry: &self.locks,
            task_id: task_id.to_string(),
            lock,
            guard: Some(guard),
        }
    }
}

/// Holds a task's lock; drops the registry entry once nobody else waits on it.
struct TaskLockGuard<'a> {
    registry: &'a Mutex<HashMap<String, TaskLock>>,
    task_id: String,
    lock: TaskLock,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for TaskLockGuard<'_> {
    fn drop(&mut self) {
        // The guard owns a clone of the lock; release it before counting.
        self.guard.take();
        let mut locks = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let unused = locks
            .get(&self.task_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &self.lock) && Arc::strong_count(entry) == 2);
        if unused {
            locks.remove(&self.task_id);
        }
    }
}

fn retry_backoff(attempt: u32) -> Duration {
    Duration::from_millis(200 * u64::from(attempt))
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`PipelineCoordinator`].
pub struct PipelineCoordinatorBuilder {
    store: Option<Arc<dyn TaskStore>>,
    agents: HashMap<Stage, Arc<dyn StageAgent>>,
    templates: TemplateSet,
    max_stage_attempts: u32,
}

impl PipelineCoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            agents: HashMap::new(),
            templates: TemplateSet::builtin(),
            max_stage_attempts: 3,
        }
    }

    /// Sets the task store.
    pub fn store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Registers an agent for the stage it reports.
    pub fn agent(mut self, agent: Arc<dyn StageAgent>) -> Self {
        self.agents.insert(agent.stage(), agent);
        self
    }

    /// Sets the templates used for new tasks.
    pub fn templates(mut self, templates: TemplateSet) -> Self {
        self.templates = templates;
        self
    }

    /// Sets the attempts per stage in `run_all`.
    pub fn max_stage_attempts(mut self, attempts: u32) -> Self {
        self.max_stage_attempts = attempts;
        self
    }

    /// Builds the coordinator.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidInput`] if the store or an agent for any
    /// stage is missing, or the retry budget is zero.
    pub fn build(self) -> Result<PipelineCoordinator, PipelineError> {
        let store = self
            .store
            .ok_or_else(|| PipelineError::InvalidInput("task store is required".to_string()))?;

        let missing: Vec<&str> = Stage::ORDER
            .iter()
            .filter(|stage| !self.agents.contains_key(*stage))
            .map(Stage::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::InvalidInput(format!(
                "no agent registered for stage(s): {}",
                missing.join(", ")
            )));
        }

        if self.max_stage_attempts == 0 {
            return Err(PipelineError::InvalidInput(
                "max_stage_attempts must be greater than 0".to_string(),
            ));
        }

        Ok(PipelineCoordinator {
            store,
            agents: self.agents,
            transitions: StageTransitions::new(),
            templates: self.templates,
            max_stage_attempts: self.max_stage_attempts,
            locks: Mutex::new(HashMap::new()),
        })
    }
}

impl Default for PipelineCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
