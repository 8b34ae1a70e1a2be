//! Task workflow state machine.
//!
//! The stage sequence is data ([`Stage::ORDER`]); a task records which stages
//! it has completed in its [`TaskProgress`]. Only code inside
//! `crate::pipeline` can change a progress record, so the coordinator is the
//! single writer of task status.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::records::{LedgerKey, Task};

// ============================================================================
// Stage
// ============================================================================

/// One step of the authoring pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "content")]
    Content,
    #[serde(rename = "rt")]
    TechnicalReview,
    #[serde(rename = "de")]
    DesignReview,
    #[serde(rename = "validator")]
    Validator,
}

impl Stage {
    /// Canonical execution order.
    pub const ORDER: [Stage; 4] = [
        Stage::Content,
        Stage::TechnicalReview,
        Stage::DesignReview,
        Stage::Validator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Content => "content",
            Stage::TechnicalReview => "rt",
            Stage::DesignReview => "de",
            Stage::Validator => "validator",
        }
    }

    /// Long-form name used in reports.
    pub fn title(&self) -> &'static str {
        match self {
            Stage::Content => "Professor Conteudista",
            Stage::TechnicalReview => "Revisor Técnico",
            Stage::DesignReview => "Designer Educacional",
            Stage::Validator => "Validador",
        }
    }

    /// Ledger slot this stage writes on each question, if any.
    pub fn ledger_key(&self) -> Option<LedgerKey> {
        match self {
            Stage::Content => None,
            Stage::TechnicalReview => Some(LedgerKey::Rt),
            Stage::DesignReview => Some(LedgerKey::De),
            Stage::Validator => Some(LedgerKey::Final),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "content" => Ok(Stage::Content),
            "rt" | "technical_review" => Ok(Stage::TechnicalReview),
            "de" | "design_review" => Ok(Stage::DesignReview),
            "validator" | "final" => Ok(Stage::Validator),
            other => Err(format!("unknown stage '{}'", other)),
        }
    }
}

// ============================================================================
// Task status
// ============================================================================

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Created,
    InProgress,
    Completed,
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Created => write!(f, "created"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Workflow position of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProgress {
    status: TaskStatus,
    #[serde(default)]
    completed_stages: Vec<Stage>,
    #[serde(default)]
    running_stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure_reason: Option<String>,
    updated_at: DateTime<Utc>,
}

impl Default for TaskProgress {
    fn default() -> Self {
        Self {
            status: TaskStatus::Created,
            completed_stages: Vec::new(),
            running_stage: None,
            failure_reason: None,
            updated_at: Utc::now(),
        }
    }
}

impl TaskProgress {
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn completed_stages(&self) -> &[Stage] {
        &self.completed_stages
    }

    pub fn running_stage(&self) -> Option<Stage> {
        self.running_stage
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_stage_completed(&self, stage: Stage) -> bool {
        self.completed_stages.contains(&stage)
    }

    /// First stage in [`Stage::ORDER`] not yet completed.
    pub fn next_stage(&self) -> Option<Stage> {
        Stage::ORDER
            .into_iter()
            .find(|stage| !self.is_stage_completed(*stage))
    }

    pub(in crate::pipeline) fn mark_running(&mut self, stage: Stage) {
        self.status = TaskStatus::InProgress;
        self.running_stage = Some(stage);
        self.failure_reason = None;
        self.updated_at = Utc::now();
    }

    pub(in crate::pipeline) fn mark_stage_completed(&mut self, stage: Stage) {
        if !self.is_stage_completed(stage) {
            self.completed_stages.push(stage);
        }
        self.running_stage = None;
        self.status = TaskStatus::InProgress;
        self.updated_at = Utc::now();
    }

    pub(in crate::pipeline) fn mark_completed(&mut self) {
        self.status = TaskStatus::Completed;
        self.running_stage = None;
        self.updated_at = Utc::now();
    }

    pub(in crate::pipeline) fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.running_stage = None;
        self.failure_reason = Some(reason.into());
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// Transition table
// ============================================================================

/// Preconditions for running each stage.
///
/// Transitions:
/// - content: nothing completed
/// - rt, de: content completed and at least one question (either order)
/// - validator: rt and de completed
///
/// A stage never runs twice and a completed task accepts no stage. A failed
/// task accepts its next eligible stage, which is how it recovers.
pub struct StageTransitions {
    prerequisites: HashMap<Stage, Vec<Stage>>,
}

impl StageTransitions {
    pub fn new() -> Self {
        let mut prerequisites = HashMap::new();
        prerequisites.insert(Stage::Content, vec![]);
        prerequisites.insert(Stage::TechnicalReview, vec![Stage::Content]);
        prerequisites.insert(Stage::DesignReview, vec![Stage::Content]);
        prerequisites.insert(
            Stage::Validator,
            vec![Stage::TechnicalReview, Stage::DesignReview],
        );
        Self { prerequisites }
    }

    pub fn prerequisites(&self, stage: Stage) -> &[Stage] {
        self.prerequisites
            .get(&stage)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Checks whether `target` may run next on `task`.
    ///
    /// Returns a human-readable reason when it may not.
    pub fn check(&self, task: &Task, target: Stage) -> Result<(), String> {
        let progress = task.progress();

        if progress.status() == TaskStatus::Completed {
            return Err("task is already completed".to_string());
        }
        if progress.is_stage_completed(target) {
            return Err(format!("stage '{}' has already completed", target));
        }
        if target == Stage::Content && !progress.completed_stages().is_empty() {
            return Err("content can only run on a task with no completed stages".to_string());
        }

        let missing: Vec<&str> = self
            .prerequisites(target)
            .iter()
            .filter(|stage| !progress.is_stage_completed(**stage))
            .map(Stage::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "stage '{}' requires completed stage(s): {}",
                target,
                missing.join(", ")
            ));
        }

        if matches!(target, Stage::TechnicalReview | Stage::DesignReview) && task.questions.is_empty() {
            return Err(format!("stage '{}' requires at least one question", target));
        }

        Ok(())
    }

    /// Stages that may run next, in canonical order.
    pub fn eligible(&self, task: &Task) -> Vec<Stage> {
        Stage::ORDER
            .into_iter()
            .filter(|stage| self.check(task, *stage).is_ok())
            .collect()
    }
}

impl Default for StageTransitions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Status view
// ============================================================================

/// Caller-facing snapshot of a task's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusView {
    pub task_id: String,
    pub status: TaskStatus,
    pub running_stage: Option<Stage>,
    pub completed_stages: Vec<Stage>,
    pub next_stage: Option<Stage>,
    pub questions_count: usize,
    pub approved_count: usize,
    pub reports_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl TaskStatusView {
    pub fn from_task(task: &Task) -> Self {
        let progress = task.progress();
        let next_stage = if progress.status() == TaskStatus::Completed {
            None
        } else {
            progress.next_stage()
        };
        Self {
            task_id: task.id.clone(),
            status: progress.status(),
            running_stage: progress.running_stage(),
            completed_stages: progress.completed_stages().to_vec(),
            next_stage,
            questions_count: task.questions.len(),
            approved_count: task
                .questions
                .iter()
                .filter(|q| q.is_final_approved())
                .count(),
            reports_count: task.reports().len(),
            failure_reason: progress.failure_reason().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::test_support::{sample_question, sample_task};

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::TechnicalReview.as_str(), "rt");
        assert_eq!("de".parse::<Stage>(), Ok(Stage::DesignReview));
        assert_eq!("final".parse::<Stage>(), Ok(Stage::Validator));
        assert!("publish".parse::<Stage>().is_err());
        assert_eq!(
            serde_json::to_string(&Stage::TechnicalReview).expect("serialize"),
            "\"rt\""
        );
    }

    #[test]
    fn test_created_task_accepts_only_content() {
        let task = sample_task();
        let transitions = StageTransitions::new();
        assert_eq!(transitions.eligible(&task), vec![Stage::Content]);
        assert!(transitions.check(&task, Stage::DesignReview).is_err());
        assert!(transitions.check(&task, Stage::Validator).is_err());
    }

    #[test]
    fn test_reviews_in_either_order() {
        let mut task = sample_task();
        task.questions.push(sample_question("Obj.1"));
        task.progress_mut().mark_stage_completed(Stage::Content);

        let transitions = StageTransitions::new();
        assert_eq!(
            transitions.eligible(&task),
            vec![Stage::TechnicalReview, Stage::DesignReview]
        );

        task.progress_mut().mark_stage_completed(Stage::DesignReview);
        assert_eq!(transitions.eligible(&task), vec![Stage::TechnicalReview]);
        assert!(transitions.check(&task, Stage::Validator).is_err());

        task.progress_mut().mark_stage_completed(Stage::TechnicalReview);
        assert_eq!(transitions.eligible(&task), vec![Stage::Validator]);
        assert_eq!(task.progress().next_stage(), Some(Stage::Validator));
    }

    #[test]
    fn test_reviews_require_questions() {
        let mut task = sample_task();
        task.progress_mut().mark_stage_completed(Stage::Content);
        let err = StageTransitions::new()
            .check(&task, Stage::TechnicalReview)
            .unwrap_err();
        assert!(err.contains("at least one question"));
    }

    #[test]
    fn test_completed_task_accepts_nothing() {
        let mut task = sample_task();
        task.progress_mut().mark_completed();
        assert!(StageTransitions::new().eligible(&task).is_empty());
        assert_eq!(TaskStatusView::from_task(&task).next_stage, None);
    }

    #[test]
    fn test_failed_task_accepts_next_stage() {
        let mut task = sample_task();
        task.progress_mut().mark_failed("budget exhausted");
        assert_eq!(task.progress().status(), TaskStatus::Failed);
        assert_eq!(StageTransitions::new().eligible(&task), vec![Stage::Content]);

        task.progress_mut().mark_running(Stage::Content);
        assert_eq!(task.progress().status(), TaskStatus::InProgress);
        assert_eq!(task.progress().failure_reason(), None);
    }

    #[test]
    fn test_progress_serializes_with_task() {
        let mut task = sample_task();
        task.progress_mut().mark_running(Stage::Content);
        let json = serde_json::to_value(&task).expect("serialize");
        assert_eq!(json["progress"]["status"], "in_progress");
        assert_eq!(json["progress"]["running_stage"], "content");

        let back: Task = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back.progress().running_stage(), Some(Stage::Content));
    }

    #[test]
    fn test_status_view() {
        let mut task = sample_task();
        task.questions.push(sample_question("Obj.1"));
        task.progress_mut().mark_stage_completed(Stage::Content);
        let view = TaskStatusView::from_task(&task);
        assert_eq!(view.status, TaskStatus::InProgress);
        assert_eq!(view.completed_stages, vec![Stage::Content]);
        assert_eq!(view.next_stage, Some(Stage::TechnicalReview));
        assert_eq!(view.questions_count, 1);
        assert_eq!(view.approved_count, 0);
    }
}
