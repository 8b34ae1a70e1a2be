//! Review stages: technical review (`rt`) and design review (`de`).
//!
//! Both run the checklist engine with their own rubric over every question
//! that has no entry for the stage yet and has not been rejected elsewhere.
//! A rejection excludes the question; it never fails the stage.

use async_trait::async_trait;
use tracing::{debug, info};

use super::error::{AgentError, AgentResult};
use super::stage::{StageAgent, StageOutcome, WordScanner};
use crate::checklist::{ChecklistEngine, Rubric};
use crate::pipeline::state::Stage;
use crate::records::{LedgerEntry, LedgerKey, Task};
use crate::utils::distinct_words;

/// Checklist-driven reviewer for one review stage.
pub struct ReviewAgent {
    stage: Stage,
    key: LedgerKey,
    rubric: Rubric,
    engine: ChecklistEngine,
    scanner: WordScanner,
}

impl std::fmt::Debug for ReviewAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewAgent")
            .field("stage", &self.stage)
            .field("rubric", &self.rubric.name)
            .field("items", &self.rubric.len())
            .finish_non_exhaustive()
    }
}

impl ReviewAgent {
    /// Technical reviewer (`rt`).
    pub fn technical(engine: ChecklistEngine, rubric: Rubric, scanner: WordScanner) -> Self {
        Self {
            stage: Stage::TechnicalReview,
            key: LedgerKey::Rt,
            rubric,
            engine,
            scanner,
        }
    }

    /// Design reviewer (`de`).
    pub fn design(engine: ChecklistEngine, rubric: Rubric, scanner: WordScanner) -> Self {
        Self {
            stage: Stage::DesignReview,
            key: LedgerKey::De,
            rubric,
            engine,
            scanner,
        }
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    async fn review(&self, mut task: Task) -> AgentResult<Task> {
        let mut reviewed = 0usize;
        let mut rejected = 0usize;

        for question in task.questions.iter_mut() {
            if question.ledger(self.key).is_some() || question.is_excluded() {
                debug!(
                    question_id = %question.id,
                    stage = %self.stage,
                    "Skipping question already reviewed or excluded"
                );
                continue;
            }

            let matches = (self.scanner)(&question.scannable_text(), &task.restricted_words);
            let notes: Vec<String> = distinct_words(&matches)
                .into_iter()
                .map(|word| format!("Palavra restrita encontrada: \"{}\"", word))
                .collect();

            let evaluation = self.engine.evaluate(&self.rubric, question, &notes).await?;

            let mut comments = evaluation.comments.clone();
            for note in &notes {
                if !comments.is_empty() {
                    comments.push('\n');
                }
                comments.push_str(note);
            }

            if !evaluation.status.is_approved() {
                rejected += 1;
            }
            reviewed += 1;

            let entry = LedgerEntry::new(evaluation.status, comments, evaluation.checklist);
            let question_id = question.id.clone();
            question
                .record_validation(self.key, entry, self.stage.as_str())
                .map_err(|source| AgentError::Ledger {
                    question_id,
                    source,
                })?;
        }

        info!(
            task_id = %task.id,
            stage = %self.stage,
            reviewed,
            rejected,
            "Review stage finished"
        );
        Ok(task)
    }
}

#[async_trait]
impl StageAgent for ReviewAgent {
    fn stage(&self) -> Stage {
        self.stage
    }

    async fn run(&self, task: Task) -> StageOutcome {
        StageOutcome::from_result(self.stage, self.review(task).await)
    }
}
