//! Validator stage: final ledger entries, reports and the final document.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{info, warn};

use super::error::{AgentError, AgentResult};
use super::prompts::recommendations_prompt;
use super::stage::{StageAgent, StageOutcome};
use crate::checklist::{ChecklistResult, Rubric, ValidationStatus};
use crate::llm::TextGenerator;
use crate::pipeline::state::Stage;
use crate::records::{
    LedgerEntry, LedgerKey, Question, QuestionOutcome, Rejection, Report, ReportContent,
    ReportStep, ReportType, Task,
};
use crate::utils::{extract_markdown_sections, list_items};

/// Closes a task: validates surviving questions and writes the reports.
pub struct ValidatorAgent {
    generator: TextGenerator,
    max_tokens: u32,
    rt_rubric: Rubric,
    de_rubric: Rubric,
}

impl std::fmt::Debug for ValidatorAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorAgent")
            .field("generator", &self.generator)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl ValidatorAgent {
    pub const AGENT_NAME: &'static str = "validator";

    pub fn new(generator: TextGenerator, max_tokens: u32, rt_rubric: Rubric, de_rubric: Rubric) -> Self {
        Self {
            generator,
            max_tokens,
            rt_rubric,
            de_rubric,
        }
    }

    async fn validate(&self, mut task: Task) -> AgentResult<Task> {
        for question in task.questions.iter_mut() {
            if !question.is_eligible_for_final() || question.ledger(LedgerKey::Final).is_some() {
                continue;
            }

            let issues = question.structural_issues();
            let entry = if issues.is_empty() {
                LedgerEntry::new(
                    ValidationStatus::Approved,
                    "Questão aprovada nas revisões técnica e de design educacional.",
                    ChecklistResult::new(),
                )
            } else {
                warn!(
                    question_id = %question.id,
                    issues = issues.len(),
                    "Question failed final structural checks"
                );
                LedgerEntry::new(ValidationStatus::Rejected, issues.join("\n"), ChecklistResult::new())
            };

            let question_id = question.id.clone();
            question
                .record_validation(LedgerKey::Final, entry, Self::AGENT_NAME)
                .map_err(|source| AgentError::Ledger {
                    question_id,
                    source,
                })?;
        }

        let rejections = collect_rejections(&task, &self.rt_rubric, &self.de_rubric);
        let approved = task.approved_questions().len();

        let observations: Vec<String> = rejections
            .iter()
            .flat_map(|r| r.observations.iter().cloned())
            .collect();
        let prompt = recommendations_prompt(task.questions.len(), approved, rejections.len(), &observations);
        let reply = self.generator.generate(&prompt, self.max_tokens).await?;
        let recommendations = parse_recommendations(&reply);

        let development = Report::new(
            ReportType::DevelopmentReport,
            Self::AGENT_NAME,
            ReportContent {
                summary: format!(
                    "{} questões geradas para {} objetivos; {} aprovadas e {} rejeitadas.",
                    task.questions.len(),
                    task.objectives.len(),
                    approved,
                    rejections.len()
                ),
                steps: process_steps(&task),
                recommendations,
                rejections,
                outcomes: Vec::new(),
            },
        );

        let validation = Report::new(
            ReportType::ValidationReport,
            Self::AGENT_NAME,
            ReportContent {
                summary: format!(
                    "{} de {} questões aprovadas na validação final.",
                    approved,
                    task.questions.len()
                ),
                outcomes: task
                    .questions
                    .iter()
                    .map(|q| QuestionOutcome {
                        question_id: q.id.clone(),
                        objective_id: q.objective_id.clone(),
                        question_type: q.question_type,
                        validation: q.validation().clone(),
                    })
                    .collect(),
                ..Default::default()
            },
        );

        let document = render_final_document(&task);
        task.add_report(development);
        task.add_report(validation);
        task.set_final_document(document);

        info!(
            task_id = %task.id,
            approved,
            total = task.questions.len(),
            "Validator stage finished"
        );
        Ok(task)
    }
}

#[async_trait]
impl StageAgent for ValidatorAgent {
    fn stage(&self) -> Stage {
        Stage::Validator
    }

    async fn run(&self, task: Task) -> StageOutcome {
        StageOutcome::from_result(Stage::Validator, self.validate(task).await)
    }
}

/// Rejected questions with the observations that explain the rejection.
fn collect_rejections(task: &Task, rt_rubric: &Rubric, de_rubric: &Rubric) -> Vec<Rejection> {
    task.questions
        .iter()
        .filter_map(|question| {
            let stage = question.rejected_at()?;
            let entry = question.ledger(stage)?;
            let rubric = match stage {
                LedgerKey::Rt => Some(rt_rubric),
                LedgerKey::De => Some(de_rubric),
                LedgerKey::Final => None,
            };
            Some(Rejection {
                question_id: question.id.clone(),
                objective_id: question.objective_id.clone(),
                stage,
                observations: rejection_observations(entry, rubric),
            })
        })
        .collect()
}

fn rejection_observations(entry: &LedgerEntry, rubric: Option<&Rubric>) -> Vec<String> {
    let mut observations: Vec<String> = entry
        .checklist
        .failed_items()
        .into_iter()
        .map(|(number, item)| {
            let criterion = rubric
                .and_then(|r| r.items.get(number as usize - 1))
                .map(|text| format!(" ({})", text))
                .unwrap_or_default();
            if item.observation.is_empty() {
                format!("Item {}{}", number, criterion)
            } else {
                format!("Item {}{}: {}", number, criterion, item.observation)
            }
        })
        .collect();

    if observations.is_empty() && !entry.comments.trim().is_empty() {
        observations.extend(entry.comments.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()));
    }
    observations
}

fn process_steps(task: &Task) -> Vec<ReportStep> {
    let mut steps = vec![ReportStep::new(
        Stage::Content.title(),
        format!(
            "Elaborou {} questões ({} tipos) para {} objetivos de aprendizagem.",
            task.questions.len(),
            task.templates.len(),
            task.objectives.len()
        ),
    )
    .with_observations(
        task.questions
            .iter()
            .filter(|q| !q.metadata.restricted_words.is_empty())
            .map(|q| {
                format!(
                    "Questão {} contém palavras restritas: {}",
                    q.id,
                    q.metadata.restricted_words.join(", ")
                )
            })
            .collect(),
    )];

    for (stage, key) in [
        (Stage::TechnicalReview, LedgerKey::Rt),
        (Stage::DesignReview, LedgerKey::De),
        (Stage::Validator, LedgerKey::Final),
    ] {
        let entries: Vec<(&Question, &LedgerEntry)> = task
            .questions
            .iter()
            .filter_map(|q| q.ledger(key).map(|e| (q, e)))
            .collect();
        let rejected: Vec<String> = entries
            .iter()
            .filter(|(_, e)| !e.status.is_approved())
            .map(|(q, _)| format!("Questão {} rejeitada", q.id))
            .collect();
        steps.push(
            ReportStep::new(
                stage.title(),
                format!(
                    "Avaliou {} questões: {} aprovadas, {} rejeitadas.",
                    entries.len(),
                    entries.len() - rejected.len(),
                    rejected.len()
                ),
            )
            .with_observations(rejected),
        );
    }

    steps
}

/// Reads recommendations from a markdown reply.
///
/// Uses the list under a "Recomendações"/"Recommendations" heading when
/// there is one, otherwise every list item in the reply.
pub fn parse_recommendations(reply: &str) -> Vec<String> {
    let sections = extract_markdown_sections(reply);
    let heading_match = sections.iter().find(|s| {
        let heading = s.heading.to_lowercase();
        heading.contains("recomenda") || heading.contains("recommendation")
    });

    match heading_match {
        Some(section) => list_items(&section.body),
        None => sections.iter().flat_map(|s| list_items(&s.body)).collect(),
    }
}

/// Renders the approved questions grouped by objective.
pub fn render_final_document(task: &Task) -> String {
    let mut by_objective: BTreeMap<&str, Vec<&Question>> = BTreeMap::new();
    for question in task.approved_questions() {
        by_objective
            .entry(question.objective_id.as_str())
            .or_default()
            .push(question);
    }

    let mut md = String::from("# Documento Final de Questões\n\n");
    for objective in &task.objectives {
        md.push_str(&format!("## {}: {}\n\n", objective.id, objective.description));
        match by_objective.get(objective.id.as_str()) {
            Some(questions) => {
                for question in questions {
                    md.push_str(&question.to_markdown());
                    md.push('\n');
                }
            }
            None => md.push_str("_Nenhuma questão aprovada para este objetivo._\n\n"),
        }
    }
    md
}
