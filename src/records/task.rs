//! Task records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::question::{Question, QuestionType};
use super::report::{Report, ReportType};
use crate::pipeline::state::TaskProgress;
use crate::template::QuestionTemplate;
use crate::utils::Objective;

/// One workflow run: inputs, generated questions, reports and progress.
///
/// The task owns its questions and reports. Progress is read through
/// [`Task::progress`] and written only by the pipeline coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub objectives: Vec<Objective>,
    pub theory: String,
    /// Question types to generate, with their templates.
    pub templates: BTreeMap<QuestionType, QuestionTemplate>,
    pub restricted_words: Vec<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    reports: Vec<Report>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    final_document: Option<String>,
    progress: TaskProgress,
}

impl Task {
    pub fn new(
        objectives: Vec<Objective>,
        theory: impl Into<String>,
        templates: BTreeMap<QuestionType, QuestionTemplate>,
        restricted_words: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            objectives,
            theory: theory.into(),
            templates,
            restricted_words,
            questions: Vec::new(),
            reports: Vec::new(),
            final_document: None,
            progress: TaskProgress::default(),
        }
    }

    pub fn progress(&self) -> &TaskProgress {
        &self.progress
    }

    pub(crate) fn progress_mut(&mut self) -> &mut TaskProgress {
        &mut self.progress
    }

    pub fn question_types(&self) -> Vec<QuestionType> {
        self.templates.keys().copied().collect()
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Questions that passed the final validation, in creation order.
    pub fn approved_questions(&self) -> Vec<&Question> {
        self.questions.iter().filter(|q| q.is_final_approved()).collect()
    }

    pub fn all_questions_terminal(&self) -> bool {
        self.questions.iter().all(Question::is_terminal)
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn report(&self, report_type: ReportType) -> Option<&Report> {
        self.reports.iter().find(|r| r.report_type() == report_type)
    }

    /// Appends a report. Reports are never replaced or removed.
    pub fn add_report(&mut self, report: Report) {
        self.reports.push(report);
    }

    pub fn final_document(&self) -> Option<&str> {
        self.final_document.as_deref()
    }

    pub fn set_final_document(&mut self, document: String) {
        self.final_document = Some(document);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::test_support::{sample_question, sample_task};
    use crate::records::ReportContent;

    #[test]
    fn test_new_task_is_created_with_unique_id() {
        let a = sample_task();
        let b = sample_task();
        assert_ne!(a.id, b.id);
        assert_eq!(
            a.progress().status(),
            crate::pipeline::state::TaskStatus::Created
        );
        assert!(a.questions.is_empty());
        assert!(a.final_document().is_none());
    }

    #[test]
    fn test_question_types_follow_templates() {
        let task = sample_task();
        assert_eq!(task.question_types(), QuestionType::ALL.to_vec());
    }

    #[test]
    fn test_reports_append_only() {
        let mut task = sample_task();
        task.add_report(Report::new(
            ReportType::DevelopmentReport,
            "validator",
            ReportContent::default(),
        ));
        assert_eq!(task.reports().len(), 1);
        assert!(task.report(ReportType::DevelopmentReport).is_some());
        assert!(task.report(ReportType::ValidationReport).is_none());
    }

    #[test]
    fn test_terminal_check_over_questions() {
        let mut task = sample_task();
        assert!(task.all_questions_terminal());
        task.questions.push(sample_question("Obj.1"));
        assert!(!task.all_questions_terminal());
    }

    #[test]
    fn test_json_round_trip() {
        let mut task = sample_task();
        task.questions.push(sample_question("Obj.1"));
        task.set_final_document("# Documento".to_string());
        let json = serde_json::to_string(&task).expect("serialize");
        let back: Task = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, task);
    }
}
