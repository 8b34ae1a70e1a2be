//! Development and validation reports.
//!
//! Reports are produced once per task by the validator and never modified
//! afterwards; fields are read through accessors only.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::question::{LedgerEntry, LedgerKey, QuestionType};

/// Kind of report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    DevelopmentReport,
    ValidationReport,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::DevelopmentReport => "development_report",
            ReportType::ValidationReport => "validation_report",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ReportType::DevelopmentReport => "Relatório de Desenvolvimento",
            ReportType::ValidationReport => "Relatório de Validação",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What one stage did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportStep {
    pub agent: String,
    pub description: String,
    #[serde(default)]
    pub observations: Vec<String>,
}

impl ReportStep {
    pub fn new(agent: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            description: description.into(),
            observations: Vec::new(),
        }
    }

    pub fn with_observations(mut self, observations: Vec<String>) -> Self {
        self.observations = observations;
        self
    }
}

/// A question excluded from the final document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub question_id: String,
    pub objective_id: String,
    pub stage: LedgerKey,
    pub observations: Vec<String>,
}

/// Ledger outcome of one question, for the validation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: String,
    pub objective_id: String,
    pub question_type: QuestionType,
    pub validation: BTreeMap<LedgerKey, LedgerEntry>,
}

/// Body of a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportContent {
    pub summary: String,
    #[serde(default)]
    pub steps: Vec<ReportStep>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejections: Vec<Rejection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<QuestionOutcome>,
}

/// An immutable report owned by a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    id: String,
    #[serde(rename = "type")]
    report_type: ReportType,
    created_at: DateTime<Utc>,
    created_by: String,
    content: ReportContent,
}

impl Report {
    pub fn new(report_type: ReportType, created_by: impl Into<String>, content: ReportContent) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            report_type,
            created_at: Utc::now(),
            created_by: created_by.into(),
            content,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn report_type(&self) -> ReportType {
        self.report_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn content(&self) -> &ReportContent {
        &self.content
    }

    pub fn to_markdown(&self) -> String {
        let content = &self.content;
        let mut md = format!("# {}\n\n", self.report_type.title());
        md.push_str(&format!(
            "*Gerado por {} em {}*\n\n",
            self.created_by,
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        md.push_str(&format!("## Resumo\n\n{}\n\n", content.summary));

        if !content.steps.is_empty() {
            md.push_str("## Etapas do Processo\n\n");
            for step in &content.steps {
                md.push_str(&format!("### {}\n\n{}\n\n", step.agent, step.description));
                if !step.observations.is_empty() {
                    md.push_str("**Observações:**\n");
                    for observation in &step.observations {
                        md.push_str(&format!("- {}\n", observation));
                    }
                    md.push('\n');
                }
            }
        }

        if !content.rejections.is_empty() {
            md.push_str("## Questões Rejeitadas\n\n");
            for rejection in &content.rejections {
                md.push_str(&format!(
                    "### {} ({}, etapa {})\n\n",
                    rejection.question_id, rejection.objective_id, rejection.stage
                ));
                for observation in &rejection.observations {
                    md.push_str(&format!("- {}\n", observation));
                }
                md.push('\n');
            }
        }

        if !content.outcomes.is_empty() {
            md.push_str("## Resultado por Questão\n\n");
            for outcome in &content.outcomes {
                md.push_str(&format!(
                    "### {} ({}, {})\n\n",
                    outcome.question_id, outcome.objective_id, outcome.question_type
                ));
                for (key, entry) in &outcome.validation {
                    md.push_str(&format!("- **{}**: {}", key, entry.status));
                    if !entry.comments.trim().is_empty() {
                        md.push_str(&format!(" ({})", entry.comments.trim()));
                    }
                    md.push('\n');
                    for (number, item) in entry.checklist.iter() {
                        md.push_str(&format!("  - Item {}: {}", number, item.result));
                        if !item.observation.is_empty() {
                            md.push_str(&format!(". {}", item.observation));
                        }
                        md.push('\n');
                    }
                }
                md.push('\n');
            }
        }

        if !content.recommendations.is_empty() {
            md.push_str("## Recomendações\n\n");
            for recommendation in &content.recommendations {
                md.push_str(&format!("- {}\n", recommendation));
            }
        }

        md
    }
}
