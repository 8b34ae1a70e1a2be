//! Question records and their validation ledger.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::checklist::{ChecklistResult, ValidationStatus};

// ============================================================================
// Question type
// ============================================================================

/// The three supported multiple-choice formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleAnswer,
    MultipleAnswer,
    AssertionReason,
}

impl QuestionType {
    /// Every type, in generation order.
    pub const ALL: [QuestionType; 3] = [
        QuestionType::SingleAnswer,
        QuestionType::MultipleAnswer,
        QuestionType::AssertionReason,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleAnswer => "single_answer",
            QuestionType::MultipleAnswer => "multiple_answer",
            QuestionType::AssertionReason => "assertion_reason",
        }
    }

    /// Human-readable label used in rendered documents.
    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::SingleAnswer => "Resposta Única",
            QuestionType::MultipleAnswer => "Resposta Múltipla",
            QuestionType::AssertionReason => "Asserção-Razão",
        }
    }

    /// Allowed number of correct alternatives for `alternative_count` alternatives.
    pub fn allowed_correct(&self, alternative_count: usize) -> RangeInclusive<usize> {
        match self {
            QuestionType::SingleAnswer | QuestionType::AssertionReason => 1..=1,
            QuestionType::MultipleAnswer => 1..=alternative_count.saturating_sub(1).max(1),
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "single_answer" => Ok(QuestionType::SingleAnswer),
            "multiple_answer" => Ok(QuestionType::MultipleAnswer),
            "assertion_reason" => Ok(QuestionType::AssertionReason),
            other => Err(format!("unknown question type '{}'", other)),
        }
    }
}

// ============================================================================
// Parts
// ============================================================================

/// One answer option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

impl Alternative {
    pub fn new(id: impl Into<String>, text: impl Into<String>, correct: bool) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            correct,
        }
    }
}

/// A numbered statement (I, II, ...) that alternatives refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

/// Authoring metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionMetadata {
    pub created_by: String,
    pub last_modified_by: String,
    pub creation_date: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    /// Restricted words present in the text as generated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restricted_words: Vec<String>,
}

impl QuestionMetadata {
    pub fn new(created_by: &str) -> Self {
        let now = Utc::now();
        Self {
            created_by: created_by.to_string(),
            last_modified_by: created_by.to_string(),
            creation_date: now,
            last_modified: now,
            restricted_words: Vec::new(),
        }
    }

    fn touch(&mut self, modified_by: &str) {
        self.last_modified_by = modified_by.to_string();
        self.last_modified = Utc::now();
    }
}

// ============================================================================
// Validation ledger
// ============================================================================

/// Ledger slot a validation is recorded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKey {
    Rt,
    De,
    Final,
}

impl LedgerKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKey::Rt => "rt",
            LedgerKey::De => "de",
            LedgerKey::Final => "final",
        }
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub status: ValidationStatus,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub checklist: ChecklistResult,
    pub timestamp: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(status: ValidationStatus, comments: impl Into<String>, checklist: ChecklistResult) -> Self {
        Self {
            status,
            comments: comments.into(),
            checklist,
            timestamp: Utc::now(),
        }
    }
}

/// Structural and ledger-ordering violations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QuestionError {
    #[error("Question type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        expected: QuestionType,
        found: QuestionType,
    },

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Expected {expected} alternatives, found {found}")]
    AlternativeCount { expected: usize, found: usize },

    #[error("Duplicate alternative id '{0}'")]
    DuplicateAlternative(String),

    #[error("{question_type} allows {min}..={max} correct alternatives, found {found}")]
    CorrectCount {
        question_type: QuestionType,
        min: usize,
        max: usize,
        found: usize,
    },

    #[error("assertion_reason questions need exactly 2 assertions, found {0}")]
    AssertionCount(usize),

    #[error("Ledger entry '{key}' requires approved rt and de entries")]
    LedgerOrder { key: LedgerKey },

    #[error("Ledger entry '{key}' already recorded")]
    AlreadyRecorded { key: LedgerKey },
}

// ============================================================================
// Question
// ============================================================================

/// Question fields as produced by the content stage, before admission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionDraft {
    #[serde(rename = "type", default)]
    pub question_type: Option<QuestionType>,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub statement: String,
    #[serde(default)]
    pub assertions: Vec<Assertion>,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
    #[serde(default)]
    pub feedback: BTreeMap<String, String>,
}

/// A multiple-choice question with its accumulated validations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub objective_id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub context: String,
    pub statement: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<Assertion>,
    pub alternatives: Vec<Alternative>,
    #[serde(default)]
    pub feedback: BTreeMap<String, String>,
    pub metadata: QuestionMetadata,
    #[serde(default)]
    validation: BTreeMap<LedgerKey, LedgerEntry>,
}

impl Question {
    /// Admits a draft, checking it against the type's structural rules.
    ///
    /// A draft without a `type` is taken to be of `expected_type`.
    pub fn from_draft(
        draft: QuestionDraft,
        objective_id: &str,
        expected_type: QuestionType,
        alternative_count: usize,
        created_by: &str,
    ) -> Result<Self, QuestionError> {
        let question_type = draft.question_type.unwrap_or(expected_type);
        if question_type != expected_type {
            return Err(QuestionError::TypeMismatch {
                expected: expected_type,
                found: question_type,
            });
        }

        let question = Self {
            id: Uuid::new_v4().to_string(),
            objective_id: objective_id.to_string(),
            question_type,
            context: draft.context.trim().to_string(),
            statement: draft.statement.trim().to_string(),
            assertions: draft.assertions,
            alternatives: draft.alternatives,
            feedback: draft.feedback,
            metadata: QuestionMetadata::new(created_by),
            validation: BTreeMap::new(),
        };
        question.check_structure(alternative_count)?;
        Ok(question)
    }

    /// Checks alternative count, id uniqueness and the correct-answer pattern.
    pub fn check_structure(&self, alternative_count: usize) -> Result<(), QuestionError> {
        if self.statement.is_empty() {
            return Err(QuestionError::MissingField("statement"));
        }

        if self.alternatives.len() != alternative_count {
            return Err(QuestionError::AlternativeCount {
                expected: alternative_count,
                found: self.alternatives.len(),
            });
        }

        let mut seen: Vec<&str> = Vec::with_capacity(self.alternatives.len());
        for alternative in &self.alternatives {
            let id = alternative.id.trim();
            if id.is_empty() {
                return Err(QuestionError::MissingField("alternatives[].id"));
            }
            if seen.contains(&id) {
                return Err(QuestionError::DuplicateAlternative(id.to_string()));
            }
            seen.push(id);
        }

        let correct = self.correct_alternatives().len();
        let allowed = self.question_type.allowed_correct(alternative_count);
        if !allowed.contains(&correct) {
            return Err(QuestionError::CorrectCount {
                question_type: self.question_type,
                min: *allowed.start(),
                max: *allowed.end(),
                found: correct,
            });
        }

        if self.question_type == QuestionType::AssertionReason
            && !self.assertions.is_empty()
            && self.assertions.len() != 2
        {
            return Err(QuestionError::AssertionCount(self.assertions.len()));
        }

        Ok(())
    }

    pub fn correct_alternatives(&self) -> Vec<&Alternative> {
        self.alternatives.iter().filter(|a| a.correct).collect()
    }

    /// Issues a final reviewer would block on: empty context or statement,
    /// missing feedback, or no correct alternative.
    pub fn structural_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.context.trim().is_empty() {
            issues.push("Contextualização ausente".to_string());
        }
        if self.statement.trim().is_empty() {
            issues.push("Enunciado ausente".to_string());
        }
        for alternative in &self.alternatives {
            let has_feedback = self
                .feedback
                .get(&alternative.id)
                .is_some_and(|f| !f.trim().is_empty());
            if !has_feedback {
                issues.push(format!("Feedback ausente para a alternativa {}", alternative.id));
            }
        }
        if self.correct_alternatives().is_empty() {
            issues.push("Nenhuma alternativa correta".to_string());
        }
        issues
    }

    /// All authored text, for restricted-word scanning.
    pub fn scannable_text(&self) -> String {
        let mut parts: Vec<&str> = vec![&self.context, &self.statement];
        parts.extend(self.assertions.iter().map(|a| a.text.as_str()));
        parts.extend(self.alternatives.iter().map(|a| a.text.as_str()));
        parts.extend(self.feedback.values().map(String::as_str));
        parts.join("\n")
    }

    // ------------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------------

    pub fn validation(&self) -> &BTreeMap<LedgerKey, LedgerEntry> {
        &self.validation
    }

    pub fn ledger(&self, key: LedgerKey) -> Option<&LedgerEntry> {
        self.validation.get(&key)
    }

    /// Records a validation under `key`.
    ///
    /// Each key is written at most once, and `final` only after approved
    /// `rt` and `de` entries exist.
    pub fn record_validation(
        &mut self,
        key: LedgerKey,
        entry: LedgerEntry,
        modified_by: &str,
    ) -> Result<(), QuestionError> {
        if self.validation.contains_key(&key) {
            return Err(QuestionError::AlreadyRecorded { key });
        }
        if key == LedgerKey::Final && !self.is_eligible_for_final() {
            return Err(QuestionError::LedgerOrder { key });
        }
        self.validation.insert(key, entry);
        self.metadata.touch(modified_by);
        Ok(())
    }

    pub fn is_approved_at(&self, key: LedgerKey) -> bool {
        self.ledger(key).is_some_and(|e| e.status.is_approved())
    }

    /// First ledger key with a rejected entry.
    pub fn rejected_at(&self) -> Option<LedgerKey> {
        self.validation
            .iter()
            .find(|(_, entry)| !entry.status.is_approved())
            .map(|(key, _)| *key)
    }

    /// Excluded questions take no further part in the pipeline.
    pub fn is_excluded(&self) -> bool {
        self.rejected_at().is_some()
    }

    pub fn is_eligible_for_final(&self) -> bool {
        self.is_approved_at(LedgerKey::Rt) && self.is_approved_at(LedgerKey::De)
    }

    /// Final-approved or excluded.
    pub fn is_terminal(&self) -> bool {
        self.ledger(LedgerKey::Final).is_some() || self.is_excluded()
    }

    pub fn is_final_approved(&self) -> bool {
        self.is_approved_at(LedgerKey::Final)
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Renders the question in the layout of its type.
    pub fn to_markdown(&self) -> String {
        let mut md = format!("### Questão ({})\n\n", self.question_type.label());
        md.push_str(&format!("**Contextualização:**\n{}\n\n", self.context));
        md.push_str(&format!("**Enunciado:**\n{}\n\n", self.statement));

        match self.question_type {
            QuestionType::SingleAnswer => {
                md.push_str("**Alternativas:**\n");
            }
            QuestionType::MultipleAnswer => {
                if !self.assertions.is_empty() {
                    md.push_str("**Afirmativas:**\n");
                    for assertion in &self.assertions {
                        md.push_str(&format!("{}. {}\n", assertion.id, assertion.text));
                    }
                    md.push('\n');
                }
                md.push_str("**É correto apenas o que se afirma em:**\n");
            }
            QuestionType::AssertionReason => {
                if let [first, second] = self.assertions.as_slice() {
                    md.push_str(&format!("**Asserção I:**\n{}\n\n", first.text));
                    md.push_str("**PORQUE**\n\n");
                    md.push_str(&format!("**Asserção II:**\n{}\n\n", second.text));
                }
                md.push_str("**A respeito dessas asserções, assinale a opção correta:**\n");
            }
        }

        for alternative in &self.alternatives {
            md.push_str(&format!("{}) {}\n", alternative.id, alternative.text));
        }

        md.push_str("\n**Gabarito:** ");
        let answers: Vec<&str> = self
            .correct_alternatives()
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        md.push_str(&answers.join(", "));
        md.push_str("\n\n**Feedback:**\n");
        for alternative in &self.alternatives {
            if let Some(feedback) = self.feedback.get(&alternative.id) {
                md.push_str(&format!("{}) {}\n", alternative.id, feedback));
            }
        }
        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::{ChecklistItemResult, Verdict};

    fn alternatives(correct: &[&str]) -> Vec<Alternative> {
        ["a", "b", "c", "d", "e"]
            .iter()
            .map(|id| Alternative::new(*id, format!("Alternativa {}", id), correct.contains(id)))
            .collect()
    }

    fn draft(question_type: QuestionType, correct: &[&str]) -> QuestionDraft {
        let alternatives = alternatives(correct);
        let feedback = alternatives
            .iter()
            .map(|a| (a.id.clone(), format!("Justificativa {}", a.id)))
            .collect();
        QuestionDraft {
            question_type: Some(question_type),
            context: "Contexto".to_string(),
            statement: "Enunciado".to_string(),
            assertions: Vec::new(),
            alternatives,
            feedback,
        }
    }

    fn question(question_type: QuestionType) -> Question {
        Question::from_draft(draft(question_type, &["a"]), "Obj.1", question_type, 5, "content")
            .expect("valid draft")
    }

    fn approved() -> LedgerEntry {
        LedgerEntry::new(ValidationStatus::Approved, "", ChecklistResult::new())
    }

    fn rejected() -> LedgerEntry {
        let mut checklist = ChecklistResult::new();
        checklist.insert(1, ChecklistItemResult::new(Verdict::Nao, "ambíguo"));
        LedgerEntry::new(ValidationStatus::Rejected, "ambíguo", checklist)
    }

    #[test]
    fn test_single_answer_requires_exactly_one_correct() {
        let t = QuestionType::SingleAnswer;
        assert!(Question::from_draft(draft(t, &["b"]), "Obj.1", t, 5, "content").is_ok());

        let err = Question::from_draft(draft(t, &["a", "b"]), "Obj.1", t, 5, "content").unwrap_err();
        assert!(matches!(err, QuestionError::CorrectCount { found: 2, .. }));

        let err = Question::from_draft(draft(t, &[]), "Obj.1", t, 5, "content").unwrap_err();
        assert!(matches!(err, QuestionError::CorrectCount { found: 0, .. }));
    }

    #[test]
    fn test_multiple_answer_correct_range() {
        let t = QuestionType::MultipleAnswer;
        assert_eq!(t.allowed_correct(5), 1..=4);
        assert!(Question::from_draft(draft(t, &["a", "c"]), "Obj.1", t, 5, "content").is_ok());
        assert!(Question::from_draft(draft(t, &["a", "b", "c", "d", "e"]), "Obj.1", t, 5, "content").is_err());
        assert!(Question::from_draft(draft(t, &[]), "Obj.1", t, 5, "content").is_err());
    }

    #[test]
    fn test_alternative_count_fixed_by_template() {
        let t = QuestionType::SingleAnswer;
        let mut d = draft(t, &["a"]);
        d.alternatives.pop();
        let err = Question::from_draft(d, "Obj.1", t, 5, "content").unwrap_err();
        assert_eq!(err, QuestionError::AlternativeCount { expected: 5, found: 4 });
    }

    #[test]
    fn test_type_mismatch_and_missing_type() {
        let d = draft(QuestionType::MultipleAnswer, &["a"]);
        let err = Question::from_draft(d, "Obj.1", QuestionType::SingleAnswer, 5, "content").unwrap_err();
        assert!(matches!(err, QuestionError::TypeMismatch { .. }));

        let mut d = draft(QuestionType::SingleAnswer, &["a"]);
        d.question_type = None;
        let q = Question::from_draft(d, "Obj.1", QuestionType::SingleAnswer, 5, "content").expect("valid");
        assert_eq!(q.question_type, QuestionType::SingleAnswer);
    }

    #[test]
    fn test_duplicate_alternative_ids() {
        let t = QuestionType::SingleAnswer;
        let mut d = draft(t, &["a"]);
        d.alternatives[1].id = "a".to_string();
        let err = Question::from_draft(d, "Obj.1", t, 5, "content").unwrap_err();
        assert_eq!(err, QuestionError::DuplicateAlternative("a".to_string()));
    }

    #[test]
    fn test_assertion_reason_assertion_count() {
        let t = QuestionType::AssertionReason;
        let mut d = draft(t, &["b"]);
        d.assertions = vec![Assertion {
            id: "I".to_string(),
            text: "Só uma".to_string(),
            correct: true,
        }];
        let err = Question::from_draft(d, "Obj.1", t, 5, "content").unwrap_err();
        assert_eq!(err, QuestionError::AssertionCount(1));
    }

    #[test]
    fn test_final_requires_approved_rt_and_de() {
        let mut q = question(QuestionType::SingleAnswer);
        assert_eq!(
            q.record_validation(LedgerKey::Final, approved(), "validator"),
            Err(QuestionError::LedgerOrder { key: LedgerKey::Final })
        );

        q.record_validation(LedgerKey::Rt, approved(), "rt").expect("rt");
        assert!(q.record_validation(LedgerKey::Final, approved(), "validator").is_err());

        q.record_validation(LedgerKey::De, approved(), "de").expect("de");
        q.record_validation(LedgerKey::Final, approved(), "validator").expect("final");
        assert!(q.is_final_approved());
        assert!(q.is_terminal());
        assert_eq!(q.metadata.last_modified_by, "validator");
        assert_eq!(q.metadata.created_by, "content");
    }

    #[test]
    fn test_ledger_key_written_once() {
        let mut q = question(QuestionType::SingleAnswer);
        q.record_validation(LedgerKey::Rt, approved(), "rt").expect("rt");
        assert_eq!(
            q.record_validation(LedgerKey::Rt, rejected(), "rt"),
            Err(QuestionError::AlreadyRecorded { key: LedgerKey::Rt })
        );
        assert!(q.is_approved_at(LedgerKey::Rt));
    }

    #[test]
    fn test_rejection_excludes() {
        let mut q = question(QuestionType::SingleAnswer);
        q.record_validation(LedgerKey::De, rejected(), "de").expect("de");
        assert_eq!(q.rejected_at(), Some(LedgerKey::De));
        assert!(q.is_excluded());
        assert!(q.is_terminal());
        assert!(!q.is_eligible_for_final());
    }

    #[test]
    fn test_structural_issues() {
        let mut q = question(QuestionType::SingleAnswer);
        assert!(q.structural_issues().is_empty());
        q.context.clear();
        q.feedback.remove("c");
        let issues = q.structural_issues();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().any(|i| i.contains("alternativa c")));
    }

    #[test]
    fn test_serde_shape() {
        let mut q = question(QuestionType::SingleAnswer);
        q.record_validation(LedgerKey::Rt, approved(), "rt").expect("rt");
        let json = serde_json::to_value(&q).expect("serialize");
        assert_eq!(json["type"], "single_answer");
        assert_eq!(json["validation"]["rt"]["status"], "approved");
        assert!(json.get("assertions").is_none());

        let back: Question = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, q);
    }

    #[test]
    fn test_markdown_layouts() {
        let q = question(QuestionType::SingleAnswer);
        let md = q.to_markdown();
        assert!(md.starts_with("### Questão (Resposta Única)"));
        assert!(md.contains("a) Alternativa a"));
        assert!(md.contains("**Gabarito:** a"));

        let t = QuestionType::AssertionReason;
        let mut d = draft(t, &["b"]);
        d.assertions = vec![
            Assertion { id: "I".to_string(), text: "Primeira".to_string(), correct: true },
            Assertion { id: "II".to_string(), text: "Segunda".to_string(), correct: true },
        ];
        let q = Question::from_draft(d, "Obj.1", t, 5, "content").expect("valid");
        let md = q.to_markdown();
        assert!(md.contains("**Asserção I:**\nPrimeira"));
        assert!(md.contains("**PORQUE**"));
    }

    #[test]
    fn test_question_type_parse() {
        assert_eq!("multiple-answer".parse::<QuestionType>(), Ok(QuestionType::MultipleAnswer));
        assert!("essay".parse::<QuestionType>().is_err());
    }
}
