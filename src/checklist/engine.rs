//! Rubric evaluation backed by the generation capability.
//!
//! The engine supplies the rubric and the question, asks the model for a
//! per-item verdict, and folds the reply into a [`ChecklistResult`] that
//! always has exactly one verdict per rubric item. Anything the reply does
//! not cover, or covers with an unreadable verdict, becomes `NA` with an
//! observation saying so.

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::{ChecklistItemResult, ChecklistResult, Rubric, ValidationStatus, Verdict};
use crate::error::GenerationError;
use crate::llm::TextGenerator;
use crate::records::Question;
use crate::utils::extract_json;

const CHECKLIST_PROMPT: &str = r#"You are the reviewer responsible for the checklist "{title}".

Evaluate the multiple-choice question below against every checklist item.

CHECKLIST ITEMS:
{items}

QUESTION (JSON):
{question}

REVIEWER NOTES:
{notes}

For each item answer "sim" (criterion met), "não" (criterion not met) or "NA"
(not applicable), with a short observation. Answer "não" only for a real
problem and explain it in the observation.

Respond with a single JSON object and nothing else:
{
  "checklist": {
    "1": {"result": "sim", "observation": "..."},
    "2": {"result": "não", "observation": "..."}
  },
  "comments": "overall assessment"
}
Include every item number from 1 to {count}."#;

/// Outcome of evaluating one question against one rubric.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub checklist: ChecklistResult,
    pub comments: String,
    pub status: ValidationStatus,
    /// Item numbers defaulted to `NA` because the reply did not yield a verdict.
    pub defaulted_items: Vec<u32>,
}

/// Evaluates questions against rubrics.
#[derive(Debug, Clone)]
pub struct ChecklistEngine {
    generator: TextGenerator,
    max_tokens: u32,
}

impl ChecklistEngine {
    pub fn new(generator: TextGenerator, max_tokens: u32) -> Self {
        Self {
            generator,
            max_tokens,
        }
    }

    /// Asks the model to judge `question` against `rubric`.
    ///
    /// Only a generation failure is an error; an unusable reply still yields
    /// an [`Evaluation`] with every item defaulted to `NA`.
    pub async fn evaluate(
        &self,
        rubric: &Rubric,
        question: &Question,
        notes: &[String],
    ) -> Result<Evaluation, GenerationError> {
        let prompt = build_prompt(rubric, question, notes);
        let reply = self.generator.generate(&prompt, self.max_tokens).await?;
        let evaluation = parse_reply(rubric, &reply);

        if !evaluation.defaulted_items.is_empty() {
            warn!(
                rubric = %rubric.name,
                question_id = %question.id,
                defaulted = evaluation.defaulted_items.len(),
                "Checklist items defaulted to NA"
            );
        }
        debug!(
            rubric = %rubric.name,
            question_id = %question.id,
            status = %evaluation.status,
            "Checklist evaluated"
        );
        Ok(evaluation)
    }
}

/// Renders the checklist prompt for `question`.
pub fn build_prompt(rubric: &Rubric, question: &Question, notes: &[String]) -> String {
    let question_json = json!({
        "id": question.id,
        "objective_id": question.objective_id,
        "type": question.question_type,
        "context": question.context,
        "statement": question.statement,
        "assertions": question.assertions,
        "alternatives": question.alternatives,
        "feedback": question.feedback,
    });
    let question_text =
        serde_json::to_string_pretty(&question_json).unwrap_or_else(|_| question_json.to_string());
    let notes_text = if notes.is_empty() {
        "(none)".to_string()
    } else {
        notes
            .iter()
            .map(|n| format!("- {}", n))
            .collect::<Vec<_>>()
            .join("\n")
    };

    CHECKLIST_PROMPT
        .replace("{title}", &rubric.title)
        .replace("{items}", &rubric.to_prompt_list())
        .replace("{question}", &question_text)
        .replace("{notes}", &notes_text)
        .replace("{count}", &rubric.len().to_string())
}

/// Folds a model reply into one verdict per rubric item.
pub fn parse_reply(rubric: &Rubric, reply: &str) -> Evaluation {
    let value = match extract_json(reply) {
        Ok(value) => value,
        Err(e) => {
            let observation = format!("Veredito não extraído da resposta do revisor: {}", e);
            return defaulted_evaluation(rubric, &observation, String::new());
        }
    };

    let comments = value
        .get("comments")
        .or_else(|| value.get("comentarios"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    let items = collect_items(&value);
    let mut checklist = ChecklistResult::new();
    let mut defaulted_items = Vec::new();

    for (number, _) in rubric.numbered_items() {
        let item = match items.iter().find(|(n, _)| *n == number) {
            Some((_, entry)) => parse_item(entry),
            None => Err("Item não avaliado na resposta do revisor".to_string()),
        };
        match item {
            Ok(result) => checklist.insert(number, result),
            Err(observation) => {
                defaulted_items.push(number);
                checklist.insert(
                    number,
                    ChecklistItemResult::new(Verdict::NotApplicable, observation),
                );
            }
        }
    }

    let status = checklist.status();
    Evaluation {
        checklist,
        comments,
        status,
        defaulted_items,
    }
}

fn defaulted_evaluation(rubric: &Rubric, observation: &str, comments: String) -> Evaluation {
    let mut checklist = ChecklistResult::new();
    for (number, _) in rubric.numbered_items() {
        checklist.insert(
            number,
            ChecklistItemResult::new(Verdict::NotApplicable, observation),
        );
    }
    Evaluation {
        status: checklist.status(),
        defaulted_items: rubric.numbered_items().map(|(n, _)| n).collect(),
        checklist,
        comments,
    }
}

/// Pulls `(item number, entry)` pairs out of the reply.
///
/// Accepts `{"checklist": {"1": ...}}`, `{"checklist": [{"item": 1, ...}]}`
/// and a bare numbered object. Keys like `"item1"` or `"Item 1"` count as 1.
/// List entries are numbered by position only when none carries a number;
/// otherwise unnumbered entries are dropped.
fn collect_items(value: &Value) -> Vec<(u32, Value)> {
    let source = value
        .get("checklist")
        .or_else(|| value.get("items"))
        .unwrap_or(value);

    match source {
        Value::Object(map) => object_items(map),
        Value::Array(entries) => {
            let numbered: Vec<(Option<u32>, &Value)> = entries
                .iter()
                .map(|entry| (explicit_number(entry), entry))
                .collect();
            if numbered.iter().all(|(number, _)| number.is_none()) {
                (1u32..).zip(entries.iter().cloned()).collect()
            } else {
                numbered
                    .into_iter()
                    .filter_map(|(number, entry)| number.map(|n| (n, entry.clone())))
                    .collect()
            }
        }
        _ => Vec::new(),
    }
}

fn explicit_number(entry: &Value) -> Option<u32> {
    entry
        .get("item")
        .or_else(|| entry.get("number"))
        .or_else(|| entry.get("id"))
        .and_then(item_number)
}

fn object_items(map: &Map<String, Value>) -> Vec<(u32, Value)> {
    map.iter()
        .filter_map(|(key, entry)| number_from_key(key).map(|n| (n, entry.clone())))
        .collect()
}

fn number_from_key(key: &str) -> Option<u32> {
    let digits: String = key.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn item_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => number_from_key(s),
        _ => None,
    }
}

/// Reads one entry: either `{"result": .., "observation": ..}` or a bare verdict string.
fn parse_item(entry: &Value) -> Result<ChecklistItemResult, String> {
    let (raw, observation) = match entry {
        Value::String(s) => (s.as_str(), ""),
        Value::Object(map) => {
            let raw = map
                .get("result")
                .or_else(|| map.get("resultado"))
                .or_else(|| map.get("verdict"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            let observation = map
                .get("observation")
                .or_else(|| map.get("observacao"))
                .or_else(|| map.get("observação"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            (raw, observation)
        }
        _ => ("", ""),
    };

    match raw.parse::<Verdict>() {
        Ok(verdict) => Ok(ChecklistItemResult::new(verdict, observation.trim())),
        Err(_) => Err(format!(
            "Veredito ilegível ('{}') na resposta do revisor",
            raw
        )),
    }
}
