//! Checklist rubrics and their results.
//!
//! A [`Rubric`] is a fixed, numbered list of yes/no criteria. Evaluating a
//! question against it yields a [`ChecklistResult`] with exactly one
//! [`Verdict`] per item; the aggregate [`ValidationStatus`] is `approved`
//! iff no item is `não`.

pub mod engine;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use engine::{ChecklistEngine, Evaluation};

/// Number of items in the technical-review rubric.
pub const RT_RUBRIC_ITEMS: usize = 8;

/// Number of items in the design-review rubric.
pub const DE_RUBRIC_ITEMS: usize = 15;

/// Verdict for one rubric item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "sim")]
    Sim,
    #[serde(rename = "não")]
    Nao,
    #[serde(rename = "NA")]
    NotApplicable,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Sim => "sim",
            Verdict::Nao => "não",
            Verdict::NotApplicable => "NA",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = String;

    /// Accepts the Portuguese and English spellings models tend to produce.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c == '*')
            .to_lowercase();
        match normalized.as_str() {
            "sim" | "s" | "yes" | "y" | "true" => Ok(Verdict::Sim),
            "não" | "nao" | "no" | "n" | "false" => Ok(Verdict::Nao),
            "na" | "n/a" | "n.a" | "não se aplica" | "nao se aplica" | "not applicable" => {
                Ok(Verdict::NotApplicable)
            }
            _ => Err(format!("unrecognised verdict '{}'", s)),
        }
    }
}

/// Aggregate outcome of one validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Approved,
    Rejected,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Approved => "approved",
            ValidationStatus::Rejected => "rejected",
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, ValidationStatus::Approved)
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Verdict and observation for one rubric item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItemResult {
    pub result: Verdict,
    #[serde(default)]
    pub observation: String,
}

impl ChecklistItemResult {
    pub fn new(result: Verdict, observation: impl Into<String>) -> Self {
        Self {
            result,
            observation: observation.into(),
        }
    }
}

/// Item number (1-based) to verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecklistResult {
    items: BTreeMap<u32, ChecklistItemResult>,
}

impl ChecklistResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: u32, result: ChecklistItemResult) {
        self.items.insert(item, result);
    }

    pub fn get(&self, item: u32) -> Option<&ChecklistItemResult> {
        self.items.get(&item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &ChecklistItemResult)> {
        self.items.iter().map(|(k, v)| (*k, v))
    }

    /// Items whose verdict is `não`, in item order.
    pub fn failed_items(&self) -> Vec<(u32, &ChecklistItemResult)> {
        self.iter()
            .filter(|(_, item)| item.result == Verdict::Nao)
            .collect()
    }

    /// `approved` iff no item is `não`.
    pub fn status(&self) -> ValidationStatus {
        if self.items.values().any(|item| item.result == Verdict::Nao) {
            ValidationStatus::Rejected
        } else {
            ValidationStatus::Approved
        }
    }

    /// Renders the result as the rubric's markdown table.
    pub fn to_markdown_table(&self, rubric: &Rubric) -> String {
        let mut md = String::from("| Nº | Item | Sim | Não | NA | Observação |\n");
        md.push_str("|----|------|-----|-----|----|------------|\n");
        for (number, text) in rubric.numbered_items() {
            let entry = self.get(number);
            let mark = |v: Verdict| {
                if entry.map(|e| e.result) == Some(v) {
                    "X"
                } else {
                    ""
                }
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                number,
                escape_cell(text),
                mark(Verdict::Sim),
                mark(Verdict::Nao),
                mark(Verdict::NotApplicable),
                entry.map(|e| escape_cell(&e.observation)).unwrap_or_default()
            ));
        }
        md
    }
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

/// A fixed, ordered list of review criteria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rubric {
    /// Short rubric name, e.g. "rt" or "de".
    pub name: String,
    /// Display title.
    pub title: String,
    /// Criteria in item order; item `n` is `items[n - 1]`.
    pub items: Vec<String>,
}

impl Rubric {
    pub fn new(name: impl Into<String>, title: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items paired with their 1-based number.
    pub fn numbered_items(&self) -> impl Iterator<Item = (u32, &str)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, text)| (i as u32 + 1, text.as_str()))
    }

    /// Numbered list used inside prompts.
    pub fn to_prompt_list(&self) -> String {
        self.numbered_items()
            .map(|(n, text)| format!("{}. {}", n, text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rubric() -> Rubric {
        Rubric::new(
            "rt",
            "Checklist",
            vec!["Claro?".to_string(), "Correto?".to_string(), "Aplicável?".to_string()],
        )
    }

    #[test]
    fn test_verdict_parsing_aliases() {
        assert_eq!("sim".parse::<Verdict>(), Ok(Verdict::Sim));
        assert_eq!("Yes".parse::<Verdict>(), Ok(Verdict::Sim));
        assert_eq!("NÃO".parse::<Verdict>(), Ok(Verdict::Nao));
        assert_eq!("nao".parse::<Verdict>(), Ok(Verdict::Nao));
        assert_eq!("N/A".parse::<Verdict>(), Ok(Verdict::NotApplicable));
        assert_eq!("\"NA\"".parse::<Verdict>(), Ok(Verdict::NotApplicable));
        assert!("talvez".parse::<Verdict>().is_err());
    }

    #[test]
    fn test_verdict_serde_names() {
        let json = serde_json::to_string(&Verdict::Nao).expect("serialize");
        assert_eq!(json, "\"não\"");
        let back: Verdict = serde_json::from_str("\"NA\"").expect("deserialize");
        assert_eq!(back, Verdict::NotApplicable);
    }

    #[test]
    fn test_status_approved_iff_no_nao() {
        let mut result = ChecklistResult::new();
        result.insert(1, ChecklistItemResult::new(Verdict::Sim, ""));
        result.insert(2, ChecklistItemResult::new(Verdict::NotApplicable, ""));
        assert_eq!(result.status(), ValidationStatus::Approved);

        result.insert(3, ChecklistItemResult::new(Verdict::Nao, "ambíguo"));
        assert_eq!(result.status(), ValidationStatus::Rejected);
        assert_eq!(result.failed_items().len(), 1);
        assert_eq!(result.failed_items()[0].0, 3);
    }

    #[test]
    fn test_empty_result_is_approved() {
        assert_eq!(ChecklistResult::new().status(), ValidationStatus::Approved);
    }

    #[test]
    fn test_serializes_as_map_keyed_by_item() {
        let mut result = ChecklistResult::new();
        result.insert(1, ChecklistItemResult::new(Verdict::Sim, "ok"));
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["1"]["result"], "sim");
        assert_eq!(json["1"]["observation"], "ok");
    }

    #[test]
    fn test_markdown_table_marks_verdicts() {
        let mut result = ChecklistResult::new();
        result.insert(1, ChecklistItemResult::new(Verdict::Sim, ""));
        result.insert(2, ChecklistItemResult::new(Verdict::Nao, "a | b"));
        let table = result.to_markdown_table(&rubric());
        assert!(table.starts_with("| Nº | Item | Sim | Não | NA | Observação |"));
        assert!(table.contains("| 1 | Claro? | X |  |  |  |"));
        assert!(table.contains("| 2 | Correto? |  | X |  | a \\| b |"));
        assert!(table.contains("| 3 | Aplicável? |  |  |  |  |"));
    }

    #[test]
    fn test_rubric_prompt_list() {
        assert_eq!(rubric().to_prompt_list(), "1. Claro?\n2. Correto?\n3. Aplicável?");
    }
}
