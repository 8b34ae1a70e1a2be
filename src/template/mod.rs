//! Question templates and review rubrics.
//!
//! A [`TemplateSet`] bundles everything the stage agents treat as fixed
//! configuration: one [`QuestionTemplate`] per question type, the two review
//! rubrics and the restricted-word list. [`TemplateSet::builtin`] needs no
//! files; [`TemplateLoader`] overlays whatever a templates directory supplies.
//!
//! ```ignore
//! use quiz_forge::template::TemplateLoader;
//!
//! let set = TemplateLoader::new("templates/").load()?;
//! assert_eq!(set.rt_rubric.len(), 8);
//! ```

pub mod builtin;
pub mod loader;

pub use loader::TemplateLoader;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::checklist::{Rubric, DE_RUBRIC_ITEMS, RT_RUBRIC_ITEMS};
use crate::error::TemplateError;
use crate::records::QuestionType;
use crate::utils::default_restricted_words;

/// Generation template for one question type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionTemplate {
    /// Example JSON shown to the model.
    pub body: String,
    /// Number of alternatives every question of this type must have.
    pub alternative_count: usize,
}

impl QuestionTemplate {
    /// Parses a template body, taking the alternative count from its
    /// `alternatives` array.
    pub fn from_body(source: &str, body: impl Into<String>) -> Result<Self, TemplateError> {
        let body = body.into();
        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| TemplateError::ParseError {
                path: source.to_string(),
                message: e.to_string(),
            })?;

        let alternative_count = value
            .get("alternatives")
            .and_then(|a| a.as_array())
            .map(Vec::len)
            .filter(|n| *n >= 2)
            .ok_or_else(|| TemplateError::ParseError {
                path: source.to_string(),
                message: "template needs an 'alternatives' array with at least 2 entries"
                    .to_string(),
            })?;

        Ok(Self {
            body,
            alternative_count,
        })
    }
}

/// Templates, rubrics and restricted words for a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSet {
    pub templates: BTreeMap<QuestionType, QuestionTemplate>,
    pub rt_rubric: Rubric,
    pub de_rubric: Rubric,
    pub restricted_words: Vec<String>,
}

impl TemplateSet {
    /// The compiled-in templates and rubrics.
    pub fn builtin() -> Self {
        let mut templates = BTreeMap::new();
        for (question_type, body) in [
            (QuestionType::SingleAnswer, builtin::SINGLE_ANSWER_TEMPLATE),
            (QuestionType::MultipleAnswer, builtin::MULTIPLE_ANSWER_TEMPLATE),
            (QuestionType::AssertionReason, builtin::ASSERTION_REASON_TEMPLATE),
        ] {
            templates.insert(
                question_type,
                QuestionTemplate {
                    body: body.to_string(),
                    alternative_count: 5,
                },
            );
        }

        Self {
            templates,
            rt_rubric: Rubric::new(
                "rt",
                builtin::RT_RUBRIC_TITLE,
                builtin::RT_RUBRIC.iter().map(|s| s.to_string()).collect(),
            ),
            de_rubric: Rubric::new(
                "de",
                builtin::DE_RUBRIC_TITLE,
                builtin::DE_RUBRIC.iter().map(|s| s.to_string()).collect(),
            ),
            restricted_words: default_restricted_words(),
        }
    }

    /// Checks rubric sizes.
    pub fn validate(&self) -> Result<(), TemplateError> {
        check_rubric_size(&self.rt_rubric, RT_RUBRIC_ITEMS)?;
        check_rubric_size(&self.de_rubric, DE_RUBRIC_ITEMS)?;
        Ok(())
    }

    /// Templates for the requested types, in type order.
    pub fn select(
        &self,
        types: &[QuestionType],
    ) -> Result<BTreeMap<QuestionType, QuestionTemplate>, TemplateError> {
        types
            .iter()
            .map(|t| {
                self.templates
                    .get(t)
                    .cloned()
                    .map(|template| (*t, template))
                    .ok_or_else(|| TemplateError::UnknownQuestionType(t.to_string()))
            })
            .collect()
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}

pub(crate) fn check_rubric_size(rubric: &Rubric, expected: usize) -> Result<(), TemplateError> {
    if rubric.len() != expected {
        return Err(TemplateError::RubricSize {
            name: rubric.name.clone(),
            expected,
            found: rubric.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        let set = TemplateSet::builtin();
        set.validate().expect("builtin set should validate");
        assert_eq!(set.templates.len(), 3);
        assert_eq!(set.rt_rubric.len(), RT_RUBRIC_ITEMS);
        assert_eq!(set.de_rubric.len(), DE_RUBRIC_ITEMS);
        assert!(set.restricted_words.iter().any(|w| w == "apenas"));
    }

    #[test]
    fn test_builtin_bodies_parse_with_five_alternatives() {
        for body in [
            builtin::SINGLE_ANSWER_TEMPLATE,
            builtin::MULTIPLE_ANSWER_TEMPLATE,
            builtin::ASSERTION_REASON_TEMPLATE,
        ] {
            let template = QuestionTemplate::from_body("builtin", body).expect("valid template");
            assert_eq!(template.alternative_count, 5);
        }
    }

    #[test]
    fn test_from_body_rejects_missing_alternatives() {
        let err = QuestionTemplate::from_body("x.json", r#"{"statement": "?"}"#).unwrap_err();
        assert!(matches!(err, TemplateError::ParseError { .. }));
    }

    #[test]
    fn test_rubric_size_enforced() {
        let mut set = TemplateSet::builtin();
        set.de_rubric.items.pop();
        match set.validate() {
            Err(TemplateError::RubricSize { expected, found, .. }) => {
                assert_eq!(expected, 15);
                assert_eq!(found, 14);
            }
            other => panic!("expected RubricSize, got {:?}", other),
        }
    }

    #[test]
    fn test_select_subset() {
        let set = TemplateSet::builtin();
        let selected = set
            .select(&[QuestionType::AssertionReason])
            .expect("known type");
        assert_eq!(selected.len(), 1);
        assert!(selected.contains_key(&QuestionType::AssertionReason));
    }
}
