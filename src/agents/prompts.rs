//! Prompt templates for the content and validator stages.
//!
//! Placeholders are `{name}` and are filled with `str::replace`.

use crate::records::QuestionType;
use crate::template::QuestionTemplate;
use crate::utils::Objective;

/// Prompt for authoring one question.
pub const CONTENT_PROMPT: &str = r#"You are a subject-matter author writing assessment questions in Portuguese.

LEARNING OBJECTIVE ({objective_id}):
{objective}

THEORY TEXT:
{theory}

QUESTION TYPE: {question_type}
{type_rules}

TEMPLATE (follow this JSON shape exactly):
{template}

WORDS TO AVOID (do not use these words or close variants):
{restricted_words}

INSTRUCTIONS:
1. Write ONE question of the type above for this learning objective.
2. Assess understanding and application, not memorisation.
3. Provide exactly {alternative_count} alternatives with ids a, b, c, ... and feedback for every alternative.
4. Keep alternatives of similar length.

Respond with a single JSON object following the template and nothing else."#;

/// Prompt asking for prompt-improvement recommendations.
pub const RECOMMENDATIONS_PROMPT: &str = r###"You coordinate a team that authors multiple-choice questions.

The pipeline run below produced {total} questions; {approved} were approved and {rejected} were rejected.

REVIEW OBSERVATIONS:
{observations}

Suggest concrete improvements to the authoring instructions that would avoid these problems in future runs.
Answer in Portuguese, in markdown, with a heading "## Recomendações" followed by a bulleted list."###;

fn type_rules(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::SingleAnswer => "Exactly one alternative is correct.",
        QuestionType::MultipleAnswer => {
            "Write four assertions (I, II, III, IV) in \"assertions\". The alternatives list \
             combinations of assertions; at least one and not all alternatives are correct."
        }
        QuestionType::AssertionReason => {
            "Write two assertions (I and II) in \"assertions\", linked by PORQUE. Exactly one \
             alternative is correct. Prefer cases where both are true but II does not justify I, \
             or both are false."
        }
    }
}

/// Renders [`CONTENT_PROMPT`].
pub fn content_prompt(
    objective: &Objective,
    theory: &str,
    question_type: QuestionType,
    template: &QuestionTemplate,
    restricted_words: &[String],
) -> String {
    let words = if restricted_words.is_empty() {
        "(none)".to_string()
    } else {
        restricted_words.join(", ")
    };

    CONTENT_PROMPT
        .replace("{objective_id}", &objective.id)
        .replace("{objective}", &objective.description)
        .replace("{theory}", theory)
        .replace("{question_type}", question_type.as_str())
        .replace("{type_rules}", type_rules(question_type))
        .replace("{template}", &template.body)
        .replace("{restricted_words}", &words)
        .replace("{alternative_count}", &template.alternative_count.to_string())
}

/// Renders [`RECOMMENDATIONS_PROMPT`].
pub fn recommendations_prompt(
    total: usize,
    approved: usize,
    rejected: usize,
    observations: &[String],
) -> String {
    let observations = if observations.is_empty() {
        "(no problems reported)".to_string()
    } else {
        observations
            .iter()
            .map(|o| format!("- {}", o))
            .collect::<Vec<_>>()
            .join("\n")
    };

    RECOMMENDATIONS_PROMPT
        .replace("{total}", &total.to_string())
        .replace("{approved}", &approved.to_string())
        .replace("{rejected}", &rejected.to_string())
        .replace("{observations}", &observations)
}
