//! Content stage: authors one question per objective and question type.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::{AgentError, AgentResult};
use super::prompts::content_prompt;
use super::stage::{StageAgent, StageOutcome, WordScanner};
use crate::llm::TextGenerator;
use crate::pipeline::state::Stage;
use crate::records::{Question, QuestionDraft, QuestionType, Task};
use crate::utils::{distinct_words, extract_json, ExtractionError};

/// Authors questions from the task's objectives, theory and templates.
pub struct ContentAgent {
    generator: TextGenerator,
    max_tokens: u32,
    scanner: WordScanner,
}

impl std::fmt::Debug for ContentAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentAgent")
            .field("generator", &self.generator)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl ContentAgent {
    /// Agent name recorded as `created_by` on every question.
    pub const AGENT_NAME: &'static str = "content";

    pub fn new(generator: TextGenerator, max_tokens: u32, scanner: WordScanner) -> Self {
        Self {
            generator,
            max_tokens,
            scanner,
        }
    }

    async fn author(&self, mut task: Task) -> AgentResult<Task> {
        if task.objectives.is_empty() {
            return Err(AgentError::MissingInput("learning objectives".to_string()));
        }
        if task.templates.is_empty() {
            return Err(AgentError::MissingInput("question templates".to_string()));
        }

        let mut authored = Vec::with_capacity(task.objectives.len() * task.templates.len());

        for objective in &task.objectives {
            for (question_type, template) in &task.templates {
                let question_type = *question_type;
                let prompt = content_prompt(
                    objective,
                    &task.theory,
                    question_type,
                    template,
                    &task.restricted_words,
                );

                debug!(
                    task_id = %task.id,
                    objective_id = %objective.id,
                    question_type = %question_type,
                    "Requesting question"
                );
                let reply = self.generator.generate(&prompt, self.max_tokens).await?;

                let draft = parse_question_reply(&reply).map_err(|source| AgentError::Extraction {
                    objective_id: objective.id.clone(),
                    question_type,
                    source,
                })?;

                let mut question = Question::from_draft(
                    draft,
                    &objective.id,
                    question_type,
                    template.alternative_count,
                    Self::AGENT_NAME,
                )
                .map_err(|source| AgentError::InvalidQuestion {
                    objective_id: objective.id.clone(),
                    question_type,
                    source,
                })?;

                let matches = (self.scanner)(&question.scannable_text(), &task.restricted_words);
                if !matches.is_empty() {
                    question.metadata.restricted_words = distinct_words(&matches);
                    warn!(
                        task_id = %task.id,
                        question_id = %question.id,
                        words = ?question.metadata.restricted_words,
                        "Generated question contains restricted words"
                    );
                }

                authored.push(question);
            }
        }

        info!(
            task_id = %task.id,
            questions = authored.len(),
            "Content stage authored questions"
        );
        task.questions.extend(authored);
        Ok(task)
    }
}

#[async_trait]
impl StageAgent for ContentAgent {
    fn stage(&self) -> Stage {
        Stage::Content
    }

    async fn run(&self, task: Task) -> StageOutcome {
        StageOutcome::from_result(Stage::Content, self.author(task).await)
    }
}

/// Extracts a question draft from a model reply.
///
/// Accepts the question object itself or a wrapper `{"questions": [..]}`,
/// in which case the first element is used.
pub fn parse_question_reply(reply: &str) -> Result<QuestionDraft, ExtractionError> {
    let value = extract_json(reply)?;
    let object = match value.get("questions") {
        Some(Value::Array(items)) => items.first().cloned().ok_or_else(|| ExtractionError::Shape {
            reason: "'questions' array is empty".to_string(),
        })?,
        _ => value,
    };

    serde_json::from_value(object).map_err(|e| ExtractionError::Shape {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::default_scanner;
    use crate::agents::test_support::{generator, question_json, ScriptedProvider};
    use crate::records::test_support::sample_task;
    use std::sync::Arc;

    fn agent(provider: Arc<ScriptedProvider>) -> ContentAgent {
        ContentAgent::new(generator(provider), 2000, default_scanner())
    }

    #[test]
    fn test_parse_question_reply_shapes() {
        let direct = format!("Aqui está:\n```json\n{}\n```", question_json("single_answer", "texto"));
        let draft = parse_question_reply(&direct).expect("direct object");
        assert_eq!(draft.alternatives.len(), 5);

        let wrapped = format!("{{\"questions\": [{}]}}", question_json("single_answer", "texto"));
        assert!(parse_question_reply(&wrapped).is_ok());

        assert!(matches!(
            parse_question_reply("{\"questions\": []}"),
            Err(ExtractionError::Shape { .. })
        ));
        assert!(parse_question_reply("sem json").is_err());
    }

    #[tokio::test]
    async fn test_authors_one_question_per_objective_and_type() {
        let provider = Arc::new(ScriptedProvider::new());
        let task = sample_task();
        let expected: Vec<(String, QuestionType)> = task
            .objectives
            .iter()
            .flat_map(|o| QuestionType::ALL.into_iter().map(move |t| (o.id.clone(), t)))
            .collect();

        let outcome = agent(provider.clone()).run(task).await;
        let StageOutcome::Advanced(task) = outcome else {
            panic!("expected Advanced");
        };

        let produced: Vec<(String, QuestionType)> = task
            .questions
            .iter()
            .map(|q| (q.objective_id.clone(), q.question_type))
            .collect();
        assert_eq!(produced, expected);
        assert_eq!(provider.call_count(), expected.len());
        assert!(task.questions.iter().all(|q| q.metadata.created_by == "content"));
    }

    #[tokio::test]
    async fn test_restricted_words_recorded_not_corrected() {
        let provider = Arc::new(ScriptedProvider::new().with_statement("Escolha apenas uma opção."));
        let outcome = agent(provider).run(sample_task()).await;
        let StageOutcome::Advanced(task) = outcome else {
            panic!("expected Advanced");
        };
        let question = &task.questions[0];
        assert!(question.statement.contains("apenas"));
        assert_eq!(question.metadata.restricted_words, vec!["apenas"]);
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_retryable() {
        let provider = Arc::new(ScriptedProvider::new().with_rule("LEARNING OBJECTIVE", "Não sei responder."));
        let outcome = agent(provider).run(sample_task()).await;
        assert!(matches!(outcome, StageOutcome::RetryableFailure(_)));
    }

    #[tokio::test]
    async fn test_wrong_correct_count_is_retryable() {
        let two_correct = question_json("single_answer", "x").replace(
            r#""id": "b", "text": "Opção b", "correct": false"#,
            r#""id": "b", "text": "Opção b", "correct": true"#,
        );
        let provider = Arc::new(ScriptedProvider::new().with_rule("QUESTION TYPE: single_answer", &two_correct));
        let outcome = agent(provider).run(sample_task()).await;
        match outcome {
            StageOutcome::RetryableFailure(reason) => assert!(reason.contains("correct")),
            other => panic!("expected RetryableFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_objectives_is_fatal() {
        let mut task = sample_task();
        task.objectives.clear();
        let outcome = agent(Arc::new(ScriptedProvider::new())).run(task).await;
        assert!(matches!(outcome, StageOutcome::FatalFailure(_)));
    }
}
