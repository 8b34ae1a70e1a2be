//! Integration tests against a real chat-completions endpoint.
//!
//! These tests make real API calls.
//! Run with: LLM_API_BASE=http://localhost:4000/v1 LLM_API_KEY=... cargo test --test llm_integration -- --ignored

use std::sync::Arc;
use std::time::Duration;

use quiz_forge::agents::parse_question_reply;
use quiz_forge::checklist::engine::parse_reply as parse_checklist_reply;
use quiz_forge::llm::{ChatCompletionsClient, GenerationRequest, LlmProvider, Message, TextGenerator};
use quiz_forge::pipeline::{PipelineConfig, PipelineCoordinator, TaskStatus};
use quiz_forge::records::QuestionType;
use quiz_forge::storage::InMemoryTaskStore;
use quiz_forge::template::TemplateSet;

fn create_test_client() -> ChatCompletionsClient {
    ChatCompletionsClient::from_env()
        .expect("LLM_API_BASE environment variable must be set for integration tests")
}

#[tokio::test]
#[ignore] // Run with: cargo test --test llm_integration -- --ignored
async fn test_simple_generation() {
    let client = create_test_client();

    let request = GenerationRequest::new(
        "",
        vec![
            Message::system("You are a helpful assistant. Reply concisely."),
            Message::user("What is 2 + 2? Reply with just the number."),
        ],
    )
    .with_max_tokens(10)
    .with_temperature(0.0);

    let response = client.generate(request).await;
    assert!(response.is_ok(), "Generation failed: {:?}", response.err());

    let response = response.expect("Should have response");
    let content = response.first_content().expect("Should have content");
    assert!(content.contains('4'), "Response should contain '4', got: {}", content);
}

#[tokio::test]
#[ignore]
async fn test_generator_respects_timeout() {
    let generator = TextGenerator::new(Arc::new(create_test_client()), Duration::from_millis(1));
    let result = generator.generate("Write a long essay about statistics.", 2000).await;
    assert!(result.is_err(), "A 1 ms bound should time out");
}

#[tokio::test]
#[ignore]
async fn test_model_question_is_extractable() {
    let generator = TextGenerator::new(Arc::new(create_test_client()), Duration::from_secs(120));
    let set = TemplateSet::builtin();
    let template = &set.templates[&QuestionType::SingleAnswer];

    let prompt = format!(
        "Write one single_answer question in Portuguese about the arithmetic mean. \
         Follow this JSON template exactly and reply with JSON only:\n{}",
        template.body
    );
    let reply = generator.generate(&prompt, 2000).await.expect("generation");
    let draft = parse_question_reply(&reply).expect("question JSON in reply");
    assert_eq!(draft.alternatives.len(), template.alternative_count);
}

#[tokio::test]
#[ignore]
async fn test_checklist_reply_covers_every_item() {
    let generator = TextGenerator::new(Arc::new(create_test_client()), Duration::from_secs(120));
    let set = TemplateSet::builtin();

    let prompt = format!(
        "For each of the {} items below answer \"sim\", \"não\" or \"NA\" as JSON \
         {{\"checklist\": {{\"1\": {{\"result\": \"sim\", \"observation\": \"\"}}}}}}.\n{}",
        set.rt_rubric.len(),
        set.rt_rubric.to_prompt_list()
    );
    let reply = generator.generate(&prompt, 2000).await.expect("generation");
    let evaluation = parse_checklist_reply(&set.rt_rubric, &reply);
    assert_eq!(evaluation.checklist.len(), set.rt_rubric.len());
}

#[tokio::test]
#[ignore]
async fn test_full_pipeline_against_endpoint() {
    let config = PipelineConfig::new().with_question_types(vec![QuestionType::SingleAnswer]);
    let coordinator = PipelineCoordinator::from_config(
        &config,
        Arc::new(create_test_client()),
        Arc::new(InMemoryTaskStore::new()),
    )
    .expect("coordinator");

    let view = coordinator
        .create_task(
            "Obj.1: Calcular a média aritmética de um conjunto de dados",
            "A média aritmética é a soma dos valores dividida pela quantidade de valores.",
            &config.question_types,
        )
        .await
        .expect("create");

    let view = coordinator.run_all(&view.task_id).await.expect("run_all");
    assert_eq!(view.status, TaskStatus::Completed);
    assert_eq!(view.reports_count, 2);
}
