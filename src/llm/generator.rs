//! The generation capability as seen by stage agents.
//!
//! [`TextGenerator`] narrows an [`LlmProvider`] to `prompt -> text` with a
//! bounded wait per call. Every failure it reports is a
//! [`GenerationError`], which the pipeline treats as retryable.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::client::{GenerationRequest, LlmProvider, Message};
use crate::error::GenerationError;

/// System prompt shared by every stage.
const SYSTEM_PROMPT: &str = "You are part of an assessment-authoring team that writes and reviews \
multiple-choice questions. Follow the requested output format exactly.";

/// Prompt-in, text-out generation with a per-call timeout.
#[derive(Clone)]
pub struct TextGenerator {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f64,
    timeout: Duration,
}

impl std::fmt::Debug for TextGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextGenerator")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TextGenerator {
    /// Creates a generator using the provider's default model.
    pub fn new(provider: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            model: String::new(),
            temperature: 0.7,
            timeout,
        }
    }

    /// Sets the model requested on every call.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sends `prompt` and returns the first completion's text.
    ///
    /// # Errors
    ///
    /// - [`GenerationError::Timeout`] if the provider does not answer in time
    /// - [`GenerationError::Unavailable`] for transport, API or empty replies
    pub async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError> {
        let request = GenerationRequest::new(
            self.model.clone(),
            vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)],
        )
        .with_temperature(self.temperature)
        .with_max_tokens(max_tokens);

        let started = Instant::now();
        let response = match tokio::time::timeout(self.timeout, self.provider.generate(request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Generation call timed out"
                );
                return Err(GenerationError::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        debug!(
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generation call completed"
        );

        match response.first_content() {
            Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
            _ => Err(GenerationError::Unavailable(format!(
                "model '{}' returned no content",
                response.model
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::client::GenerationResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedProvider {
        reply: Result<String, u16>,
        delay: Duration,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl FixedProvider {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for FixedProvider {
        async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
            self.seen.lock().expect("lock").push(request);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.reply {
                Ok(text) => Ok(GenerationResponse::from_text("mock", text.clone())),
                Err(code) => Err(LlmError::ApiError {
                    code: *code,
                    message: "boom".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_returns_text_and_sets_request_fields() {
        let provider = Arc::new(FixedProvider::ok("resposta"));
        let generator = TextGenerator::new(provider.clone(), Duration::from_secs(5))
            .with_model("m1")
            .with_temperature(0.2);

        let text = generator.generate("prompt", 123).await.expect("should generate");
        assert_eq!(text, "resposta");

        let seen = provider.seen.lock().expect("lock");
        assert_eq!(seen[0].model, "m1");
        assert_eq!(seen[0].max_tokens, Some(123));
        assert_eq!(seen[0].temperature, Some(0.2));
        assert_eq!(seen[0].last_user_content(), Some("prompt"));
    }

    #[tokio::test]
    async fn test_provider_error_is_unavailable() {
        let provider = Arc::new(FixedProvider {
            reply: Err(503),
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        });
        let generator = TextGenerator::new(provider, Duration::from_secs(5));
        let err = generator.generate("p", 10).await.unwrap_err();
        assert!(matches!(err, GenerationError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_blank_reply_is_unavailable() {
        let generator = TextGenerator::new(Arc::new(FixedProvider::ok("   ")), Duration::from_secs(5));
        assert!(matches!(
            generator.generate("p", 10).await,
            Err(GenerationError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let provider = Arc::new(FixedProvider {
            reply: Ok("late".to_string()),
            delay: Duration::from_millis(500),
            seen: Mutex::new(Vec::new()),
        });
        let generator = TextGenerator::new(provider, Duration::from_millis(20));
        let err = generator.generate("p", 10).await.unwrap_err();
        assert!(matches!(err, GenerationError::Timeout { .. }));
    }
}
