//! LLM integration.
//!
//! [`LlmProvider`] is the transport seam (one chat-completions call);
//! [`TextGenerator`] is what stage agents use: a prompt goes in, text comes
//! out, and a slow provider is cut off by a per-call timeout.
//!
//! ```ignore
//! use quiz_forge::llm::{ChatCompletionsClient, TextGenerator};
//! use std::{sync::Arc, time::Duration};
//!
//! let client = ChatCompletionsClient::from_env()?;
//! let generator = TextGenerator::new(Arc::new(client), Duration::from_secs(120));
//! let text = generator.generate("Say hello", 50).await?;
//! ```

pub mod client;
pub mod generator;

pub use client::{
    ChatCompletionsClient, Choice, GenerationRequest, GenerationResponse, LlmProvider, Message,
    Usage, DEFAULT_MODEL,
};
pub use generator::TextGenerator;
