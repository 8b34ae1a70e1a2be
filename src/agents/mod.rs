//! Stage agents for the question pipeline.
//!
//! - [`ContentAgent`]: authors one question per objective and question type
//! - [`ReviewAgent`]: technical (`rt`) and design (`de`) checklist reviews
//! - [`ValidatorAgent`]: final entries, reports and the final document
//!
//! Every agent implements [`StageAgent`]: it takes an owned task and reports
//! a [`StageOutcome`]. Agents never persist anything themselves.

pub mod content;
pub mod error;
pub mod prompts;
pub mod review;
pub mod stage;
pub mod validator;

pub use content::{parse_question_reply, ContentAgent};
pub use error::{AgentError, AgentResult};
pub use review::ReviewAgent;
pub use stage::{default_scanner, StageAgent, StageOutcome, WordScanner};
pub use validator::{parse_recommendations, render_final_document, ValidatorAgent};
