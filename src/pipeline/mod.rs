//! Pipeline orchestration for question authoring.
//!
//! # Architecture
//!
//! - **State**: the stage sequence, task status and the transition table
//! - **Coordinator**: runs stage agents under per-task locks and persists
//!   every transition
//! - **Config**: generation limits, retry budget and storage paths
//!
//! # Pipeline Flow
//!
//! 1. **Content**: one question per objective and question type
//! 2. **Technical review (rt)**: 8-item checklist per question
//! 3. **Design review (de)**: 15-item checklist per question, rt and de in either order
//! 4. **Validator**: final entries, development and validation reports, final document
//!
//! A question rejected at rt or de is excluded from later stages; the task
//! still completes with the remaining questions.
//!
//! # Example
//!
//! ```rust,ignore
//! use quiz_forge::llm::ChatCompletionsClient;
//! use quiz_forge::pipeline::{PipelineConfig, PipelineCoordinator, Stage};
//! use quiz_forge::storage::FileTaskStore;
//! use std::sync::Arc;
//!
//! let config = PipelineConfig::from_env()?;
//! let store = Arc::new(FileTaskStore::new(&config.data_dir));
//! let provider = Arc::new(ChatCompletionsClient::from_env()?);
//! let coordinator = PipelineCoordinator::from_config(&config, provider, store)?;
//!
//! let view = coordinator
//!     .create_task("Obj.1: Calcular a média", "Teoria...", &config.question_types)
//!     .await?;
//! coordinator.advance(&view.task_id, Stage::Content).await?;
//! let view = coordinator.run_all(&view.task_id).await?;
//! println!("{} approved questions", view.approved_count);
//! ```

pub mod config;
pub mod coordinator;
pub mod state;

pub use config::{parse_question_types, ConfigError, PipelineConfig};
pub use coordinator::{PipelineCoordinator, PipelineCoordinatorBuilder, PipelineError, TaskResults};
pub use state::{Stage, StageTransitions, TaskProgress, TaskStatus, TaskStatusView};
