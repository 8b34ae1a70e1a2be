//! Task persistence.
//!
//! The coordinator only needs [`TaskStore`]: load a task by id and save it
//! durably. Two implementations are provided:
//!
//! - [`FileTaskStore`]: one JSON file per task under `<data_dir>/tasks/`,
//!   plus result export under `<data_dir>/output/<task_id>/`
//! - [`InMemoryTaskStore`]: a process-local map, for tests and embedding
//!
//! # Usage
//!
//! ```rust,ignore
//! use quiz_forge::storage::{FileTaskStore, TaskStore};
//!
//! let store = FileTaskStore::new("./data");
//! store.save_task(&task).await?;
//! let loaded = store.load_task(&task.id).await?;
//! ```

pub mod file;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::records::Task;

pub use file::FileTaskStore;
pub use memory::InMemoryTaskStore;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No task with this id has been saved.
    #[error("Task not found: {0}")]
    NotFound(String),

    /// The id cannot name a task file.
    #[error("Invalid task id: {0:?}")]
    InvalidId(String),

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A task file could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence collaborator for tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Loads the task with `id`.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if no such task was saved, and
    /// [`StorageError::InvalidId`] if a store cannot address `id`.
    async fn load_task(&self, id: &str) -> Result<Task, StorageError>;

    /// Saves `task`, replacing any previous version. Durable on return.
    async fn save_task(&self, task: &Task) -> Result<(), StorageError>;
}
