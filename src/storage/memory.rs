//! In-memory task store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StorageError, TaskStore};
use crate::records::Task;

/// Keeps tasks in a process-local map.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn load_task(&self, id: &str) -> Result<Task, StorageError> {
        self.tasks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn save_task(&self, task: &Task) -> Result<(), StorageError> {
        self.tasks
            .write()
            .await
            .insert(task.id.clone(), task.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::test_support::sample_task;

    #[tokio::test]
    async fn test_save_then_load() {
        let store = InMemoryTaskStore::new();
        let task = sample_task();
        store.save_task(&task).await.expect("save");
        assert_eq!(store.load_task(&task.id).await.expect("load"), task);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_task() {
        let store = InMemoryTaskStore::new();
        assert!(store.is_empty().await);
        assert!(matches!(
            store.load_task("nope").await,
            Err(StorageError::NotFound(id)) if id == "nope"
        ));
    }
}
