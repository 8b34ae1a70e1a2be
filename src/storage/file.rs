//! File-backed task store.
//!
//! Layout under the data directory:
//!
//! ```text
//! tasks/<task_id>.json
//! output/<task_id>/questions.json
//! output/<task_id>/development_report.md
//! output/<task_id>/validation_report.md
//! output/<task_id>/final_document.md
//! ```
//!
//! Task ids are used as path components, so only ASCII letters, digits,
//! `-` and `_` are accepted.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{StorageError, TaskStore};
use crate::records::{ReportType, Task};

/// Stores each task as a JSON file.
#[derive(Debug, Clone)]
pub struct FileTaskStore {
    base_path: PathBuf,
}

impl FileTaskStore {
    /// Creates a store rooted at `base_path`. Directories are created lazily.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Returns the base storage path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn tasks_dir(&self) -> PathBuf {
        self.base_path.join("tasks")
    }

    fn task_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        Ok(self.tasks_dir().join(format!("{}.json", checked_id(id)?)))
    }

    /// Directory that [`FileTaskStore::export_results`] writes to.
    pub fn output_dir(&self, id: &str) -> Result<PathBuf, StorageError> {
        Ok(self.base_path.join("output").join(checked_id(id)?))
    }

    /// Writes the task's questions, reports and final document as files.
    ///
    /// Reports or a final document that do not exist yet are skipped.
    /// Returns the output directory.
    pub async fn export_results(&self, task: &Task) -> Result<PathBuf, StorageError> {
        let dir = self.output_dir(&task.id)?;
        fs::create_dir_all(&dir).await?;

        let questions = serde_json::to_vec_pretty(&task.questions)?;
        write_atomic(&dir.join("questions.json"), &questions).await?;

        if let Some(report) = task.report(ReportType::DevelopmentReport) {
            write_atomic(&dir.join("development_report.md"), report.to_markdown().as_bytes()).await?;
        }
        if let Some(report) = task.report(ReportType::ValidationReport) {
            write_atomic(&dir.join("validation_report.md"), report.to_markdown().as_bytes()).await?;
        }
        if let Some(document) = task.final_document() {
            write_atomic(&dir.join("final_document.md"), document.as_bytes()).await?;
        }

        debug!(task_id = %task.id, path = %dir.display(), "Exported task results");
        Ok(dir)
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn load_task(&self, id: &str) -> Result<Task, StorageError> {
        let path = self.task_path(id)?;
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&data)?)
    }

    async fn save_task(&self, task: &Task) -> Result<(), StorageError> {
        let path = self.task_path(&task.id)?;
        fs::create_dir_all(self.tasks_dir()).await?;
        let data = serde_json::to_vec_pretty(task)?;
        write_atomic(&path, &data).await?;
        debug!(task_id = %task.id, "Saved task");
        Ok(())
    }
}

fn checked_id(id: &str) -> Result<&str, StorageError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(id)
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}

/// Writes to a sibling temp file, syncs it, then renames over `path`.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let tmp = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("")
    ));

    let mut file = fs::File::create(&tmp).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::test_support::{sample_question, sample_task};
    use crate::records::{Report, ReportContent};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileTaskStore::new(dir.path());
        let mut task = sample_task();
        task.questions.push(sample_question("Obj.1"));

        store.save_task(&task).await.expect("save");
        assert!(dir.path().join("tasks").join(format!("{}.json", task.id)).exists());

        let loaded = store.load_task(&task.id).await.expect("load");
        assert_eq!(loaded, task);
    }

    #[tokio::test]
    async fn test_save_replaces_previous_version() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileTaskStore::new(dir.path());
        let mut task = sample_task();
        store.save_task(&task).await.expect("first save");

        task.questions.push(sample_question("Obj.2"));
        store.save_task(&task).await.expect("second save");

        let loaded = store.load_task(&task.id).await.expect("load");
        assert_eq!(loaded.questions.len(), 1);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("tasks"))
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_task() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileTaskStore::new(dir.path());
        assert!(matches!(
            store.load_task("missing").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ids_cannot_leave_the_data_dir() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileTaskStore::new(dir.path().join("data"));
        std::fs::write(dir.path().join("secret.json"), "{}").expect("write");

        for id in ["../../secret", "../secret", "a/b", "a\\b", "", ".."] {
            assert!(
                matches!(store.load_task(id).await, Err(StorageError::InvalidId(_))),
                "id {:?} should be refused",
                id
            );
            assert!(store.output_dir(id).is_err());
        }

        let mut task = sample_task();
        task.id = "../escape".to_string();
        assert!(matches!(store.save_task(&task).await, Err(StorageError::InvalidId(_))));
        assert!(!dir.path().join("escape.json").exists());
    }

    #[tokio::test]
    async fn test_corrupt_task_file_is_json_error() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileTaskStore::new(dir.path());
        std::fs::create_dir_all(dir.path().join("tasks")).expect("mkdir");
        std::fs::write(dir.path().join("tasks").join("bad.json"), "{not json").expect("write");
        assert!(matches!(store.load_task("bad").await, Err(StorageError::Json(_))));
    }

    #[tokio::test]
    async fn test_export_results() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileTaskStore::new(dir.path());
        let mut task = sample_task();
        task.questions.push(sample_question("Obj.1"));
        task.add_report(Report::new(
            ReportType::DevelopmentReport,
            "validator",
            ReportContent {
                summary: "Resumo do processo".to_string(),
                ..Default::default()
            },
        ));
        task.set_final_document("# Documento Final de Questões\n".to_string());

        let out = store.export_results(&task).await.expect("export");
        assert_eq!(out, dir.path().join("output").join(&task.id));
        assert!(out.join("questions.json").exists());
        assert!(out.join("final_document.md").exists());
        assert!(!out.join("validation_report.md").exists());

        let report = std::fs::read_to_string(out.join("development_report.md")).expect("read");
        assert!(report.contains("Resumo do processo"));
    }
}
