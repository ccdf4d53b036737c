//! Task intake
//!
//! An external system drops a task definition file describing the next
//! qualification run. A periodic poller picks it up and emits the parsed
//! task; a temporarily malformed or missing file is logged and retried on
//! the next tick rather than failing anything. The poller only produces
//! events, it never touches session state.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::time::interval;
use tracing::{debug, info, warn};
use veriscan_core::{AddressRange, TypeTag};

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("task file not found")]
    NotFound,
    #[error("task file unreadable: {0}")]
    Io(#[from] std::io::Error),
    #[error("task file malformed: {0}")]
    Malformed(#[from] toml::de::Error),
    #[error("task tag invalid: {0}")]
    Tag(#[from] veriscan_core::TagError),
    #[error("task range invalid: {0}")]
    Range(#[from] veriscan_core::RangeError),
}

/// Raw on-disk shape; serials stay strings so the start literal's digit
/// width survives into the range
#[derive(Debug, Deserialize)]
struct RawTask {
    tag: String,
    range_start: String,
    range_stop: String,
}

/// A validated qualification task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    pub tag: TypeTag,
    pub range: AddressRange,
}

/// Parse and validate the task definition file
pub fn load_task(path: &Path) -> Result<TaskDefinition, TaskError> {
    if !path.exists() {
        return Err(TaskError::NotFound);
    }
    let content = std::fs::read_to_string(path)?;
    let raw: RawTask = toml::from_str(&content)?;
    let tag: TypeTag = raw.tag.parse()?;
    let range = AddressRange::parse(&raw.range_start, &raw.range_stop)?;
    Ok(TaskDefinition { tag, range })
}

/// Polls the task file on a fixed cadence and yields each new definition
pub struct TaskWatcher {
    path: PathBuf,
    poll: Duration,
    last: Option<TaskDefinition>,
}

impl TaskWatcher {
    pub fn new(path: impl Into<PathBuf>, poll: Duration) -> Self {
        Self {
            path: path.into(),
            poll,
            last: None,
        }
    }

    /// Wait for the next task definition that differs from the last one
    /// handed out. Malformed files are retried on the next tick.
    pub async fn next_task(&mut self) -> TaskDefinition {
        let mut ticker = interval(self.poll);
        loop {
            ticker.tick().await;
            match load_task(&self.path) {
                Ok(task) => {
                    if self.last.as_ref() == Some(&task) {
                        continue;
                    }
                    info!(
                        tag = %task.tag,
                        range = %task.range,
                        "New qualification task"
                    );
                    self.last = Some(task.clone());
                    return task;
                }
                Err(TaskError::NotFound) => {
                    debug!(path = %self.path.display(), "No task file yet");
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Invalid task file, will retry");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_task(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("task.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_valid_task() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_task(
            &dir,
            r#"
            tag = "A"
            range_start = "2405000001"
            range_stop = "2405000003"
            "#,
        );
        let task = load_task(&path).unwrap();
        assert_eq!(task.tag.as_char(), 'A');
        assert_eq!(task.range.to_string(), "2405000001-2405000003");
    }

    #[test]
    fn test_load_rejects_malformed_task() {
        let dir = tempfile::tempdir().unwrap();

        let path = write_task(&dir, "tag = \"A\"");
        assert!(matches!(load_task(&path), Err(TaskError::Malformed(_))));

        let path = write_task(
            &dir,
            r#"
            tag = "AB"
            range_start = "1"
            range_stop = "2"
            "#,
        );
        assert!(matches!(load_task(&path), Err(TaskError::Tag(_))));

        let path = write_task(
            &dir,
            r#"
            tag = "A"
            range_start = "24x5000001"
            range_stop = "2405000003"
            "#,
        );
        assert!(matches!(load_task(&path), Err(TaskError::Range(_))));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(load_task(&path), Err(TaskError::NotFound)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_retries_until_file_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.toml");
        std::fs::write(&path, "not toml at all [[[").unwrap();

        let mut watcher = TaskWatcher::new(&path, Duration::from_secs(5));
        let pending = tokio::spawn(async move { watcher.next_task().await });

        // A few failed polls, then the file becomes valid
        tokio::time::sleep(Duration::from_secs(11)).await;
        std::fs::write(
            &path,
            r#"
            tag = "A"
            range_start = "0001"
            range_stop = "0002"
            "#,
        )
        .unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;

        let task = pending.await.unwrap();
        assert_eq!(task.range.to_string(), "0001-0002");
    }
}
