use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use taskflow_shared::{Task, TaskInput, TaskPatch, TaskStatus};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::datetime::{format_timestamp, refreshed_updated_at};

pub const TASKS_STORAGE_KEY: &str = "tasks";

/// Task list of the reference backing store, kept as a JSON array in
/// `tasks.json` under the data directory.
#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
}

impl DataStore {
    /// Opens the store, seeding it with the sample tasks when the file is
    /// missing or empty.
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join(format!("{TASKS_STORAGE_KEY}.json"));
        let store = Self {
            data_dir,
            tasks_path,
        };

        let needs_seed = match fs::read_to_string(&store.tasks_path) {
            Ok(raw) => raw.trim().is_empty(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => true,
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed reading {}", store.tasks_path.display()));
            }
        };
        if needs_seed {
            let seed = sample_tasks(Utc::now());
            info!(count = seed.len(), "seeding task store with sample tasks");
            store.save_tasks(&seed)?;
        }

        info!(
            data_dir = %store.data_dir.display(),
            tasks = %store.tasks_path.display(),
            "opened datastore"
        );

        Ok(store)
    }

    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> anyhow::Result<Vec<Task>> {
        debug!(file = %self.tasks_path.display(), "loading tasks");
        let raw = fs::read_to_string(&self.tasks_path)
            .with_context(|| format!("failed reading {}", self.tasks_path.display()))?;
        if raw.trim().is_empty() {
            return Ok(vec![]);
        }
        let tasks: Vec<Task> = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.tasks_path.display()))?;
        debug!(count = tasks.len(), "loaded tasks");
        Ok(tasks)
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        save_json_atomic(&self.tasks_path, tasks).context("failed to save tasks.json")
    }

    /// Appends a new task with a server-assigned id and timestamps.
    #[tracing::instrument(skip(self, input), fields(title_len = input.title.len()))]
    pub fn create(&self, input: TaskInput, now: DateTime<Utc>) -> anyhow::Result<Task> {
        let mut tasks = self.load_tasks()?;
        let id = next_id(&tasks, now);
        let stamp = format_timestamp(now);

        let task = Task {
            id,
            title: input.title,
            description: input.description,
            status: input.status,
            created_at: stamp.clone(),
            updated_at: stamp,
        };

        tasks.push(task.clone());
        self.save_tasks(&tasks)?;
        info!(id = %task.id, "task created");
        Ok(task)
    }

    /// Merges the present fields of `patch` into the task. `None` when the
    /// id is unknown.
    #[tracing::instrument(skip(self, patch))]
    pub fn update(
        &self,
        id: &str,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Task>> {
        let mut tasks = self.load_tasks()?;

        let updated = {
            let Some(task) = tasks.iter_mut().find(|task| task.id == id) else {
                debug!("update target not found");
                return Ok(None);
            };

            if let Some(title) = patch.title {
                task.title = title;
            }
            if let Some(description) = patch.description {
                task.description = description;
            }
            if let Some(status) = patch.status {
                task.status = status;
            }
            task.updated_at = refreshed_updated_at(&task.created_at, now);
            task.clone()
        };

        self.save_tasks(&tasks)?;
        info!(id = %updated.id, "task updated");
        Ok(Some(updated))
    }

    /// Removes the task; `false` when the id is unknown.
    #[tracing::instrument(skip(self))]
    pub fn delete(&self, id: &str) -> anyhow::Result<bool> {
        let tasks = self.load_tasks()?;
        let before_count = tasks.len();
        let kept: Vec<Task> = tasks.into_iter().filter(|task| task.id != id).collect();
        if kept.len() == before_count {
            debug!("delete target not found");
            return Ok(false);
        }
        self.save_tasks(&kept)?;
        info!(before = before_count, after = kept.len(), "task deleted");
        Ok(true)
    }
}

/// Epoch milliseconds of `now`, bumped past any id already taken.
fn next_id(tasks: &[Task], now: DateTime<Utc>) -> String {
    let mut candidate = now.timestamp_millis().max(0) as u64;
    while tasks.iter().any(|t| t.id == candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}

pub fn sample_tasks(now: DateTime<Utc>) -> Vec<Task> {
    let stamp = format_timestamp(now);
    vec![
        Task {
            id: "1".to_string(),
            title: "Complete project documentation".to_string(),
            description: "Write comprehensive documentation for the task management system"
                .to_string(),
            status: TaskStatus::InProgress,
            created_at: stamp.clone(),
            updated_at: stamp.clone(),
        },
        Task {
            id: "2".to_string(),
            title: "Review pull requests".to_string(),
            description: "Review and merge pending pull requests from the team".to_string(),
            status: TaskStatus::Pending,
            created_at: stamp.clone(),
            updated_at: stamp,
        },
    ]
}

#[tracing::instrument(skip(path, tasks))]
fn save_json_atomic(path: &Path, tasks: &[Task]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = tasks.len(), "saving json atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut temp, tasks)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
