use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::task::Task;

/// Durable backing for the task set. The engine is agnostic to whether
/// records live in a local file or a remote per-user collection; both
/// shapes fit this contract.
pub trait Store {
    fn read_all(&self) -> anyhow::Result<Vec<Task>>;

    /// Upserts one record and returns its id.
    fn write_one(&self, task: &Task) -> anyhow::Result<Uuid>;

    fn delete_one(&self, id: Uuid) -> anyhow::Result<()>;
}

/// Whole-collection JSONL store, written atomically via a temp file in the
/// same directory.
#[derive(Debug)]
pub struct FileStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
}

impl FileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join("tasks.data");
        if !tasks_path.exists() {
            fs::write(&tasks_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            "opened file store"
        );

        Ok(Self {
            data_dir,
            tasks_path,
        })
    }
}

impl Store for FileStore {
    #[tracing::instrument(skip(self))]
    fn read_all(&self) -> anyhow::Result<Vec<Task>> {
        load_jsonl(&self.tasks_path).context("failed to load tasks.data")
    }

    #[tracing::instrument(skip(self, task), fields(id = %task.id))]
    fn write_one(&self, task: &Task) -> anyhow::Result<Uuid> {
        let mut tasks = self.read_all()?;
        match tasks.iter_mut().find(|row| row.id == task.id) {
            Some(row) => *row = task.clone(),
            None => tasks.push(task.clone()),
        }
        tasks.sort_by_key(|row| (row.due_at, row.id));
        save_jsonl_atomic(&self.tasks_path, &tasks).context("failed to save tasks.data")?;
        Ok(task.id)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    fn delete_one(&self, id: Uuid) -> anyhow::Result<()> {
        let mut tasks = self.read_all()?;
        let before = tasks.len();
        tasks.retain(|row| row.id != id);
        if tasks.len() < before {
            save_jsonl_atomic(&self.tasks_path, &tasks).context("failed to save tasks.data")?;
        }
        Ok(())
    }
}

/// Session-local store; stands in for a remote per-user document
/// collection in tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<Uuid, Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(tasks: Vec<Task>) -> Self {
        let store = Self::new();
        if let Ok(mut records) = store.records.lock() {
            for task in tasks {
                records.insert(task.id, task);
            }
        }
        store
    }
}

impl Store for MemoryStore {
    fn read_all(&self) -> anyhow::Result<Vec<Task>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow!("memory store poisoned"))?;
        Ok(records.values().cloned().collect())
    }

    fn write_one(&self, task: &Task) -> anyhow::Result<Uuid> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow!("memory store poisoned"))?;
        records.insert(task.id, task.clone());
        Ok(task.id)
    }

    fn delete_one(&self, id: Uuid) -> anyhow::Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow!("memory store poisoned"))?;
        records.remove(&id);
        Ok(())
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<Vec<Task>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let task: Task = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(task);
    }

    debug!(count = out.len(), "loaded tasks from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, tasks))]
fn save_jsonl_atomic(path: &Path, tasks: &[Task]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = tasks.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for task in tasks {
        let serialized = serde_json::to_string(task)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
