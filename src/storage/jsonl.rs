//! JSONL storage for tasks and relations
//!
//! Tasks live in `.sched/tasks.jsonl`, relations in `.sched/relations.jsonl`,
//! one JSON object per line. Uses file locking for concurrent access safety.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::project::SCHED_DIR;
use crate::domain::{Relation, RelationKind, Task, TaskId};

/// Reads every non-blank line of a JSONL file under a shared lock
fn read_lines<T: DeserializeOwned>(path: &Path, what: &str) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open {} store: {}", what, path.display()))?;

    // Acquire shared lock for reading
    file.lock_shared()
        .with_context(|| format!("Failed to acquire read lock on {} store", what))?;

    let reader = BufReader::new(&file);
    let mut items = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

        if line.trim().is_empty() {
            continue;
        }

        let item: T = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse {} at line {}", what, line_num + 1))?;

        items.push(item);
    }

    // Lock is released when file is dropped
    Ok(items)
}

/// Takes an exclusive lock on `<store>.lock` for a whole read-modify-write
///
/// The store file itself is replaced by rename on every rewrite, so its own
/// lock cannot serialize writers. Released when the returned file is dropped.
fn lock_for_update(path: &Path, what: &str) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let lock_path = path.with_extension("jsonl.lock");
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

    file.lock_exclusive()
        .with_context(|| format!("Failed to acquire update lock on {} store", what))?;

    Ok(file)
}

/// Rewrites a JSONL file atomically (temp file + rename)
fn write_lines<'a, T: Serialize + 'a>(
    path: &Path,
    what: &str,
    items: impl IntoIterator<Item = &'a T>,
) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    // Write to temp file first
    let temp_path = path.with_extension("jsonl.tmp");

    {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        // Acquire exclusive lock
        file.lock_exclusive()
            .with_context(|| format!("Failed to acquire write lock on {} store", what))?;

        let mut writer = BufWriter::new(&file);

        for item in items {
            let line = serde_json::to_string(item)
                .with_context(|| format!("Failed to serialize {}", what))?;
            writeln!(writer, "{}", line).with_context(|| format!("Failed to write {}", what))?;
        }

        writer
            .flush()
            .with_context(|| format!("Failed to flush {} store", what))?;
    }

    // Atomic rename
    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}

/// Store for task data in JSONL format
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    /// Creates a new task store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the default store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(SCHED_DIR).join("tasks.jsonl"))
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all tasks from the store. Later lines win over earlier ones.
    pub fn read_all(&self) -> Result<HashMap<TaskId, Task>> {
        let tasks: Vec<Task> = read_lines(&self.path, "task")?;
        Ok(tasks.into_iter().map(|t| (t.id.clone(), t)).collect())
    }

    /// Reads a single task
    pub fn get(&self, task_id: &TaskId) -> Result<Option<Task>> {
        Ok(self.read_all()?.remove(task_id))
    }

    /// Writes all tasks to the store (full rewrite)
    pub fn write_all(&self, tasks: &HashMap<TaskId, Task>) -> Result<()> {
        // Sort by ID for consistent output
        let mut sorted: Vec<_> = tasks.values().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        write_lines(&self.path, "task", sorted)
    }

    /// Appends a single task (used for quick adds without full rewrite)
    pub fn append(&self, task: &Task) -> Result<()> {
        let _guard = lock_for_update(&self.path, "task")?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open task store: {}", self.path.display()))?;

        // Acquire exclusive lock
        file.lock_exclusive()
            .context("Failed to acquire write lock on task store")?;

        let mut writer = BufWriter::new(&file);
        let line = serde_json::to_string(task).context("Failed to serialize task")?;
        writeln!(writer, "{}", line).context("Failed to write task")?;

        writer.flush().context("Failed to flush task store")?;

        Ok(())
    }

    /// Updates a single task (reads all, updates, writes all)
    pub fn update(&self, task: &Task) -> Result<()> {
        let _guard = lock_for_update(&self.path, "task")?;
        let mut tasks = self.read_all()?;
        tasks.insert(task.id.clone(), task.clone());
        self.write_all(&tasks)
    }

    /// Removes a task by ID
    pub fn remove(&self, task_id: &TaskId) -> Result<bool> {
        let _guard = lock_for_update(&self.path, "task")?;
        let mut tasks = self.read_all()?;
        let removed = tasks.remove(task_id).is_some();
        if removed {
            self.write_all(&tasks)?;
        }
        Ok(removed)
    }
}

/// Store for relations in JSONL format
///
/// Relations are kept verbatim, malformed ones included; filtering them is
/// the graph's job.
pub struct RelationStore {
    path: PathBuf,
}

impl RelationStore {
    /// Creates a new relation store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the default store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(SCHED_DIR).join("relations.jsonl"))
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all relations in file order
    pub fn read_all(&self) -> Result<Vec<Relation>> {
        read_lines(&self.path, "relation")
    }

    /// Writes all relations (full rewrite, sorted for stable diffs)
    pub fn write_all(&self, relations: &[Relation]) -> Result<()> {
        let mut sorted: Vec<_> = relations.iter().collect();
        sorted.sort_by(|a, b| {
            (&a.from, &a.to, a.kinds.to_string()).cmp(&(&b.from, &b.to, b.kinds.to_string()))
        });
        write_lines(&self.path, "relation", sorted)
    }

    /// Adds a relation. Returns false if an identical one already exists.
    pub fn add(&self, relation: Relation) -> Result<bool> {
        let _guard = lock_for_update(&self.path, "relation")?;
        let mut relations = self.read_all()?;
        if relations.contains(&relation) {
            return Ok(false);
        }
        relations.push(relation);
        self.write_all(&relations)?;
        Ok(true)
    }

    /// Removes relations between `from` and `to`, optionally only of one kind
    ///
    /// With a kind, only well-formed rows of exactly that kind match; rows
    /// carrying several flags are left alone. Returns the number removed.
    pub fn remove(&self, from: &TaskId, to: &TaskId, kind: Option<RelationKind>) -> Result<usize> {
        let _guard = lock_for_update(&self.path, "relation")?;
        let mut relations = self.read_all()?;
        let before = relations.len();
        relations.retain(|r| {
            if &r.from != from || &r.to != to {
                return true;
            }
            match kind {
                Some(k) => r.kind() != Some(k),
                None => false,
            }
        });
        let removed = before - relations.len();
        if removed > 0 {
            self.write_all(&relations)?;
        }
        Ok(removed)
    }

    /// Removes every relation touching the task
    pub fn remove_touching(&self, task_id: &TaskId) -> Result<usize> {
        let _guard = lock_for_update(&self.path, "relation")?;
        let mut relations = self.read_all()?;
        let before = relations.len();
        relations.retain(|r| !r.touches(task_id));
        let removed = before - relations.len();
        if removed > 0 {
            self.write_all(&relations)?;
        }
        Ok(removed)
    }
}
