//! Project management
//!
//! Handles project initialization and provides access to stores.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::{Cache, Config, RelationStore, TaskStore};
use crate::domain::RelationGraph;

/// Name of the per-project data directory
pub const SCHED_DIR: &str = ".sched";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Project already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("Not in a sched project. Run 'sched init' first.")]
    NotInProject,

    #[error("Failed to create project: {0}")]
    CreateFailed(String),
}

const DEFAULT_CONFIG: &str = r#"# sched configuration

[resolver]
# Longest chain of tasks a single path may contain
max_path_len = 256
# Most (task, path) records one resolution may produce
max_paths = 100000
# "prune" skips steps that revisit a task on the same path, "reject" fails
on_cycle = "prune"

[cache]
# Resolve through the SQLite cache instead of loading every relation
enabled = true
"#;

const GITIGNORE: &str = r#"# SQLite cache (regenerated from tasks.jsonl and relations.jsonl)
.cache/

# Interrupted writes
*.tmp

# Store update locks
*.lock
"#;

/// A sched project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(SCHED_DIR).is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    ///
    /// Running it again on an existing project only fills in missing files.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let sched_dir = root.join(SCHED_DIR);

        if sched_dir.exists() && !sched_dir.is_dir() {
            return Err(ProjectError::CreateFailed(format!(
                "{} exists and is not a directory",
                sched_dir.display()
            ))
            .into());
        }

        fs::create_dir_all(&sched_dir).with_context(|| {
            format!("Failed to create .sched directory: {}", sched_dir.display())
        })?;

        let config_path = sched_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = sched_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, GITIGNORE).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        Self::open(root)
    }

    /// Initializes a project, failing if one is already there
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.join(SCHED_DIR).is_dir() {
            return Err(ProjectError::AlreadyExists(root).into());
        }
        Self::init(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .sched directory path
    pub fn sched_dir(&self) -> PathBuf {
        self.root.join(SCHED_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the task store
    pub fn task_store(&self) -> TaskStore {
        TaskStore::for_project(&self.root)
    }

    /// Returns the relation store
    pub fn relation_store(&self) -> RelationStore {
        RelationStore::for_project(&self.root)
    }

    /// Opens the SQLite cache for this project
    pub fn cache(&self) -> Result<Cache> {
        Cache::open(&self.root)
    }

    /// Rebuilds the cache from source files
    pub fn rebuild_cache(&self) -> Result<Cache> {
        let mut cache = self.cache()?;
        let tasks = self.task_store().read_all()?;
        let relations = self.relation_store().read_all()?;
        cache.rebuild(&tasks, &relations)?;
        Ok(cache)
    }

    /// Gets the cache if it's fresh, or rebuilds it if stale
    pub fn get_or_rebuild_cache(&self) -> Result<Cache> {
        let cache = self.cache()?;

        if cache.is_stale()? {
            drop(cache);
            return self.rebuild_cache();
        }

        Ok(cache)
    }

    /// Loads tasks and relations into an in-memory graph
    pub fn snapshot(&self) -> Result<RelationGraph> {
        let tasks = self.task_store().read_all()?;
        let relations = self.relation_store().read_all()?;
        Ok(RelationGraph::from_parts(tasks.values(), &relations))
    }
}
