//! # Storage Layer
//!
//! Persistence with git-friendly file formats.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | JSONL (one JSON per line) | `.sched/tasks.jsonl` |
//! | Relations | JSONL (one JSON per line) | `.sched/relations.jsonl` |
//! | Config | TOML | `.sched/config.toml` |
//! | Cache | SQLite (auto-regenerated) | `.sched/.cache/sched.db` |
//!
//! ## Concurrency Safety
//!
//! - [`TaskStore`] and [`RelationStore`] use file locking (`fs2`)
//! - All JSONL rewrites are atomic (temp file + rename)
//! - [`Cache::view`] runs a whole resolution inside one read transaction
//!
//! ## Project Structure
//!
//! ```text
//! .sched/
//! ├── tasks.jsonl           # All tasks
//! ├── relations.jsonl       # All relations, malformed ones included
//! ├── config.toml           # Project configuration
//! ├── .cache/sched.db       # Query cache (gitignored)
//! └── .gitignore
//! ```
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for accessing a project
//! - [`TaskStore`] / [`RelationStore`] - Read/write JSONL
//! - [`Cache`] / [`CacheView`] - SQLite mirror the resolver can read
//! - [`Config`] - Project and global configuration

mod cache;
mod config;
mod jsonl;
mod project;

pub use cache::{Cache, CacheError, CacheStatus, CacheView};
pub use config::{
    CacheConfig, Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, ResolverConfig,
};
pub use jsonl::{RelationStore, TaskStore};
pub use project::{Project, ProjectError, SCHED_DIR};
