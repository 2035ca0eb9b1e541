//! SQLite cache for resolution queries
//!
//! The cache sits in `.sched/.cache/sched.db` and mirrors data from
//! the source-of-truth files (tasks.jsonl and relations.jsonl).
//! Cache invalidation is based on file modification times.
//!
//! Relations are stored with one flag column per kind, as the external
//! schema keeps them, plus a derived `kind` column that is only set when
//! exactly one flag is. Lookups go through `kind`, so malformed rows never
//! reach the resolver.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::Serialize;
use thiserror::Error;

use super::project::SCHED_DIR;
use crate::domain::{Relation, RelationKind, Task, TaskId};
use crate::resolver::{AccessError, Edge, SchedulingGraph};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to open cache snapshot: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Summary of what the cache holds
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub path: PathBuf,
    pub tasks: usize,
    pub relations: usize,
    /// Stored relations with zero or several kind flags
    pub malformed_relations: usize,
    pub last_rebuild: Option<DateTime<Utc>>,
    pub stale: bool,
}

/// SQLite cache for resolution queries
pub struct Cache {
    /// Path to the SQLite database
    db_path: PathBuf,

    /// Source files (for mtime comparison)
    tasks_path: PathBuf,
    relations_path: PathBuf,

    /// Database connection
    conn: Connection,
}

impl Cache {
    /// Schema version - bump when schema changes to force rebuild
    const SCHEMA_VERSION: i32 = 1;

    /// Creates or opens the cache for a project
    pub fn open(project_root: &Path) -> Result<Self> {
        let sched_dir = project_root.join(SCHED_DIR);
        let cache_dir = sched_dir.join(".cache");
        let db_path = cache_dir.join("sched.db");

        // Ensure cache directory exists
        fs::create_dir_all(&cache_dir).with_context(|| {
            format!("Failed to create cache directory: {}", cache_dir.display())
        })?;

        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open cache database: {}", db_path.display()))?;

        // WAL lets readers keep their snapshot while a rebuild runs
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let mut cache = Self {
            db_path,
            tasks_path: sched_dir.join("tasks.jsonl"),
            relations_path: sched_dir.join("relations.jsonl"),
            conn,
        };

        cache.ensure_schema()?;

        Ok(cache)
    }

    /// Ensures the schema is up to date
    fn ensure_schema(&mut self) -> Result<()> {
        let current_version = self.get_schema_version()?;

        if current_version != Self::SCHEMA_VERSION {
            tracing::debug!(
                from = current_version,
                to = Self::SCHEMA_VERSION,
                "recreating cache schema"
            );
            self.create_schema()?;
        }

        Ok(())
    }

    /// Gets the current schema version
    fn get_schema_version(&self) -> Result<i32> {
        let result: Option<i32> = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .optional()?;

        Ok(result.unwrap_or(0))
    }

    /// Creates the schema from scratch
    fn create_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "
            DROP TABLE IF EXISTS relations;
            DROP TABLE IF EXISTS tasks;
            DROP TABLE IF EXISTS cache_meta;

            CREATE TABLE tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                scheduled_manually INTEGER NOT NULL DEFAULT 0,
                start_date TEXT,
                due_date TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE relations (
                from_id TEXT NOT NULL,
                to_id TEXT NOT NULL,
                hierarchy INTEGER NOT NULL DEFAULT 0,
                follows INTEGER NOT NULL DEFAULT 0,
                relates INTEGER NOT NULL DEFAULT 0,
                duplicates INTEGER NOT NULL DEFAULT 0,
                blocks INTEGER NOT NULL DEFAULT 0,
                includes INTEGER NOT NULL DEFAULT 0,
                requires INTEGER NOT NULL DEFAULT 0,
                kind TEXT
            );

            CREATE TABLE cache_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX idx_relations_to ON relations(to_id, kind);
            CREATE INDEX idx_relations_from ON relations(from_id, kind);
            ",
        )?;

        // Set schema version
        self.conn.execute(
            &format!("PRAGMA user_version = {}", Self::SCHEMA_VERSION),
            [],
        )?;

        Ok(())
    }

    /// Checks if the cache needs to be rebuilt
    ///
    /// Rebuild times are kept in whole seconds, so a source file touched in
    /// the same second as the last rebuild counts as newer.
    pub fn is_stale(&self) -> Result<bool> {
        let cache_mtime = self.get_cache_mtime()?;

        for source in [&self.tasks_path, &self.relations_path] {
            if !source.exists() {
                continue;
            }
            let mtime = fs::metadata(source)?.modified()?;
            if mtime >= cache_mtime {
                tracing::debug!(source = %source.display(), "cache is stale");
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Gets the cache modification time (uses stored timestamp)
    fn get_cache_mtime(&self) -> Result<SystemTime> {
        Ok(self
            .last_rebuild_secs()?
            .map(|secs| SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap_or(SystemTime::UNIX_EPOCH))
    }

    fn last_rebuild_secs(&self) -> Result<Option<u64>> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM cache_meta WHERE key = 'last_rebuild'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        Ok(stored.and_then(|s| s.parse().ok()))
    }

    /// Rebuilds the cache from source data
    pub fn rebuild(&mut self, tasks: &HashMap<TaskId, Task>, relations: &[Relation]) -> Result<()> {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let tx = self.conn.transaction()?;

        // Clear existing data
        tx.execute("DELETE FROM relations", [])?;
        tx.execute("DELETE FROM tasks", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO tasks (id, title, scheduled_manually, start_date, due_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for task in tasks.values() {
                stmt.execute(params![
                    task.id.as_str(),
                    task.title,
                    task.scheduled_manually,
                    task.start_date.map(|d| d.to_string()),
                    task.due_date.map(|d| d.to_string()),
                    task.created_at.to_rfc3339(),
                    task.updated_at.to_rfc3339(),
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO relations (from_id, to_id, hierarchy, follows, relates, duplicates, blocks, includes, requires, kind)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;

            for relation in relations {
                let flag = |kind: RelationKind| relation.kinds.contains(kind);
                stmt.execute(params![
                    relation.from.as_str(),
                    relation.to.as_str(),
                    flag(RelationKind::Hierarchy),
                    flag(RelationKind::Follows),
                    flag(RelationKind::Relates),
                    flag(RelationKind::Duplicates),
                    flag(RelationKind::Blocks),
                    flag(RelationKind::Includes),
                    flag(RelationKind::Requires),
                    relation.kind().map(|k| k.as_str()),
                ])?;
            }
        }

        tx.execute(
            "INSERT OR REPLACE INTO cache_meta (key, value) VALUES ('last_rebuild', ?1)",
            params![now.to_string()],
        )?;

        tx.commit()?;

        tracing::debug!(
            tasks = tasks.len(),
            relations = relations.len(),
            "rebuilt cache"
        );

        Ok(())
    }

    /// Opens a read snapshot the resolver can run against
    ///
    /// Every query issued through the view sees the same database state.
    pub fn view(&mut self) -> Result<CacheView<'_>, CacheError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Deferred)?;
        Ok(CacheView { tx })
    }

    /// Reports row counts and freshness
    pub fn status(&self) -> Result<CacheStatus> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        let last_rebuild = self
            .last_rebuild_secs()?
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0));

        Ok(CacheStatus {
            path: self.db_path.clone(),
            tasks: count("SELECT COUNT(*) FROM tasks")?,
            relations: count("SELECT COUNT(*) FROM relations")?,
            malformed_relations: count("SELECT COUNT(*) FROM relations WHERE kind IS NULL")?,
            last_rebuild,
            stale: self.is_stale()?,
        })
    }

    /// Returns the database path
    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

/// A read transaction over the cache
///
/// Dropping the view ends the transaction.
pub struct CacheView<'c> {
    tx: Transaction<'c>,
}

impl CacheView<'_> {
    fn edges(
        &self,
        sql: &str,
        task: &TaskId,
        kinds: &[RelationKind],
        context: &str,
    ) -> Result<Vec<Edge>, AccessError> {
        let mut stmt = self
            .tx
            .prepare_cached(sql)
            .map_err(|e| AccessError::storage(context, e))?;

        let mut edges = Vec::new();
        for &kind in kinds {
            let rows = stmt
                .query_map(params![task.as_str(), kind.as_str()], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(|e| AccessError::storage(context, e))?;

            for row in rows {
                let (from, to) = row.map_err(|e| AccessError::storage(context, e))?;
                edges.push(Edge {
                    from: decode_id(&from, context)?,
                    to: decode_id(&to, context)?,
                    kind,
                });
            }
        }

        Ok(edges)
    }
}

fn decode_id(raw: &str, context: &str) -> Result<TaskId, AccessError> {
    raw.parse().map_err(|e| AccessError::storage(context, e))
}

impl SchedulingGraph for CacheView<'_> {
    fn relations_to(&self, task: &TaskId, kinds: &[RelationKind]) -> Result<Vec<Edge>, AccessError> {
        self.edges(
            "SELECT from_id, to_id FROM relations WHERE to_id = ?1 AND kind = ?2",
            task,
            kinds,
            "reading relations into a task",
        )
    }

    fn relations_from(
        &self,
        task: &TaskId,
        kinds: &[RelationKind],
    ) -> Result<Vec<Edge>, AccessError> {
        self.edges(
            "SELECT from_id, to_id FROM relations WHERE from_id = ?1 AND kind = ?2",
            task,
            kinds,
            "reading relations out of a task",
        )
    }

    fn is_manual(&self, task: &TaskId) -> Result<bool, AccessError> {
        let context = "reading manual scheduling flags";
        let mut stmt = self
            .tx
            .prepare_cached("SELECT scheduled_manually FROM tasks WHERE id = ?1")
            .map_err(|e| AccessError::storage(context, e))?;

        let manual: Option<bool> = stmt
            .query_row(params![task.as_str()], |row| row.get(0))
            .optional()
            .map_err(|e| AccessError::storage(context, e))?;

        Ok(manual.unwrap_or(false))
    }

    fn is_hierarchy_leaf(&self, task: &TaskId) -> Result<bool, AccessError> {
        let context = "reading hierarchy children";
        let mut stmt = self
            .tx
            .prepare_cached(
                "SELECT EXISTS(SELECT 1 FROM relations WHERE from_id = ?1 AND kind = 'hierarchy')",
            )
            .map_err(|e| AccessError::storage(context, e))?;

        let has_children: bool = stmt
            .query_row(params![task.as_str()], |row| row.get(0))
            .map_err(|e| AccessError::storage(context, e))?;

        Ok(!has_children)
    }
}
