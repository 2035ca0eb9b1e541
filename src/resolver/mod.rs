//! # Impact-set resolution
//!
//! Given a set of changed (seed) tasks, finds every other task whose
//! automatically computed schedule may now be stale.
//!
//! ## Pipeline
//!
//! | Stage | Module | Produces |
//! |-------|--------|----------|
//! | Path enumeration | [`paths`] | every `(task, path)` reachable from the seeds |
//! | Manual barriers | [`barrier`] | manual tasks and the tasks whose paths cross them |
//! | Hierarchy leaves | [`leaf`] | candidate rows carrying the barrier of a leaf child |
//! | Broken paths | [`filter`] | surviving tasks minus the seeds |
//!
//! Data flows strictly forward. The graph is only read, through
//! [`SchedulingGraph`]; for a consistent result hand the resolver a snapshot.
//!
//! ## Example
//!
//! ```
//! use schedule_impact::{ImpactResolver, Relation, RelationGraph, TaskId};
//!
//! let id = |s: &str| s.parse::<TaskId>().unwrap();
//! let relations = [
//!     Relation::follows(id("B"), id("A")),
//!     Relation::hierarchy(id("C"), id("B")),
//! ];
//! let graph = RelationGraph::from_relations(&relations);
//!
//! let impact = ImpactResolver::new(&graph).resolve([&id("A")]).unwrap();
//! assert_eq!(impact.len(), 2);
//! ```

mod access;
pub mod barrier;
pub mod filter;
pub mod leaf;
pub mod paths;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::domain::TaskId;

pub use access::{AccessError, Edge, SchedulingGraph};
pub use barrier::ManualBarriers;
pub use filter::{BrokenPath, Exclusion};
pub use leaf::Candidate;
pub use paths::{PathRecord, TaskPath};

/// Which safety limit a resolution ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    PathLength,
    Paths,
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Budget::PathLength => f.write_str("tasks on a single path"),
            Budget::Paths => f.write_str("recorded paths"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Cycle detected: {node} is already on path {path}")]
    CycleDetected { node: TaskId, path: TaskPath },

    #[error("Resolution budget exceeded: more than {limit} {budget} (possible cycle or very large graph)")]
    BudgetExceeded { budget: Budget, limit: usize },

    #[error(transparent)]
    Access(#[from] AccessError),
}

/// What to do when a step would re-enter a task already on its path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Skip the step and keep going
    #[default]
    Prune,
    /// Fail with [`ResolveError::CycleDetected`]
    Reject,
}

/// Safety limits for one resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Longest path, in tasks, the enumerator may build
    pub max_path_len: usize,
    /// Most `(task, path)` records the enumerator may produce
    pub max_paths: usize,
    pub on_cycle: CyclePolicy,
}

impl ResolveOptions {
    pub const DEFAULT_MAX_PATH_LEN: usize = 256;
    pub const DEFAULT_MAX_PATHS: usize = 100_000;
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_path_len: Self::DEFAULT_MAX_PATH_LEN,
            max_paths: Self::DEFAULT_MAX_PATHS,
            on_cycle: CyclePolicy::Prune,
        }
    }
}

/// Tasks that need automatic rescheduling, seeds excluded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImpactSet(BTreeSet<TaskId>);

impl ImpactSet {
    /// Returns true if the task must be rescheduled
    pub fn contains(&self, task: &TaskId) -> bool {
        self.0.contains(task)
    }

    /// Number of tasks
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing needs rescheduling
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in ID order
    pub fn iter(&self) -> impl Iterator<Item = &TaskId> {
        self.0.iter()
    }

    /// Unwraps into the underlying set
    pub fn into_inner(self) -> BTreeSet<TaskId> {
        self.0
    }
}

impl FromIterator<TaskId> for ImpactSet {
    fn from_iter<I: IntoIterator<Item = TaskId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ImpactSet {
    type Item = TaskId;
    type IntoIter = std::collections::btree_set::IntoIter<TaskId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ImpactSet {
    type Item = &'a TaskId;
    type IntoIter = std::collections::btree_set::Iter<'a, TaskId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Full account of one resolution, for explaining the result
#[derive(Debug, Clone, Default, Serialize)]
pub struct Resolution {
    pub seeds: BTreeSet<TaskId>,
    pub paths: Vec<PathRecord>,
    pub manual: BTreeSet<TaskId>,
    pub excluded: Vec<Exclusion>,
    pub impact: ImpactSet,
    pub pruned_cycles: usize,
}

/// Runs the resolution pipeline against a graph
pub struct ImpactResolver<G> {
    graph: G,
    options: ResolveOptions,
}

impl<G: SchedulingGraph> ImpactResolver<G> {
    /// Creates a resolver with default limits
    pub fn new(graph: G) -> Self {
        Self::with_options(graph, ResolveOptions::default())
    }

    /// Creates a resolver with explicit limits
    pub fn with_options(graph: G, options: ResolveOptions) -> Self {
        Self { graph, options }
    }

    /// Returns the tasks needing rescheduling after the seeds changed
    pub fn resolve<'s>(
        &self,
        seeds: impl IntoIterator<Item = &'s TaskId>,
    ) -> Result<ImpactSet, ResolveError> {
        Ok(self.explain(seeds)?.impact)
    }

    /// Like [`resolve`](Self::resolve), also returning paths and exclusions
    pub fn explain<'s>(
        &self,
        seeds: impl IntoIterator<Item = &'s TaskId>,
    ) -> Result<Resolution, ResolveError> {
        let seeds: BTreeSet<TaskId> = seeds.into_iter().cloned().collect();
        if seeds.is_empty() {
            return Ok(Resolution::default());
        }

        let _span = tracing::debug_span!("resolve", seeds = seeds.len()).entered();

        let enumeration = paths::enumerate(&self.graph, &seeds, &self.options)?;
        let barriers = barrier::map_barriers(&self.graph, &enumeration.records)?;
        let leaves = leaf::classify_leaves(&self.graph, &enumeration.records)?;
        let candidates =
            leaf::candidates(&self.graph, &enumeration.records, &barriers, &leaves)?;
        let filtered = filter::filter_broken_paths(&candidates, &seeds);

        tracing::debug!(
            impact = filtered.impact.len(),
            excluded = filtered.excluded.len(),
            "resolved impact set"
        );

        Ok(Resolution {
            seeds,
            paths: enumeration.records,
            manual: barriers.manual().clone(),
            excluded: filtered.excluded,
            impact: ImpactSet(filtered.impact),
            pruned_cycles: enumeration.pruned_cycles,
        })
    }
}
