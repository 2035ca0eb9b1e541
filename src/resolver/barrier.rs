//! Manual barrier mapping
//!
//! A discovered task is tainted by every manually scheduled task that sits on
//! any of its recorded paths, itself included.

use std::collections::{BTreeSet, HashMap};

use super::access::SchedulingGraph;
use super::paths::PathRecord;
use super::ResolveError;
use crate::domain::TaskId;

/// Manual tasks among the discovered ones, and who they taint
#[derive(Debug, Default)]
pub struct ManualBarriers {
    manual: BTreeSet<TaskId>,
    tags: HashMap<TaskId, BTreeSet<TaskId>>,
}

impl ManualBarriers {
    /// Discovered tasks that are scheduled manually
    pub fn manual(&self) -> &BTreeSet<TaskId> {
        &self.manual
    }

    /// Manual tasks found on any path leading to `task`
    pub fn tags(&self, task: &TaskId) -> impl Iterator<Item = &TaskId> {
        self.tags.get(task).into_iter().flatten()
    }

    /// Returns true if any path leading to `task` crosses a manual task
    pub fn is_tainted(&self, task: &TaskId) -> bool {
        self.tags.get(task).is_some_and(|t| !t.is_empty())
    }
}

/// Looks up manual flags for the discovered tasks and tags each task
pub(crate) fn map_barriers<G: SchedulingGraph + ?Sized>(
    graph: &G,
    records: &[PathRecord],
) -> Result<ManualBarriers, ResolveError> {
    let mut barriers = ManualBarriers::default();

    let discovered: BTreeSet<&TaskId> = records.iter().map(|r| &r.node).collect();
    for task in discovered {
        if graph.is_manual(task)? {
            barriers.manual.insert(task.clone());
        }
        barriers.tags.insert(task.clone(), BTreeSet::new());
    }

    for record in records {
        let on_path: Vec<_> = record
            .path
            .iter()
            .filter(|t| barriers.manual.contains(*t))
            .cloned()
            .collect();

        if let Some(tags) = barriers.tags.get_mut(&record.node) {
            tags.extend(on_path);
        }
    }

    tracing::debug!(
        manual = barriers.manual.len(),
        tainted = barriers.tags.values().filter(|t| !t.is_empty()).count(),
        "mapped manual barriers"
    );

    Ok(barriers)
}
