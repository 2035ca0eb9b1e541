//! Path enumeration
//!
//! Walks outward from the seeds and records, for every reachable task, the
//! full sequence of tasks that led there. Movement rules:
//!
//! - against an incoming `follows` or `hierarchy` relation (`to == n`): go to
//!   `from`. A follower reacts to the task it follows; a parent reacts to its
//!   child.
//! - along an outgoing `hierarchy` relation (`from == n`): go to `to`. A child
//!   reacts to its parent. Outgoing `follows` is never walked.
//!
//! The task we just came from is never the next step. A task already on the
//! current path is never re-entered; [`CyclePolicy`] decides whether that is
//! silently pruned or reported.

use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use super::access::SchedulingGraph;
use super::{Budget, CyclePolicy, ResolveError, ResolveOptions};
use crate::domain::{RelationKind, TaskId};

const UPSTREAM_KINDS: [RelationKind; 2] = [RelationKind::Hierarchy, RelationKind::Follows];
const DOWNSTREAM_KINDS: [RelationKind; 1] = [RelationKind::Hierarchy];

/// Ordered sequence of tasks from a seed to a discovered task, both inclusive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskPath(Vec<TaskId>);

impl TaskPath {
    /// The trivial path of a seed
    pub fn seed(task: TaskId) -> Self {
        Self(vec![task])
    }

    /// The seed the path starts from
    pub fn origin(&self) -> &TaskId {
        &self.0[0]
    }

    /// The task the path leads to
    pub fn last(&self) -> &TaskId {
        &self.0[self.0.len() - 1]
    }

    /// Number of tasks on the path
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; a path holds at least its seed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if the task is on the path
    pub fn contains(&self, task: &TaskId) -> bool {
        self.0.contains(task)
    }

    /// Iterates from seed to destination
    pub fn iter(&self) -> impl Iterator<Item = &TaskId> {
        self.0.iter()
    }

    /// Copy of this path with one more step
    pub(crate) fn extended(&self, next: TaskId) -> Self {
        let mut steps = Vec::with_capacity(self.0.len() + 1);
        steps.extend(self.0.iter().cloned());
        steps.push(next);
        Self(steps)
    }
}

impl fmt::Display for TaskPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<_> = self.0.iter().map(|t| t.as_str()).collect();
        f.write_str(&steps.join(" -> "))
    }
}

/// A task together with one path that reaches it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathRecord {
    pub node: TaskId,
    pub path: TaskPath,
}

/// Output of the enumeration stage
#[derive(Debug, Default)]
pub(crate) struct Enumeration {
    pub records: Vec<PathRecord>,
    pub pruned_cycles: usize,
}

/// Pending step: the path so far and the task it arrived from
struct Frontier {
    path: TaskPath,
    arrived_from: TaskId,
}

/// Records every `(task, path)` pair reachable from the seeds
pub(crate) fn enumerate<G: SchedulingGraph + ?Sized>(
    graph: &G,
    seeds: &BTreeSet<TaskId>,
    options: &ResolveOptions,
) -> Result<Enumeration, ResolveError> {
    let mut out = Enumeration::default();
    let mut queue: VecDeque<Frontier> = seeds
        .iter()
        .map(|seed| Frontier {
            path: TaskPath::seed(seed.clone()),
            arrived_from: seed.clone(),
        })
        .collect();

    while let Some(Frontier { path, arrived_from }) = queue.pop_front() {
        let node = path.last().clone();

        let mut next_steps = Vec::new();
        for edge in graph.relations_to(&node, &UPSTREAM_KINDS)? {
            if edge.from != arrived_from {
                next_steps.push(edge.from);
            }
        }
        for edge in graph.relations_from(&node, &DOWNSTREAM_KINDS)? {
            if edge.to != arrived_from {
                next_steps.push(edge.to);
            }
        }

        for next in next_steps {
            if path.contains(&next) {
                match options.on_cycle {
                    CyclePolicy::Prune => {
                        tracing::trace!(%path, %next, "pruning step back onto path");
                        out.pruned_cycles += 1;
                        continue;
                    }
                    CyclePolicy::Reject => {
                        return Err(ResolveError::CycleDetected { node: next, path });
                    }
                }
            }

            if path.len() >= options.max_path_len {
                return Err(ResolveError::BudgetExceeded {
                    budget: Budget::PathLength,
                    limit: options.max_path_len,
                });
            }

            queue.push_back(Frontier {
                path: path.extended(next),
                arrived_from: node.clone(),
            });
        }

        tracing::trace!(%path, "recorded path");
        out.records.push(PathRecord { node, path });

        if out.records.len() > options.max_paths {
            return Err(ResolveError::BudgetExceeded {
                budget: Budget::Paths,
                limit: options.max_paths,
            });
        }
    }

    tracing::debug!(
        seeds = seeds.len(),
        paths = out.records.len(),
        pruned_cycles = out.pruned_cycles,
        "enumerated paths"
    );

    Ok(out)
}
