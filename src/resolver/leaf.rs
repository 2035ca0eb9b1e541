//! Hierarchy leaf classification
//!
//! A discovered task is a hierarchy leaf when it has no hierarchy children in
//! the whole graph. Every non-leaf task inherits the manual tags of its
//! direct, discovered leaf children, so a manual pin hands its barrier one
//! level up the hierarchy.
//!
//! Only one hop is examined. A manual leaf two levels below a task does not
//! taint it unless a path already does.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

use super::access::SchedulingGraph;
use super::barrier::ManualBarriers;
use super::paths::{PathRecord, TaskPath};
use super::ResolveError;
use crate::domain::{RelationKind, TaskId};

/// One candidate row: a path to `node`, viewed through one leaf child
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub node: TaskId,
    pub path: TaskPath,
    /// Discovered hierarchy-leaf child this row was derived from
    pub leaf_child: Option<TaskId>,
    /// Manual tasks carried by the node or by `leaf_child`
    pub barrier: BTreeSet<TaskId>,
}

impl Candidate {
    /// Returns true if no manual task stands at or below the node
    pub fn is_clean(&self) -> bool {
        self.barrier.is_empty()
    }
}

/// Discovered tasks without hierarchy children
pub(crate) fn classify_leaves<G: SchedulingGraph + ?Sized>(
    graph: &G,
    records: &[PathRecord],
) -> Result<HashSet<TaskId>, ResolveError> {
    let discovered: BTreeSet<&TaskId> = records.iter().map(|r| &r.node).collect();

    let mut leaves = HashSet::new();
    for task in discovered {
        if graph.is_hierarchy_leaf(task)? {
            leaves.insert(task.clone());
        }
    }

    Ok(leaves)
}

/// Expands path records into candidates carrying their hierarchy barrier
pub(crate) fn candidates<G: SchedulingGraph + ?Sized>(
    graph: &G,
    records: &[PathRecord],
    barriers: &ManualBarriers,
    leaves: &HashSet<TaskId>,
) -> Result<Vec<Candidate>, ResolveError> {
    let mut leaf_children: HashMap<&TaskId, BTreeSet<TaskId>> = HashMap::new();
    for record in records {
        if leaves.contains(&record.node) || leaf_children.contains_key(&record.node) {
            continue;
        }
        let children = graph
            .relations_from(&record.node, &[RelationKind::Hierarchy])?
            .into_iter()
            .map(|e| e.to)
            .filter(|child| leaves.contains(child))
            .collect();
        leaf_children.insert(&record.node, children);
    }

    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let own: BTreeSet<TaskId> = barriers.tags(&record.node).cloned().collect();
        let children = leaf_children.get(&record.node).filter(|c| !c.is_empty());

        match children {
            None => out.push(Candidate {
                node: record.node.clone(),
                path: record.path.clone(),
                leaf_child: None,
                barrier: own,
            }),
            Some(children) => {
                for child in children {
                    let mut barrier = own.clone();
                    barrier.extend(barriers.tags(child).cloned());
                    out.push(Candidate {
                        node: record.node.clone(),
                        path: record.path.clone(),
                        leaf_child: Some(child.clone()),
                        barrier,
                    });
                }
            }
        }
    }

    tracing::debug!(
        leaves = leaves.len(),
        candidates = out.len(),
        "classified hierarchy leaves"
    );

    Ok(out)
}
