//! In-memory relation snapshot
//!
//! Holds the well-formed relations of a project plus the manual-scheduling
//! flags of its tasks. Uses petgraph for storage; edge direction matches the
//! stored relation (`from -> to`).

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

use super::id::TaskId;
use super::relation::{Relation, RelationKind};
use super::task::Task;
use crate::resolver::{AccessError, Edge, SchedulingGraph};

/// Immutable-by-convention snapshot of the scheduling graph
#[derive(Debug, Default, Clone)]
pub struct RelationGraph {
    /// The underlying directed multigraph
    graph: DiGraph<TaskId, RelationKind>,

    /// Map from TaskId to node index
    node_map: HashMap<TaskId, NodeIndex>,

    /// Tasks pinned to a manual schedule
    manual: HashSet<TaskId>,

    /// Relations rejected for having zero or several kinds
    skipped: usize,
}

impl RelationGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from tasks and relations
    pub fn from_parts<'a>(
        tasks: impl IntoIterator<Item = &'a Task>,
        relations: impl IntoIterator<Item = &'a Relation>,
    ) -> Self {
        let mut graph = Self::new();

        for task in tasks {
            graph.add_task(task.id.clone(), task.scheduled_manually);
        }

        for relation in relations {
            graph.add_relation(relation);
        }

        tracing::debug!(
            tasks = graph.len(),
            relations = graph.relation_count(),
            skipped = graph.skipped,
            "built relation graph"
        );

        graph
    }

    /// Builds a snapshot from relations alone; every task is automatic
    pub fn from_relations<'a>(relations: impl IntoIterator<Item = &'a Relation>) -> Self {
        Self::from_parts(std::iter::empty::<&'a Task>(), relations)
    }

    /// Adds a task, or updates its manual flag if already present
    pub fn add_task(&mut self, task_id: TaskId, scheduled_manually: bool) {
        self.ensure_node(&task_id);
        if scheduled_manually {
            self.manual.insert(task_id);
        } else {
            self.manual.remove(&task_id);
        }
    }

    /// Adds a relation. Returns false if it was skipped as malformed.
    ///
    /// Endpoints missing from the task list become plain automatic nodes.
    pub fn add_relation(&mut self, relation: &Relation) -> bool {
        let Some(kind) = relation.kind() else {
            tracing::trace!(%relation, "skipping relation without exactly one kind");
            self.skipped += 1;
            return false;
        };

        let from = self.ensure_node(&relation.from);
        let to = self.ensure_node(&relation.to);
        self.graph.add_edge(from, to, kind);
        true
    }

    fn ensure_node(&mut self, task_id: &TaskId) -> NodeIndex {
        if let Some(idx) = self.node_map.get(task_id) {
            return *idx;
        }
        let idx = self.graph.add_node(task_id.clone());
        self.node_map.insert(task_id.clone(), idx);
        idx
    }

    fn edges(&self, task_id: &TaskId, direction: Direction, kinds: &[RelationKind]) -> Vec<Edge> {
        let Some(idx) = self.node_map.get(task_id) else {
            return vec![];
        };

        self.graph
            .edges_directed(*idx, direction)
            .filter(|e| kinds.contains(e.weight()))
            .map(|e| Edge {
                from: self.graph[e.source()].clone(),
                to: self.graph[e.target()].clone(),
                kind: *e.weight(),
            })
            .collect()
    }

    /// Returns true if the graph contains the task
    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.node_map.contains_key(task_id)
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    /// Number of well-formed relations
    pub fn relation_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of relations rejected as malformed
    pub fn skipped_relations(&self) -> usize {
        self.skipped
    }
}

impl SchedulingGraph for RelationGraph {
    fn relations_to(&self, task: &TaskId, kinds: &[RelationKind]) -> Result<Vec<Edge>, AccessError> {
        Ok(self.edges(task, Direction::Incoming, kinds))
    }

    fn relations_from(
        &self,
        task: &TaskId,
        kinds: &[RelationKind],
    ) -> Result<Vec<Edge>, AccessError> {
        Ok(self.edges(task, Direction::Outgoing, kinds))
    }

    fn is_manual(&self, task: &TaskId) -> Result<bool, AccessError> {
        Ok(self.manual.contains(task))
    }

    fn is_hierarchy_leaf(&self, task: &TaskId) -> Result<bool, AccessError> {
        let Some(idx) = self.node_map.get(task) else {
            return Ok(true);
        };
        Ok(!self
            .graph
            .edges_directed(*idx, Direction::Outgoing)
            .any(|e| *e.weight() == RelationKind::Hierarchy))
    }
}
