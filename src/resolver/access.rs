//! The read-only graph contract the resolver runs against
//!
//! Backends (the in-memory [`RelationGraph`](crate::domain::RelationGraph),
//! the SQLite [`CacheView`](crate::storage::CacheView)) implement
//! [`SchedulingGraph`] so the resolver never knows where relations live.
//! Implementations must only ever return well-formed relations: a stored
//! relation with zero or several kind flags does not exist for scheduling.

use std::error::Error as StdError;
use thiserror::Error;

use crate::domain::{RelationKind, TaskId};

/// Failure reading from the underlying relation store
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Relation storage unavailable while {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl AccessError {
    /// Wraps a backend error with a description of the failed read
    pub fn storage(
        context: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        AccessError::Storage {
            context: context.into(),
            source: source.into(),
        }
    }
}

/// A well-formed relation as seen by the resolver
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: TaskId,
    pub to: TaskId,
    pub kind: RelationKind,
}

/// Read access to relations and manual flags
///
/// One resolution issues many reads; callers wanting a consistent view must
/// hand the resolver a snapshot (an in-memory graph or a read transaction).
pub trait SchedulingGraph {
    /// Well-formed relations with `to == task` and a kind in `kinds`
    fn relations_to(&self, task: &TaskId, kinds: &[RelationKind]) -> Result<Vec<Edge>, AccessError>;

    /// Well-formed relations with `from == task` and a kind in `kinds`
    fn relations_from(&self, task: &TaskId, kinds: &[RelationKind])
        -> Result<Vec<Edge>, AccessError>;

    /// Whether the task is scheduled manually. Unknown tasks are automatic.
    fn is_manual(&self, task: &TaskId) -> Result<bool, AccessError>;

    /// Whether the task has no hierarchy children
    fn is_hierarchy_leaf(&self, task: &TaskId) -> Result<bool, AccessError> {
        Ok(self
            .relations_from(task, &[RelationKind::Hierarchy])?
            .is_empty())
    }
}

impl<G: SchedulingGraph + ?Sized> SchedulingGraph for &G {
    fn relations_to(&self, task: &TaskId, kinds: &[RelationKind]) -> Result<Vec<Edge>, AccessError> {
        (**self).relations_to(task, kinds)
    }

    fn relations_from(
        &self,
        task: &TaskId,
        kinds: &[RelationKind],
    ) -> Result<Vec<Edge>, AccessError> {
        (**self).relations_from(task, kinds)
    }

    fn is_manual(&self, task: &TaskId) -> Result<bool, AccessError> {
        (**self).is_manual(task)
    }

    fn is_hierarchy_leaf(&self, task: &TaskId) -> Result<bool, AccessError> {
        (**self).is_hierarchy_leaf(task)
    }
}
