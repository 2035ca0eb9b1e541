//! Domain models for sched
//!
//! Contains the core data types without any I/O concerns.

mod id;
mod task;
mod relation;
mod graph;

pub use id::{IdError, TaskId};
pub use task::Task;
pub use relation::{KindSet, Relation, RelationKind, RelationKindError};
pub use graph::RelationGraph;
