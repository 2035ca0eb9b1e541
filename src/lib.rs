//! Schedule impact resolution for local-first task projects
//!
//! When tasks change their dates, their manual-scheduling flag or their
//! relations, other tasks linked to them through `follows` and `hierarchy`
//! relations may need their schedule recomputed. This crate finds exactly
//! those tasks, without crossing tasks whose schedule is pinned manually.
//!
//! The [`resolver`] module holds the algorithm and works against any
//! [`SchedulingGraph`]. The [`storage`] and [`cli`] modules wrap it into the
//! `sched` command line tool.

pub mod domain;
pub mod resolver;
pub mod storage;
pub mod cli;

pub use domain::{Relation, RelationGraph, RelationKind, Task, TaskId};
pub use resolver::{ImpactResolver, ImpactSet, ResolveError, ResolveOptions, SchedulingGraph};
