//! Relation CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::domain::{Relation, RelationKind, TaskId};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum RelationCommands {
    /// Relate two tasks
    ///
    /// Examples:
    ///   sched relation add B follows A     # B starts after A
    ///   sched relation add P hierarchy C   # P is the parent of C
    Add {
        /// Source task
        from: String,

        /// Relation kind (hierarchy, follows, relates, duplicates, blocks, includes, requires)
        kind: RelationKind,

        /// Target task
        to: String,
    },

    /// List relations
    List {
        /// Only relations touching this task
        #[arg(long)]
        task: Option<String>,
    },

    /// Remove a relation
    Remove {
        /// Source task
        from: String,

        /// Relation kind
        kind: RelationKind,

        /// Target task
        to: String,
    },
}

pub fn run(cmd: RelationCommands, output: &Output) -> Result<()> {
    match cmd {
        RelationCommands::Add { from, kind, to } => add_relation(output, &from, kind, &to),
        RelationCommands::List { task } => list_relations(output, task.as_deref()),
        RelationCommands::Remove { from, kind, to } => remove_relation(output, &from, kind, &to),
    }
}

fn add_relation(output: &Output, from: &str, kind: RelationKind, to: &str) -> Result<()> {
    let from: TaskId = from.parse()?;
    let to: TaskId = to.parse()?;

    if from == to {
        anyhow::bail!("A task cannot be related to itself: {}", from);
    }

    let project = Project::open_current()?;
    let tasks = project.task_store().read_all()?;
    for id in [&from, &to] {
        if !tasks.contains_key(id) {
            anyhow::bail!("Task not found: {}", id);
        }
    }

    let relation = Relation::new(from, to, kind);
    let added = project.relation_store().add(relation.clone())?;

    if !kind.affects_schedule() {
        output.verbose_ctx(
            "relation",
            &format!("{} relations do not affect scheduling", kind),
        );
    }

    if output.is_json() {
        output.data(&serde_json::json!({
            "relation": relation,
            "added": added,
        }));
    } else if added {
        output.success(&format!("Added relation: {}", relation));
    } else {
        output.success(&format!("Relation already exists: {}", relation));
    }

    Ok(())
}

fn list_relations(output: &Output, task: Option<&str>) -> Result<()> {
    let filter: Option<TaskId> = task.map(str::parse).transpose()?;

    let project = Project::open_current()?;
    let mut relations = project.relation_store().read_all()?;
    if let Some(task) = &filter {
        relations.retain(|r| r.touches(task));
    }

    if output.is_json() {
        output.data(&relations);
    } else if relations.is_empty() {
        println!("No relations");
    } else {
        println!("{:<20} {:<12} {:<20} NOTE", "FROM", "KIND", "TO");
        println!("{}", "-".repeat(70));

        for relation in &relations {
            let note = if relation.is_well_formed() {
                ""
            } else {
                "ignored (needs exactly one kind)"
            };
            println!(
                "{:<20} {:<12} {:<20} {}",
                relation.from,
                relation.kinds.to_string(),
                relation.to,
                note
            );
        }
    }

    Ok(())
}

fn remove_relation(output: &Output, from: &str, kind: RelationKind, to: &str) -> Result<()> {
    let from: TaskId = from.parse()?;
    let to: TaskId = to.parse()?;

    let project = Project::open_current()?;
    let removed = project.relation_store().remove(&from, &to, Some(kind))?;

    if removed == 0 {
        anyhow::bail!("No relation: {} {} {}", from, kind, to);
    }

    if output.is_json() {
        output.data(&serde_json::json!({ "removed": removed }));
    } else {
        output.success(&format!("Removed relation: {} {} {}", from, kind, to));
    }

    Ok(())
}
