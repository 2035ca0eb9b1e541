//! Task CLI commands

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Subcommand;

use super::output::Output;
use crate::domain::{Task, TaskId};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task
    ///
    /// Examples:
    ///   sched task add "Pour foundation"
    ///   sched task add "Inspection" --id inspect --manual --start 2026-03-02
    Add {
        /// Task title
        title: String,

        /// Explicit ID (generated from the title otherwise)
        #[arg(long)]
        id: Option<String>,

        /// Pin the schedule so automatic rescheduling leaves it alone
        #[arg(long)]
        manual: bool,

        /// Planned start (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Planned finish (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
    },

    /// List all tasks
    List,

    /// Show task details and relations
    Show {
        /// Task ID
        id: String,
    },

    /// Schedule a task manually
    Manual {
        /// Task ID
        id: String,
    },

    /// Schedule a task automatically
    Auto {
        /// Task ID
        id: String,
    },

    /// Set planned dates; an omitted date is cleared
    Dates {
        /// Task ID
        id: String,

        /// Planned start (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Planned finish (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
    },

    /// Remove a task and every relation touching it
    Remove {
        /// Task ID
        id: String,
    },
}

pub fn run(cmd: TaskCommands, output: &Output) -> Result<()> {
    match cmd {
        TaskCommands::Add {
            title,
            id,
            manual,
            start,
            due,
        } => add_task(output, &title, id.as_deref(), manual, start, due),
        TaskCommands::List => list_tasks(output),
        TaskCommands::Show { id } => show_task(output, &id),
        TaskCommands::Manual { id } => set_manual(output, &id, true),
        TaskCommands::Auto { id } => set_manual(output, &id, false),
        TaskCommands::Dates { id, start, due } => set_dates(output, &id, start, due),
        TaskCommands::Remove { id } => remove_task(output, &id),
    }
}

fn check_dates(start: Option<NaiveDate>, due: Option<NaiveDate>) -> Result<()> {
    if let (Some(start), Some(due)) = (start, due) {
        if start > due {
            anyhow::bail!("Start date {} is after due date {}", start, due);
        }
    }
    Ok(())
}

fn load_task(project: &Project, id_str: &str) -> Result<Task> {
    let id: TaskId = id_str.parse()?;
    project
        .task_store()
        .get(&id)?
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))
}

fn add_task(
    output: &Output,
    title: &str,
    id: Option<&str>,
    manual: bool,
    start: Option<NaiveDate>,
    due: Option<NaiveDate>,
) -> Result<()> {
    check_dates(start, due)?;

    let project = Project::open_current()?;
    let store = project.task_store();

    let task_id = match id {
        Some(id) => id.parse()?,
        None => TaskId::generate(title, Utc::now()),
    };

    if store.get(&task_id)?.is_some() {
        anyhow::bail!("Task already exists: {}", task_id);
    }

    let mut task = Task::new(task_id, title).manual(manual);
    if start.is_some() || due.is_some() {
        task.set_dates(start, due);
    }
    store.append(&task)?;

    output.verbose_ctx("task", &format!("Appended {} to {}", task.id, store.path().display()));

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!("Created task: {} - {}", task.id, task.title));
    }

    Ok(())
}

fn list_tasks(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let tasks = project.task_store().read_all()?;

    // Sort by ID
    let mut sorted: Vec<_> = tasks.values().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    if output.is_json() {
        output.data(&sorted);
    } else if sorted.is_empty() {
        println!("No tasks");
    } else {
        println!("{:<20} {:<8} {:<24} TITLE", "ID", "MODE", "DATES");
        println!("{}", "-".repeat(70));

        for task in sorted {
            println!(
                "{:<20} {:<8} {:<24} {}",
                task.id,
                mode(task),
                task.date_range(),
                task.title
            );
        }
    }

    Ok(())
}

fn mode(task: &Task) -> &'static str {
    if task.scheduled_manually {
        "manual"
    } else {
        "auto"
    }
}

fn show_task(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let task = load_task(&project, id_str)?;

    let relations: Vec<_> = project
        .relation_store()
        .read_all()?
        .into_iter()
        .filter(|r| r.touches(&task.id))
        .collect();

    if output.is_json() {
        output.data(&serde_json::json!({
            "task": task,
            "relations": relations,
        }));
    } else {
        println!("ID:       {}", task.id);
        println!("Title:    {}", task.title);
        println!("Mode:     {}", mode(&task));
        println!("Dates:    {}", task.date_range());
        println!("Created:  {}", task.created_at.format("%Y-%m-%d %H:%M"));
        println!("Updated:  {}", task.updated_at.format("%Y-%m-%d %H:%M"));

        if !relations.is_empty() {
            println!();
            println!("Relations:");
            for relation in &relations {
                println!("  {}", relation);
            }
        }
    }

    Ok(())
}

fn set_manual(output: &Output, id_str: &str, manual: bool) -> Result<()> {
    let project = Project::open_current()?;
    let mut task = load_task(&project, id_str)?;

    let changed = task.set_manual(manual);
    if changed {
        project.task_store().update(&task)?;
    }

    let message = match (changed, manual) {
        (true, true) => format!("{} is now scheduled manually", task.id),
        (true, false) => format!("{} is now scheduled automatically", task.id),
        (false, true) => format!("{} was already scheduled manually", task.id),
        (false, false) => format!("{} was already scheduled automatically", task.id),
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": task.id,
            "scheduled_manually": task.scheduled_manually,
            "changed": changed,
        }));
    } else {
        output.success(&message);
    }

    Ok(())
}

fn set_dates(
    output: &Output,
    id_str: &str,
    start: Option<NaiveDate>,
    due: Option<NaiveDate>,
) -> Result<()> {
    check_dates(start, due)?;

    let project = Project::open_current()?;
    let mut task = load_task(&project, id_str)?;

    task.set_dates(start, due);
    project.task_store().update(&task)?;

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!("{} dates: {}", task.id, task.date_range()));
    }

    Ok(())
}

fn remove_task(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let task = load_task(&project, id_str)?;

    project.task_store().remove(&task.id)?;
    let dropped = project.relation_store().remove_touching(&task.id)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "removed": task.id,
            "relations_removed": dropped,
        }));
    } else {
        output.success(&format!(
            "Removed task {} ({} relation(s) dropped)",
            task.id, dropped
        ));
    }

    Ok(())
}
