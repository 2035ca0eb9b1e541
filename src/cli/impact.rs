//! Impact command: which tasks need rescheduling

use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::output::Output;
use crate::domain::{Task, TaskId};
use crate::resolver::{CyclePolicy, ImpactResolver, Resolution, ResolveOptions, SchedulingGraph};
use crate::storage::Project;

#[derive(Args)]
pub struct ImpactArgs {
    /// Tasks whose dates, scheduling mode or relations changed
    pub seeds: Vec<String>,

    /// Show every path, manual barrier and exclusion
    #[arg(long)]
    pub explain: bool,

    /// Load relations into memory instead of reading the SQLite cache
    #[arg(long)]
    pub no_cache: bool,

    /// Longest chain of tasks a single path may contain
    #[arg(long)]
    pub max_path_len: Option<usize>,

    /// Most (task, path) records one resolution may produce
    #[arg(long)]
    pub max_paths: Option<usize>,

    /// What to do when a path would revisit one of its own tasks
    #[arg(long, value_enum)]
    pub on_cycle: Option<CyclePolicy>,
}

/// One impacted task as printed
#[derive(Serialize)]
struct ImpactRow<'a> {
    id: &'a TaskId,
    title: Option<&'a str>,
    start_date: Option<String>,
    due_date: Option<String>,
}

pub fn run(args: ImpactArgs, output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let tasks = project.task_store().read_all()?;

    let mut seeds = Vec::with_capacity(args.seeds.len());
    for raw in &args.seeds {
        let id: TaskId = raw.parse()?;
        if !tasks.contains_key(&id) {
            anyhow::bail!("Task not found: {}", id);
        }
        seeds.push(id);
    }

    let mut limits = project.config().project.resolver.clone();
    if let Some(max_path_len) = args.max_path_len {
        limits.max_path_len = max_path_len;
    }
    if let Some(max_paths) = args.max_paths {
        limits.max_paths = max_paths;
    }
    if let Some(on_cycle) = args.on_cycle {
        limits.on_cycle = on_cycle;
    }
    let options = limits.to_options()?;

    let use_cache = project.config().project.cache.enabled && !args.no_cache;
    output.verbose_ctx(
        "impact",
        &format!(
            "Resolving {} seed(s) via {}",
            seeds.len(),
            if use_cache { "cache" } else { "in-memory graph" }
        ),
    );

    let resolution = if use_cache {
        let mut cache = project.get_or_rebuild_cache()?;
        let view = cache.view().context("Failed to read cache")?;
        explain(&view, options, &seeds)?
    } else {
        let graph = project.snapshot()?;
        output.verbose_ctx(
            "impact",
            &format!(
                "Loaded {} tasks, {} relations ({} ignored)",
                graph.len(),
                graph.relation_count(),
                graph.skipped_relations()
            ),
        );
        explain(&graph, options, &seeds)?
    };

    if args.explain {
        print_explanation(output, &resolution, &tasks);
    } else {
        print_impact(output, &resolution, &tasks);
    }

    Ok(())
}

fn explain<G: SchedulingGraph>(
    graph: G,
    options: ResolveOptions,
    seeds: &[TaskId],
) -> Result<Resolution> {
    ImpactResolver::with_options(graph, options)
        .explain(seeds)
        .context("Impact resolution failed")
}

fn rows<'a>(resolution: &'a Resolution, tasks: &'a HashMap<TaskId, Task>) -> Vec<ImpactRow<'a>> {
    resolution
        .impact
        .iter()
        .map(|id| {
            let task = tasks.get(id);
            ImpactRow {
                id,
                title: task.map(|t| t.title.as_str()),
                start_date: task.and_then(|t| t.start_date).map(|d| d.to_string()),
                due_date: task.and_then(|t| t.due_date).map(|d| d.to_string()),
            }
        })
        .collect()
}

fn print_impact(output: &Output, resolution: &Resolution, tasks: &HashMap<TaskId, Task>) {
    let rows = rows(resolution, tasks);

    if output.is_json() {
        output.data(&rows);
        return;
    }

    if rows.is_empty() {
        println!("No tasks need rescheduling");
        return;
    }

    println!("{:<20} {:<24} TITLE", "ID", "DATES");
    println!("{}", "-".repeat(70));
    for id in resolution.impact.iter() {
        let (dates, title) = match tasks.get(id) {
            Some(task) => (task.date_range(), task.title.as_str()),
            None => ("-".to_string(), "(not in task list)"),
        };
        println!("{:<20} {:<24} {}", id, dates, title);
    }
    println!();
    println!("{} task(s) need rescheduling", rows.len());
}

fn join_ids<'a>(ids: impl IntoIterator<Item = &'a TaskId>) -> String {
    let names: Vec<_> = ids.into_iter().map(|t| t.as_str()).collect();
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

fn print_explanation(output: &Output, resolution: &Resolution, tasks: &HashMap<TaskId, Task>) {
    if output.is_json() {
        output.data(&serde_json::json!({
            "resolution": resolution,
            "tasks": rows(resolution, tasks),
        }));
        return;
    }

    println!("Seeds:  {}", join_ids(&resolution.seeds));
    println!("Manual: {}", join_ids(&resolution.manual));
    println!();

    println!("Paths ({}):", resolution.paths.len());
    for record in &resolution.paths {
        println!("  {:<20} {}", record.node, record.path);
    }

    if !resolution.excluded.is_empty() {
        println!();
        println!("Excluded ({}):", resolution.excluded.len());
        for exclusion in &resolution.excluded {
            println!("  {}", exclusion.node);
            for broken in &exclusion.broken_paths {
                println!(
                    "    {}  (broken at {})",
                    broken.path,
                    join_ids(&broken.broken_at)
                );
            }
        }
    }

    if resolution.pruned_cycles > 0 {
        println!();
        println!("Pruned cycles: {}", resolution.pruned_cycles);
    }

    println!();
    println!(
        "Impact ({}): {}",
        resolution.impact.len(),
        join_ids(&resolution.impact)
    );
}
