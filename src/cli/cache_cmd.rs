//! Cache CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::storage::Project;

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Rebuild the cache from source files
    Rebuild,

    /// Show cache status
    Status,
}

pub fn run(cmd: CacheCommands, output: &Output) -> Result<()> {
    match cmd {
        CacheCommands::Rebuild => rebuild(output),
        CacheCommands::Status => status(output),
    }
}

fn rebuild(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    output.verbose("Rebuilding cache from source files");

    let start = std::time::Instant::now();
    let cache = project.rebuild_cache()?;
    let duration = start.elapsed();

    let status = cache.status()?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "rebuilt": true,
            "duration_ms": duration.as_millis(),
            "tasks": status.tasks,
            "relations": status.relations,
        }));
    } else {
        output.success(&format!(
            "Cache rebuilt in {:?} ({} tasks, {} relations)",
            duration, status.tasks, status.relations
        ));
    }

    Ok(())
}

fn status(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let cache = project.cache()?;
    let status = cache.status()?;

    if output.is_json() {
        output.data(&status);
    } else {
        println!("Cache Status");
        println!("{}", "=".repeat(40));
        println!("Path: {}", status.path.display());
        println!(
            "Status: {}",
            if status.stale {
                "STALE (needs rebuild)"
            } else {
                "fresh"
            }
        );
        match status.last_rebuild {
            Some(at) => println!("Last rebuild: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
            None => println!("Last rebuild: never"),
        }
        println!();
        println!("Cached Data:");
        println!("  Tasks: {}", status.tasks);
        println!(
            "  Relations: {} ({} ignored: not exactly one kind)",
            status.relations, status.malformed_relations
        );

        if status.stale {
            println!();
            println!("Run 'sched cache rebuild' to update the cache.");
        }
    }

    Ok(())
}
