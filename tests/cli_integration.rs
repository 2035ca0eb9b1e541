//! CLI integration tests for sched
//!
//! These tests drive the binary end to end: project setup, task and relation
//! management, and impact queries through both the SQLite cache and the
//! in-memory graph.

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command instance for the sched binary, isolated from user config
fn sched_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("sched"));
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

/// Create a temporary directory and initialize a sched project
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    sched_cmd(dir.path()).arg("init").assert().success();
    dir
}

fn add_task(dir: &Path, id: &str, manual: bool) {
    let mut cmd = sched_cmd(dir);
    cmd.args(["task", "add", &format!("Task {}", id), "--id", id]);
    if manual {
        cmd.arg("--manual");
    }
    cmd.assert().success();
}

fn relate(dir: &Path, from: &str, kind: &str, to: &str) {
    sched_cmd(dir)
        .args(["relation", "add", from, kind, to])
        .assert()
        .success();
}

/// Runs `impact` in JSON mode and returns the impacted IDs
fn impact(dir: &Path, seeds: &[&str], extra: &[&str]) -> Vec<String> {
    let out = sched_cmd(dir)
        .args(["--format", "json", "impact"])
        .args(seeds)
        .args(extra)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "impact failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let rows: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    rows.as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect()
}

/// Same query through the cache and through the in-memory graph
fn impact_both(dir: &Path, seeds: &[&str]) -> Vec<String> {
    let cached = impact(dir, seeds, &[]);
    let in_memory = impact(dir, seeds, &["--no-cache"]);
    assert_eq!(cached, in_memory, "cache and in-memory results differ");
    cached
}

/// A <- B (follows), C parent of B, D follows C
fn chain_project(manual: &[&str]) -> TempDir {
    let dir = setup_project();
    for id in ["A", "B", "C", "D"] {
        add_task(dir.path(), id, manual.contains(&id));
    }
    relate(dir.path(), "B", "follows", "A");
    relate(dir.path(), "C", "hierarchy", "B");
    relate(dir.path(), "D", "follows", "C");
    dir
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();

    sched_cmd(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized sched project"));

    assert!(dir.path().join(".sched").is_dir());
    assert!(dir.path().join(".sched/config.toml").is_file());
    assert!(dir.path().join(".sched/.gitignore").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let dir = TempDir::new().unwrap();

    sched_cmd(dir.path()).arg("init").assert().success();
    sched_cmd(dir.path()).arg("init").assert().success();
}

#[test]
fn test_commands_outside_project_fail() {
    let dir = TempDir::new().unwrap();

    sched_cmd(dir.path())
        .args(["task", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not in a sched project"));
}

// =============================================================================
// Task and Relation Tests
// =============================================================================

#[test]
fn test_task_add_and_list() {
    let dir = setup_project();

    sched_cmd(dir.path())
        .args(["task", "add", "Pour foundation"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task: t-"));

    add_task(dir.path(), "inspect", true);

    sched_cmd(dir.path())
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pour foundation"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("manual"));
}

#[test]
fn test_task_add_rejects_duplicates_and_bad_dates() {
    let dir = setup_project();
    add_task(dir.path(), "A", false);

    sched_cmd(dir.path())
        .args(["task", "add", "Again", "--id", "A"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    sched_cmd(dir.path())
        .args([
            "task", "add", "Backwards", "--start", "2026-05-02", "--due", "2026-05-01",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("after due date"));
}

#[test]
fn test_manual_and_auto_toggle() {
    let dir = setup_project();
    add_task(dir.path(), "A", false);

    sched_cmd(dir.path())
        .args(["task", "manual", "A"])
        .assert()
        .success()
        .stdout(predicate::str::contains("now scheduled manually"));

    sched_cmd(dir.path())
        .args(["task", "manual", "A"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already scheduled manually"));

    sched_cmd(dir.path())
        .args(["task", "auto", "A"])
        .assert()
        .success()
        .stdout(predicate::str::contains("now scheduled automatically"));
}

#[test]
fn test_relation_requires_known_tasks() {
    let dir = setup_project();
    add_task(dir.path(), "A", false);

    sched_cmd(dir.path())
        .args(["relation", "add", "B", "follows", "A"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task not found: B"));

    sched_cmd(dir.path())
        .args(["relation", "add", "A", "precedes", "A"])
        .assert()
        .failure();
}

#[test]
fn test_relation_list_flags_malformed_rows() {
    let dir = setup_project();
    add_task(dir.path(), "A", false);
    add_task(dir.path(), "B", false);
    relate(dir.path(), "B", "follows", "A");

    // Hand-edited row with two kinds
    let path = dir.path().join(".sched/relations.jsonl");
    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str("{\"from\":\"A\",\"to\":\"B\",\"kinds\":[\"follows\",\"blocks\"]}\n");
    fs::write(&path, content).unwrap();

    sched_cmd(dir.path())
        .args(["relation", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("follows+blocks"))
        .stdout(predicate::str::contains("ignored"));

    // The malformed row does not make A follow B
    assert!(impact_both(dir.path(), &["B"]).is_empty());
}

#[test]
fn test_task_remove_drops_relations() {
    let dir = chain_project(&[]);

    sched_cmd(dir.path())
        .args(["task", "remove", "B"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 relation(s) dropped"));

    sched_cmd(dir.path())
        .args(["relation", "list", "--task", "B"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No relations"));

    assert!(impact_both(dir.path(), &["A"]).is_empty());
}

#[test]
fn test_relation_remove() {
    let dir = chain_project(&[]);

    sched_cmd(dir.path())
        .args(["relation", "remove", "D", "follows", "C"])
        .assert()
        .success();

    sched_cmd(dir.path())
        .args(["relation", "remove", "D", "follows", "C"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No relation"));

    assert_eq!(impact_both(dir.path(), &["A"]), vec!["B", "C"]);
}

// =============================================================================
// Impact Tests
// =============================================================================

#[test]
fn test_impact_follows_chain_through_hierarchy() {
    let dir = chain_project(&[]);
    assert_eq!(impact_both(dir.path(), &["A"]), vec!["B", "C", "D"]);
}

#[test]
fn test_impact_stops_at_manual_task() {
    let dir = chain_project(&["C"]);
    assert_eq!(impact_both(dir.path(), &["A"]), vec!["B"]);
}

#[test]
fn test_impact_sees_manual_flag_change() {
    let dir = chain_project(&[]);
    assert_eq!(impact(dir.path(), &["A"], &[]), vec!["B", "C", "D"]);

    sched_cmd(dir.path())
        .args(["task", "manual", "C"])
        .assert()
        .success();

    // Cache must notice the rewrite
    assert_eq!(impact(dir.path(), &["A"], &[]), vec!["B"]);
}

#[test]
fn test_impact_ignores_non_scheduling_relations() {
    let dir = setup_project();
    add_task(dir.path(), "A", false);
    add_task(dir.path(), "B", false);
    relate(dir.path(), "B", "relates", "A");
    relate(dir.path(), "B", "blocks", "A");

    assert!(impact_both(dir.path(), &["A"]).is_empty());
}

#[test]
fn test_impact_follows_direction() {
    let dir = setup_project();
    add_task(dir.path(), "A", false);
    add_task(dir.path(), "B", false);
    relate(dir.path(), "B", "follows", "A");

    assert_eq!(impact_both(dir.path(), &["A"]), vec!["B"]);
    assert!(impact_both(dir.path(), &["B"]).is_empty());
}

#[test]
fn test_impact_hierarchy_reaches_parent_and_siblings() {
    let dir = setup_project();
    for id in ["P", "A", "S"] {
        add_task(dir.path(), id, false);
    }
    relate(dir.path(), "P", "hierarchy", "A");
    relate(dir.path(), "P", "hierarchy", "S");

    assert_eq!(impact_both(dir.path(), &["A"]), vec!["P", "S"]);
    assert_eq!(impact_both(dir.path(), &["P"]), vec!["A", "S"]);
}

#[test]
fn test_impact_mutual_follows_terminates() {
    let dir = setup_project();
    add_task(dir.path(), "A", false);
    add_task(dir.path(), "B", false);
    relate(dir.path(), "A", "follows", "B");
    relate(dir.path(), "B", "follows", "A");

    assert_eq!(impact_both(dir.path(), &["A"]), vec!["B"]);
}

#[test]
fn test_impact_with_manual_seed_is_empty() {
    let dir = chain_project(&["A"]);
    assert!(impact_both(dir.path(), &["A"]).is_empty());
}

#[test]
fn test_impact_excludes_all_seeds() {
    let dir = chain_project(&[]);
    assert_eq!(impact_both(dir.path(), &["A", "C"]), vec!["B", "D"]);
}

#[test]
fn test_impact_without_seeds_is_empty() {
    let dir = chain_project(&[]);

    sched_cmd(dir.path())
        .arg("impact")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks need rescheduling"));
}

#[test]
fn test_impact_rejects_unknown_seed() {
    let dir = chain_project(&[]);

    sched_cmd(dir.path())
        .args(["impact", "Z"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task not found: Z"));
}

#[test]
fn test_impact_text_output() {
    let dir = chain_project(&["C"]);

    sched_cmd(dir.path())
        .args(["impact", "A"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Task B"))
        .stdout(predicate::str::contains("1 task(s) need rescheduling"));
}

#[test]
fn test_impact_explain_reports_barrier() {
    let dir = chain_project(&["C"]);

    sched_cmd(dir.path())
        .args(["impact", "A", "--explain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Manual: C"))
        .stdout(predicate::str::contains("A -> B -> C -> D"))
        .stdout(predicate::str::contains("broken at C, D"));
}

#[test]
fn test_impact_explain_json() {
    let dir = chain_project(&["C"]);

    let out = sched_cmd(dir.path())
        .args(["--format", "json", "impact", "A", "--explain", "--no-cache"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(doc["resolution"]["impact"], serde_json::json!(["B"]));
    assert_eq!(doc["resolution"]["manual"], serde_json::json!(["C"]));
    assert_eq!(doc["resolution"]["paths"].as_array().unwrap().len(), 4);
}

/// P parent of A and S, S follows A: paths loop back into A
fn triangle_project() -> TempDir {
    let dir = setup_project();
    for id in ["P", "A", "S"] {
        add_task(dir.path(), id, false);
    }
    relate(dir.path(), "P", "hierarchy", "A");
    relate(dir.path(), "P", "hierarchy", "S");
    relate(dir.path(), "S", "follows", "A");
    dir
}

#[test]
fn test_impact_prunes_cycles_by_default() {
    let dir = triangle_project();
    assert_eq!(impact_both(dir.path(), &["A"]), vec!["P", "S"]);
}

#[test]
fn test_impact_reject_cycles() {
    let dir = triangle_project();

    sched_cmd(dir.path())
        .args(["impact", "A", "--on-cycle", "reject"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cycle detected"));
}

#[test]
fn test_impact_path_budget() {
    let dir = chain_project(&[]);

    sched_cmd(dir.path())
        .args(["impact", "A", "--max-path-len", "2", "--no-cache"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("budget exceeded"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = chain_project(&[]);
    fs::write(
        dir.path().join(".sched/config.toml"),
        "[resolver]\nmax_paths = 0\n",
    )
    .unwrap();

    sched_cmd(dir.path())
        .args(["impact", "A"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_paths"));
}

#[test]
fn test_cache_disabled_in_config() {
    let dir = chain_project(&["C"]);
    fs::write(
        dir.path().join(".sched/config.toml"),
        "[cache]\nenabled = false\n",
    )
    .unwrap();

    assert_eq!(impact(dir.path(), &["A"], &[]), vec!["B"]);
    assert!(!dir.path().join(".sched/.cache/sched.db").exists());
}

// =============================================================================
// Cache Tests
// =============================================================================

#[test]
fn test_cache_rebuild_and_status() {
    let dir = chain_project(&[]);

    sched_cmd(dir.path())
        .args(["cache", "rebuild"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 tasks, 3 relations"));

    let out = sched_cmd(dir.path())
        .args(["--format", "json", "cache", "status"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let status: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(status["tasks"], 4);
    assert_eq!(status["relations"], 3);
    assert_eq!(status["malformed_relations"], 0);
}

#[test]
fn test_verbose_logs_go_to_stderr() {
    let dir = chain_project(&[]);

    let out = sched_cmd(dir.path())
        .args(["--verbose", "--format", "json", "impact", "A"])
        .output()
        .unwrap();
    assert!(out.status.success());

    // stdout stays machine-readable
    let rows: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 3);
    assert!(String::from_utf8_lossy(&out.stderr).contains("Resolving 1 seed(s)"));
}
