//! Broken-path filtering
//!
//! A task is clean if at least one of its candidate rows carries no manual
//! barrier. A candidate survives only if every task on its path is clean;
//! automatic scheduling never crosses a manual pin.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::leaf::Candidate;
use super::paths::TaskPath;
use crate::domain::TaskId;

/// A discovered task that no surviving path reaches
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    pub node: TaskId,
    /// Paths that reached the task, each with the tasks that broke it
    pub broken_paths: Vec<BrokenPath>,
}

/// A path and its non-clean waypoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenPath {
    pub path: TaskPath,
    pub broken_at: Vec<TaskId>,
}

/// Output of the filter stage
#[derive(Debug, Default)]
pub(crate) struct Filtered {
    pub impact: BTreeSet<TaskId>,
    pub excluded: Vec<Exclusion>,
}

/// Drops every candidate whose path leaves the clean set, then removes seeds
pub(crate) fn filter_broken_paths(candidates: &[Candidate], seeds: &BTreeSet<TaskId>) -> Filtered {
    let clean: HashSet<&TaskId> = candidates
        .iter()
        .filter(|c| c.is_clean())
        .map(|c| &c.node)
        .collect();

    let mut survivors: BTreeSet<TaskId> = BTreeSet::new();
    let mut broken: BTreeMap<&TaskId, Vec<BrokenPath>> = BTreeMap::new();

    for candidate in candidates {
        let broken_at: Vec<TaskId> = candidate
            .path
            .iter()
            .filter(|t| !clean.contains(t))
            .cloned()
            .collect();

        if broken_at.is_empty() {
            survivors.insert(candidate.node.clone());
            continue;
        }

        let entry = broken.entry(&candidate.node).or_default();
        if !entry.iter().any(|b| b.path == candidate.path) {
            entry.push(BrokenPath {
                path: candidate.path.clone(),
                broken_at,
            });
        }
    }

    let excluded = broken
        .into_iter()
        .filter(|(node, _)| !survivors.contains(*node) && !seeds.contains(*node))
        .map(|(node, broken_paths)| Exclusion {
            node: node.clone(),
            broken_paths,
        })
        .collect();

    let impact = survivors.difference(seeds).cloned().collect();

    Filtered { impact, excluded }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    fn path(steps: &[&str]) -> TaskPath {
        let mut ids = steps.iter().map(|s| id(s));
        let mut p = TaskPath::seed(ids.next().unwrap());
        for step in ids {
            p = p.extended(step);
        }
        p
    }

    fn row(steps: &[&str], barrier: &[&str]) -> Candidate {
        let path = path(steps);
        Candidate {
            node: path.last().clone(),
            path,
            leaf_child: None,
            barrier: barrier.iter().map(|b| id(b)).collect(),
        }
    }

    fn seeds(ids: &[&str]) -> BTreeSet<TaskId> {
        ids.iter().map(|s| id(s)).collect()
    }

    fn names(set: &BTreeSet<TaskId>) -> Vec<String> {
        set.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn clean_paths_survive_and_seeds_are_removed() {
        let rows = vec![row(&["A"], &[]), row(&["A", "B"], &[]), row(&["A", "B", "C"], &[])];
        let out = filter_broken_paths(&rows, &seeds(&["A"]));
        assert_eq!(names(&out.impact), vec!["B", "C"]);
        assert!(out.excluded.is_empty());
    }

    #[test]
    fn manual_waypoint_breaks_downstream_paths() {
        let rows = vec![
            row(&["A"], &[]),
            row(&["A", "B"], &[]),
            row(&["A", "B", "C"], &["C"]),
            row(&["A", "B", "C", "D"], &["C"]),
        ];
        let out = filter_broken_paths(&rows, &seeds(&["A"]));
        assert_eq!(names(&out.impact), vec!["B"]);

        let excluded: Vec<_> = out.excluded.iter().map(|e| e.node.to_string()).collect();
        assert_eq!(excluded, vec!["C", "D"]);
        let d = &out.excluded[1];
        assert_eq!(d.broken_paths[0].broken_at, vec![id("C"), id("D")]);
    }

    #[test]
    fn one_clean_row_makes_a_node_clean() {
        let mut via_m = row(&["A", "P"], &["M"]);
        via_m.leaf_child = Some(id("M"));
        let mut via_a = row(&["A", "P"], &[]);
        via_a.leaf_child = Some(id("A"));

        let rows = vec![row(&["A"], &[]), via_m, via_a, row(&["A", "P", "X"], &[])];
        let out = filter_broken_paths(&rows, &seeds(&["A"]));
        assert_eq!(names(&out.impact), vec!["P", "X"]);
    }

    #[test]
    fn node_survives_if_any_path_survives() {
        let rows = vec![
            row(&["A"], &[]),
            row(&["A", "B"], &[]),
            row(&["A", "M"], &["M"]),
            row(&["A", "B", "D"], &["M"]),
            row(&["A", "M", "D"], &["M"]),
        ];
        // D is tainted by M on one path, so D itself is not clean and
        // every path ending in D is broken at D.
        let out = filter_broken_paths(&rows, &seeds(&["A"]));
        assert_eq!(names(&out.impact), vec!["B"]);

        let rows = vec![
            row(&["A"], &[]),
            row(&["A", "B"], &[]),
            row(&["A", "B", "D"], &[]),
            row(&["A", "C"], &["C"]),
        ];
        let out = filter_broken_paths(&rows, &seeds(&["A"]));
        assert_eq!(names(&out.impact), vec!["B", "D"]);
    }

    #[test]
    fn manual_seed_blocks_everything() {
        let rows = vec![row(&["A"], &["A"]), row(&["A", "B"], &["A"])];
        let out = filter_broken_paths(&rows, &seeds(&["A"]));
        assert!(out.impact.is_empty());
        assert_eq!(out.excluded.len(), 1);
        assert_eq!(out.excluded[0].node, id("B"));
    }

    #[test]
    fn empty_input() {
        let out = filter_broken_paths(&[], &BTreeSet::new());
        assert!(out.impact.is_empty());
        assert!(out.excluded.is_empty());
    }
}
