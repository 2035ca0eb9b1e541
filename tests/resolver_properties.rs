//! Property tests for impact resolution on random graphs

use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;
use schedule_impact::domain::KindSet;
use schedule_impact::storage::Cache;
use schedule_impact::{ImpactResolver, Relation, RelationGraph, RelationKind, Task, TaskId};
use tempfile::TempDir;

#[derive(Debug, Clone)]
struct Scenario {
    manual: Vec<bool>,
    /// (from, to, kind indexes); zero or several kinds make a malformed row
    relations: Vec<(usize, usize, Vec<usize>)>,
    seeds: Vec<usize>,
}

fn id(i: usize) -> TaskId {
    format!("n{}", i).parse().unwrap()
}

fn scenario() -> impl Strategy<Value = Scenario> {
    (2usize..7)
        .prop_flat_map(|n| {
            (
                prop::collection::vec(prop::bool::weighted(0.2), n),
                prop::collection::vec(
                    (0..n, 0..n, prop::collection::vec(0..RelationKind::ALL.len(), 0..3)),
                    0..12,
                ),
                prop::collection::vec(0..n, 0..3),
            )
        })
        .prop_map(|(manual, relations, seeds)| Scenario {
            manual,
            relations,
            seeds,
        })
}

impl Scenario {
    fn tasks(&self) -> Vec<Task> {
        self.manual
            .iter()
            .enumerate()
            .map(|(i, &m)| Task::new(id(i), format!("Task {}", i)).manual(m))
            .collect()
    }

    fn relations(&self) -> Vec<Relation> {
        self.relations
            .iter()
            .map(|(from, to, kinds)| Relation {
                from: id(*from),
                to: id(*to),
                kinds: kinds.iter().map(|&k| RelationKind::ALL[k]).collect::<KindSet>(),
            })
            .collect()
    }

    fn seeds(&self) -> Vec<TaskId> {
        self.seeds.iter().map(|&s| id(s)).collect()
    }

    fn graph(&self) -> RelationGraph {
        RelationGraph::from_parts(&self.tasks(), &self.relations())
    }

    fn resolve(&self) -> BTreeSet<TaskId> {
        ImpactResolver::new(&self.graph())
            .resolve(&self.seeds())
            .unwrap()
            .into_inner()
    }
}

proptest! {
    #[test]
    fn resolution_terminates(s in scenario()) {
        let graph = s.graph();
        prop_assert!(ImpactResolver::new(&graph).explain(&s.seeds()).is_ok());
    }

    #[test]
    fn empty_seeds_give_empty_impact(s in scenario()) {
        let graph = s.graph();
        let impact = ImpactResolver::new(&graph).resolve(&Vec::<TaskId>::new()).unwrap();
        prop_assert!(impact.is_empty());
    }

    #[test]
    fn seeds_are_never_returned(s in scenario()) {
        let impact = s.resolve();
        for seed in s.seeds() {
            prop_assert!(!impact.contains(&seed));
        }
    }

    #[test]
    fn manual_tasks_are_never_returned(s in scenario()) {
        let impact = s.resolve();
        for (i, &manual) in s.manual.iter().enumerate() {
            if manual {
                prop_assert!(!impact.contains(&id(i)));
            }
        }
    }

    #[test]
    fn resolution_is_deterministic(s in scenario()) {
        let mut reversed = s.clone();
        reversed.seeds.reverse();
        prop_assert_eq!(s.resolve(), s.resolve());
        prop_assert_eq!(s.resolve(), reversed.resolve());
    }

    #[test]
    fn malformed_and_non_scheduling_relations_are_invisible(s in scenario()) {
        let mut scheduling_only = s.clone();
        scheduling_only.relations.retain(|(_, _, kinds)| {
            let set: KindSet = kinds.iter().map(|&k| RelationKind::ALL[k]).collect();
            set.len() == 1 && set.iter().all(|k| k.affects_schedule())
        });
        prop_assert_eq!(s.resolve(), scheduling_only.resolve());
    }

    #[test]
    fn rerunning_on_the_impact_keeps_excluded_tasks_out(s in scenario()) {
        let graph = s.graph();
        let resolver = ImpactResolver::new(&graph);
        let first = resolver.explain(&s.seeds()).unwrap();

        let rerun = resolver.resolve(&first.impact).unwrap();
        for exclusion in &first.excluded {
            prop_assert!(
                !rerun.contains(&exclusion.node),
                "{} was excluded but came back",
                exclusion.node
            );
        }
    }

    #[test]
    fn follows_only_graphs_reach_every_transitive_follower(s in scenario()) {
        let follows_kind = RelationKind::ALL
            .iter()
            .position(|k| *k == RelationKind::Follows)
            .unwrap();

        let mut follows = s.clone();
        follows.manual = vec![false; s.manual.len()];
        for (_, _, kinds) in &mut follows.relations {
            *kinds = vec![follows_kind];
        }

        let mut expected: BTreeSet<TaskId> = follows.seeds().into_iter().collect();
        loop {
            let before = expected.len();
            for relation in follows.relations() {
                if expected.contains(&relation.to) {
                    expected.insert(relation.from.clone());
                }
            }
            if expected.len() == before {
                break;
            }
        }
        for seed in follows.seeds() {
            expected.remove(&seed);
        }

        prop_assert_eq!(follows.resolve(), expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn cache_view_agrees_with_in_memory_graph(s in scenario()) {
        let dir = TempDir::new().unwrap();
        let mut cache = Cache::open(dir.path()).unwrap();

        let tasks: HashMap<TaskId, Task> =
            s.tasks().into_iter().map(|t| (t.id.clone(), t)).collect();
        cache.rebuild(&tasks, &s.relations()).unwrap();

        let view = cache.view().unwrap();
        let cached = ImpactResolver::new(&view).explain(&s.seeds()).unwrap();
        let in_memory = ImpactResolver::new(&s.graph()).explain(&s.seeds()).unwrap();

        prop_assert_eq!(cached.impact, in_memory.impact);
        prop_assert_eq!(cached.manual, in_memory.manual);
        prop_assert_eq!(cached.paths.len(), in_memory.paths.len());
    }
}
