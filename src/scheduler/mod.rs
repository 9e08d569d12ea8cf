//! Scheduler
//!
//! Pure selection logic: given the task graph, pick which ready tasks to
//! dispatch this tick. The decision is deterministic for a given graph
//! state, iterating ready tasks in registration order. Two filters apply
//! in order: the concurrency cap, then write-set disjointness against
//! everything running and everything already picked this tick.
//!
//! Disjointness is judged on DECLARED write-sets only. A worker that
//! strays outside its declaration can still race a sibling; that hole is
//! closed after the fact by rogue-edit detection, not here.

pub mod orchestrator;

use crate::models::Task;
use crate::graph::TaskGraph;

/// Pick the task ids to dispatch this tick, in registration order
pub fn select_dispatchable(graph: &TaskGraph, max_parallel: usize) -> Vec<String> {
    let running = graph.running_tasks();
    let mut free_slots = max_parallel.saturating_sub(running.len());
    if free_slots == 0 {
        return Vec::new();
    }

    let mut selected: Vec<&Task> = Vec::new();
    for task in graph.ready_tasks() {
        if free_slots == 0 {
            break;
        }

        let conflicts_running = running.iter().any(|r| task.writes_conflict_with(r));
        let conflicts_selected = selected.iter().any(|s| task.writes_conflict_with(s));
        if conflicts_running || conflicts_selected {
            log::debug!(
                "[Scheduler] Holding task '{}' back on write-set conflict",
                task.id
            );
            continue;
        }

        selected.push(task);
        free_slots -= 1;
    }

    selected.into_iter().map(|t| t.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComplexityClass, Task};

    fn graph_of(tasks: Vec<Task>) -> TaskGraph {
        let mut graph = TaskGraph::new();
        for task in tasks {
            graph.register(task).unwrap();
        }
        graph
    }

    #[test]
    fn test_cap_limits_selection() {
        let graph = graph_of(
            (0..10)
                .map(|i| Task::new(&format!("t{}", i), "p").with_writes(&[&format!("f{}.rs", i)]))
                .collect(),
        );

        let picked = select_dispatchable(&graph, 6);
        assert_eq!(picked.len(), 6);
        assert_eq!(picked[0], "t0");
        assert_eq!(picked[5], "t5");
    }

    #[test]
    fn test_running_tasks_consume_slots() {
        let mut graph = graph_of(
            (0..4)
                .map(|i| Task::new(&format!("t{}", i), "p").with_writes(&[&format!("f{}.rs", i)]))
                .collect(),
        );
        graph.mark_running("t0").unwrap();
        graph.mark_running("t1").unwrap();

        let picked = select_dispatchable(&graph, 3);
        assert_eq!(picked, vec!["t2".to_string()]);
    }

    #[test]
    fn test_write_conflict_with_running_holds_task() {
        let mut graph = graph_of(vec![
            Task::new("a", "p").with_writes(&["shared.rs"]),
            Task::new("b", "p").with_writes(&["shared.rs", "other.rs"]),
            Task::new("c", "p").with_writes(&["unrelated.rs"]),
        ]);
        graph.mark_running("a").unwrap();

        let picked = select_dispatchable(&graph, 6);
        assert_eq!(picked, vec!["c".to_string()]);
    }

    #[test]
    fn test_conflicting_ready_pair_dispatches_only_first() {
        let graph = graph_of(vec![
            Task::new("first", "p").with_writes(&["x.rs"]),
            Task::new("second", "p").with_writes(&["x.rs"]),
        ]);

        let picked = select_dispatchable(&graph, 6);
        assert_eq!(picked, vec!["first".to_string()]);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let build = || {
            graph_of(vec![
                Task::new("alpha", "p").with_writes(&["a.rs"]),
                Task::new("beta", "p").with_writes(&["b.rs"]),
                Task::new("gamma", "p").with_writes(&["a.rs"]),
            ])
        };

        assert_eq!(select_dispatchable(&build(), 6), select_dispatchable(&build(), 6));
        assert_eq!(
            select_dispatchable(&build(), 6),
            vec!["alpha".to_string(), "beta".to_string()]
        );
    }

    #[test]
    fn test_unmet_dependencies_are_not_selected() {
        let graph = graph_of(vec![
            Task::new("base", "p").with_writes(&["base.rs"]),
            Task::new("child", "p")
                .with_writes(&["child.rs"])
                .with_dependencies(&["base"]),
        ]);

        let picked = select_dispatchable(&graph, 6);
        assert_eq!(picked, vec!["base".to_string()]);
    }

    #[test]
    fn test_empty_write_sets_never_conflict() {
        let graph = graph_of(vec![
            Task::new("a", "p").with_complexity(ComplexityClass::Small),
            Task::new("b", "p"),
        ]);

        let picked = select_dispatchable(&graph, 6);
        assert_eq!(picked.len(), 2);
    }
}
