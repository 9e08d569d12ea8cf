//! Task Graph
//!
//! Single owned registry of all tasks, their dependencies, declared
//! write-sets, and lifecycle status. The graph is the only place the
//! scheduler, reaper, and retry controller mutate task state; it does not
//! itself spawn anything.

use crate::models::state_machine::{is_dispatchable_state, is_terminal_state, transition_state};
use crate::models::{StateTransitionError, Task, TaskStatus};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Duplicate task id: {0}")]
    DuplicateTaskId(String),

    #[error("Unknown task id: {0}")]
    UnknownTaskId(String),

    #[error("Task {id}: {source}")]
    IllegalTransition {
        id: String,
        source: StateTransitionError,
    },
}

/// Registry of tasks keyed by id, preserving registration order
///
/// Registration order is the deterministic tie-breaker for dispatch, so
/// the same graph state always produces the same launch sequence.
#[derive(Debug, Default)]
pub struct TaskGraph {
    tasks: HashMap<String, Task>,
    order: Vec<String>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new task. Fails if the id is already taken.
    pub fn register(&mut self, task: Task) -> Result<(), GraphError> {
        if self.tasks.contains_key(&task.id) {
            return Err(GraphError::DuplicateTaskId(task.id));
        }
        self.order.push(task.id.clone());
        self.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    /// Look up a task by id
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Mutable access for the orchestration layer (payload updates, attempt
    /// counters, log locations)
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    /// Number of registered tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// True iff every dependency of the task is Done
    pub fn dependencies_satisfied(&self, id: &str) -> Result<bool, GraphError> {
        let task = self
            .tasks
            .get(id)
            .ok_or_else(|| GraphError::UnknownTaskId(id.to_string()))?;

        Ok(task.depends_on.iter().all(|dep| {
            self.tasks
                .get(dep)
                .map(|d| d.status == TaskStatus::Done)
                .unwrap_or(false)
        }))
    }

    /// Tasks waiting for dispatch (Pending or Retrying) whose dependencies
    /// are all Done, in registration order
    pub fn ready_tasks(&self) -> Vec<&Task> {
        self.order
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .filter(|t| is_dispatchable_state(t.status))
            .filter(|t| self.dependencies_satisfied(&t.id).unwrap_or(false))
            .collect()
    }

    /// Tasks currently Running, in registration order
    pub fn running_tasks(&self) -> Vec<&Task> {
        self.order
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .filter(|t| t.status == TaskStatus::Running)
            .collect()
    }

    /// True once every task is Done or Abandoned
    pub fn all_terminal(&self) -> bool {
        self.tasks.values().all(|t| is_terminal_state(t.status))
    }

    /// Non-terminal task ids that can never progress: nothing is Running,
    /// nothing is ready, yet work remains. Surfaced to the caller instead of
    /// applying any deadlock-breaking heuristic.
    pub fn blocked_tasks(&self) -> Vec<String> {
        if !self.running_tasks().is_empty() || !self.ready_tasks().is_empty() {
            return Vec::new();
        }
        self.order
            .iter()
            .filter(|id| {
                self.tasks
                    .get(*id)
                    .map(|t| !is_terminal_state(t.status))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Count tasks by status
    pub fn count(&self, status: TaskStatus) -> usize {
        self.tasks.values().filter(|t| t.status == status).count()
    }

    pub fn mark_running(&mut self, id: &str) -> Result<(), GraphError> {
        self.transition(id, TaskStatus::Running)
    }

    pub fn mark_done(&mut self, id: &str) -> Result<(), GraphError> {
        self.transition(id, TaskStatus::Done)
    }

    pub fn mark_failed(&mut self, id: &str) -> Result<(), GraphError> {
        self.transition(id, TaskStatus::Failed)
    }

    pub fn mark_retrying(&mut self, id: &str) -> Result<(), GraphError> {
        self.transition(id, TaskStatus::Retrying)
    }

    pub fn mark_abandoned(&mut self, id: &str) -> Result<(), GraphError> {
        self.transition(id, TaskStatus::Abandoned)
    }

    fn transition(&mut self, id: &str, target: TaskStatus) -> Result<(), GraphError> {
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| GraphError::UnknownTaskId(id.to_string()))?;

        task.status =
            transition_state(task.status, target).map_err(|source| GraphError::IllegalTransition {
                id: id.to_string(),
                source,
            })?;
        Ok(())
    }
}
