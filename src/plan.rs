//! Task plan loading
//!
//! A run is driven by a YAML plan at `.swarmgate/plan.yaml` listing the
//! tasks, their dependencies, declared write-sets, and complexity. The
//! plan is declarative input only; runtime state (status, attempts)
//! lives in the task graph.

use crate::graph::{GraphError, TaskGraph};
use crate::models::{ComplexityClass, Task};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const PLAN_FILE: &str = "plan.yaml";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Failed to read plan '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse plan '{path}': {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("Invalid plan: {0}")]
    Graph(#[from] GraphError),
}

/// One task as declared in the plan file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub id: String,
    /// Instruction handed to the worker process
    pub payload: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Declared write-set, workspace-relative paths
    #[serde(default)]
    pub writes: Vec<String>,
    #[serde(default)]
    pub reads: Vec<String>,
    #[serde(default)]
    pub complexity: ComplexityClass,
}

/// The whole plan file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPlan {
    pub tasks: Vec<TaskSpec>,
}

impl TaskPlan {
    /// Load and parse a plan file
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let contents = std::fs::read_to_string(path).map_err(|source| PlanError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| PlanError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Build the task graph, registering tasks in plan order. Duplicate
    /// ids and unknown dependency references are rejected here so the
    /// scheduler never sees a malformed graph.
    pub fn into_graph(self) -> Result<TaskGraph, PlanError> {
        let mut graph = TaskGraph::new();

        for spec in &self.tasks {
            let mut task = Task::new(&spec.id, &spec.payload);
            task.depends_on = spec.depends_on.clone();
            task.writes = spec.writes.iter().cloned().collect();
            task.reads = spec.reads.iter().cloned().collect();
            task.complexity = spec.complexity;
            graph.register(task)?;
        }

        // Dependencies may reference later plan entries, so validate
        // only after every task is registered.
        for spec in &self.tasks {
            for dep in &spec.depends_on {
                if graph.get(dep).is_none() {
                    return Err(GraphError::UnknownTaskId(dep.clone()).into());
                }
            }
        }

        log::info!("[Plan] Loaded {} task(s)", graph.len());
        Ok(graph)
    }
}
