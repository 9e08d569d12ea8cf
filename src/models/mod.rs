//! Core data model for swarmgate
//!
//! A `Task` is one unit of work executed by a single external worker
//! invocation. Tasks carry declared dependency and write-set information
//! that the scheduler uses for dispatch decisions; the declared read-set
//! is informational only.

pub mod state_machine;

pub use state_machine::{can_transition, is_terminal_state, transition_state, StateTransitionError};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Lifecycle status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
    Failed,
    Retrying,
    Abandoned,
}

/// Declared complexity class of a task, used for diff proportionality checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityClass {
    Small,
    Medium,
    Large,
}

impl Default for ComplexityClass {
    fn default() -> Self {
        Self::Medium
    }
}

impl std::fmt::Display for ComplexityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        };
        write!(f, "{}", s)
    }
}

/// A unit of work executed by one external worker invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for the task
    pub id: String,

    /// Task ids that must be Done before this task can run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// File paths this task is allowed to create or modify
    #[serde(default)]
    pub writes: BTreeSet<String>,

    /// File paths this task is expected to read (informational only)
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub reads: BTreeSet<String>,

    /// Opaque instructions passed to the worker
    pub payload: String,

    /// Declared complexity class
    #[serde(default)]
    pub complexity: ComplexityClass,

    /// Current lifecycle status
    #[serde(default = "default_status")]
    pub status: TaskStatus,

    /// Number of worker invocations so far (first attempt included)
    #[serde(default)]
    pub attempts: u32,

    /// Location of the most recent attempt's captured output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_log: Option<PathBuf>,
}

fn default_status() -> TaskStatus {
    TaskStatus::Pending
}

impl Task {
    /// Create a new pending task
    pub fn new(id: &str, payload: &str) -> Self {
        Self {
            id: id.to_string(),
            depends_on: Vec::new(),
            writes: BTreeSet::new(),
            reads: BTreeSet::new(),
            payload: payload.to_string(),
            complexity: ComplexityClass::default(),
            status: TaskStatus::Pending,
            attempts: 0,
            output_log: None,
        }
    }

    /// Builder-style helper to declare dependencies
    pub fn with_dependencies(mut self, deps: &[&str]) -> Self {
        self.depends_on = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    /// Builder-style helper to declare the write-set
    pub fn with_writes(mut self, writes: &[&str]) -> Self {
        self.writes = writes.iter().map(|w| w.to_string()).collect();
        self
    }

    /// Builder-style helper to set the complexity class
    pub fn with_complexity(mut self, complexity: ComplexityClass) -> Self {
        self.complexity = complexity;
        self
    }

    /// Whether this task's declared write-set intersects another's
    pub fn writes_conflict_with(&self, other: &Task) -> bool {
        self.writes.intersection(&other.writes).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complexity_serialization() {
        let json = serde_json::to_string(&ComplexityClass::Small).unwrap();
        assert_eq!(json, "\"small\"");
        assert_eq!(ComplexityClass::default(), ComplexityClass::Medium);
    }

    #[test]
    fn test_writes_conflict() {
        let a = Task::new("a", "do a").with_writes(&["src/auth.ts", "src/db.ts"]);
        let b = Task::new("b", "do b").with_writes(&["src/db.ts"]);
        let c = Task::new("c", "do c").with_writes(&["src/ui.ts"]);

        assert!(a.writes_conflict_with(&b));
        assert!(!a.writes_conflict_with(&c));
        assert!(!b.writes_conflict_with(&c));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::Retrying).unwrap();
        assert_eq!(json, "\"retrying\"");
    }
}
