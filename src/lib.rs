//! swarmgate: scheduler and verification gate for parallel worker
//! processes mutating a shared git workspace.
//!
//! Tasks declare dependencies and write-sets up front; the scheduler
//! dispatches disjoint work under a concurrency cap, each attempt runs
//! as an external worker process with a deadline, and every resulting
//! change set passes through a secret scan, rogue-edit detection, and a
//! quality gate before it is committed. Anything else is reverted and
//! routed through a bounded retry policy.

pub mod config;
pub mod graph;
pub mod invoker;
pub mod models;
pub mod plan;
pub mod retry;
pub mod scheduler;
pub mod verify;
pub mod workspace;

pub use config::{ConfigManager, OrchestratorConfig};
pub use graph::TaskGraph;
pub use models::{ComplexityClass, Task, TaskStatus};
pub use plan::TaskPlan;
pub use scheduler::orchestrator::{Orchestrator, RunOutcome, RunSummary};
pub use verify::{GateConfig, VerifyDecision};
pub use workspace::Workspace;
