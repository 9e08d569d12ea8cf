//! Orchestrator control loop
//!
//! Single-threaded driver tying the pieces together: each tick reaps
//! finished workers (poll-based, no signal handling), routes their
//! outcomes through verification and retry policy, then dispatches
//! whatever the scheduler selects. All graph mutation happens on this
//! loop, so task state never needs locking.

use crate::config::{ConfigManager, OrchestratorConfig};
use crate::graph::{GraphError, TaskGraph};
use crate::invoker::{InvokeError, WorkerHandle, WorkerInvoker, WorkerPoll};
use crate::retry::{FailureKind, RetryDecision};
use crate::verify::{self, VerifyDecision, VerifyError};
use crate::verify::report::ReportError;
use crate::workspace::{Workspace, WorkspaceError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Worker spawn error: {0}")]
    Invoke(#[from] InvokeError),

    #[error("Verification error: {0}")]
    Verify(#[from] VerifyError),

    #[error("Artifact error: {0}")]
    Report(#[from] ReportError),

    #[error("Worker poll error: {0}")]
    Poll(#[from] std::io::Error),
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every task reached a terminal state
    Completed,
    /// Nothing running, nothing dispatchable, non-terminal tasks remain.
    /// Reported as-is; dependencies are never force-broken.
    Deadlocked { blocked: Vec<String> },
}

/// Final tally of a run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub outcome: RunOutcome,
    pub done: usize,
    pub abandoned: usize,
    pub total: usize,
}

pub struct Orchestrator {
    run_id: String,
    config: OrchestratorConfig,
    graph: TaskGraph,
    workspace: Workspace,
    invoker: WorkerInvoker,
    results_dir: PathBuf,
    workers: Vec<WorkerHandle>,
}

impl Orchestrator {
    /// Assemble an orchestrator over an existing workspace and graph
    pub fn new(
        workspace: Workspace,
        graph: TaskGraph,
        config: OrchestratorConfig,
    ) -> Result<Self, OrchestratorError> {
        let manager = ConfigManager::new(workspace.root());
        let invoker = WorkerInvoker::new(
            config.worker_command.clone(),
            Duration::from_secs(config.worker_timeout_secs),
            &manager.logs_dir(),
        );
        let results_dir = manager.results_dir();

        Ok(Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            config,
            graph,
            workspace,
            invoker,
            results_dir,
            workers: Vec::new(),
        })
    }

    /// Drive the run to completion or deadlock
    pub async fn run(&mut self) -> Result<RunSummary, OrchestratorError> {
        log::info!(
            "[Orchestrator] Starting run {}: {} task(s), cap {}",
            self.run_id,
            self.graph.len(),
            self.config.max_parallel
        );

        loop {
            self.reap()?;
            self.dispatch()?;

            if self.graph.all_terminal() {
                break;
            }

            let blocked = self.graph.blocked_tasks();
            if self.workers.is_empty() && !blocked.is_empty() {
                log::error!(
                    "[Orchestrator] Deadlock: {} task(s) permanently blocked: {:?}",
                    blocked.len(),
                    blocked
                );
                return Ok(self.summarize(RunOutcome::Deadlocked { blocked }));
            }

            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }

        log::info!("[Orchestrator] Run complete");
        Ok(self.summarize(RunOutcome::Completed))
    }

    fn summarize(&self, outcome: RunOutcome) -> RunSummary {
        RunSummary {
            run_id: self.run_id.clone(),
            outcome,
            done: self.graph.count(crate::models::TaskStatus::Done),
            abandoned: self.graph.count(crate::models::TaskStatus::Abandoned),
            total: self.graph.len(),
        }
    }

    /// Poll every running worker and settle the finished ones
    fn reap(&mut self) -> Result<(), OrchestratorError> {
        let mut still_running = Vec::new();

        for mut handle in std::mem::take(&mut self.workers) {
            match handle.poll()? {
                WorkerPoll::Running => still_running.push(handle),
                outcome => self.settle(handle, outcome)?,
            }
        }

        self.workers = still_running;
        Ok(())
    }

    /// Dispatch the scheduler's picks for this tick
    fn dispatch(&mut self) -> Result<(), OrchestratorError> {
        for id in crate::scheduler::select_dispatchable(&self.graph, self.config.max_parallel) {
            let task = self
                .graph
                .get_mut(&id)
                .ok_or_else(|| GraphError::UnknownTaskId(id.clone()))?;
            task.attempts += 1;

            let handle = self.invoker.spawn(task, self.workspace.root())?;
            task.output_log = Some(handle.log_path.clone());
            self.graph.mark_running(&id)?;

            log::info!(
                "[Orchestrator] Dispatched task '{}' (attempt {})",
                id,
                handle.attempt
            );
            self.workers.push(handle);
        }
        Ok(())
    }

    /// Route one finished attempt through verification and retry policy
    fn settle(
        &mut self,
        handle: WorkerHandle,
        outcome: WorkerPoll,
    ) -> Result<(), OrchestratorError> {
        let id = handle.task_id.clone();
        let output = handle.captured_output();

        if !outcome.is_success() {
            let detail = match outcome {
                WorkerPoll::TimedOut => "deadline exceeded, worker killed".to_string(),
                WorkerPoll::Exited(code) => format!("exit code {}", code),
                WorkerPoll::Running => unreachable!("running workers are not settled"),
            };
            log::warn!("[Orchestrator] Task '{}' worker failed: {}", id, detail);

            // A failed worker's partial edits are untrusted; restore the
            // known-good tree before anything else runs on it.
            let changed = self.changed_files()?;
            self.workspace.revert()?;
            self.graph.mark_failed(&id)?;
            return self.apply_retry(&id, FailureKind::WorkerFailure { detail }, &output, &changed);
        }

        let (complexity, declared) = {
            let task = self
                .graph
                .get(&id)
                .ok_or_else(|| GraphError::UnknownTaskId(id.clone()))?;
            (task.complexity, task.writes.clone())
        };

        let report = verify::evaluate(&self.workspace, &declared, complexity, &self.config.gate)?;
        report.write_artifacts(&self.results_dir.join(&id))?;

        match report.decision.clone() {
            VerifyDecision::Accepted => {
                let commit = self.workspace.accept(&format!("swarmgate: task {}", id))?;
                self.graph.mark_done(&id)?;
                log::info!("[Orchestrator] Task '{}' accepted as {}", id, commit);
                Ok(())
            }
            VerifyDecision::Rejected { details, .. } => {
                let changed = report.changed_files.clone();
                self.workspace.revert()?;
                self.graph.mark_failed(&id)?;
                self.apply_retry(&id, FailureKind::Rejected { detail: details }, &output, &changed)
            }
            VerifyDecision::SecretsBlocked { findings } => {
                log::warn!(
                    "[Orchestrator] Task '{}' blocked: {} secret finding(s)",
                    id,
                    findings.len()
                );
                self.workspace.revert()?;
                self.graph.mark_failed(&id)?;
                self.apply_retry(&id, FailureKind::SecretsBlocked, &output, &[])
            }
        }
    }

    /// Apply the retry decision to an already-Failed task
    fn apply_retry(
        &mut self,
        id: &str,
        failure: FailureKind,
        output: &str,
        changed_files: &[String],
    ) -> Result<(), OrchestratorError> {
        let task = self
            .graph
            .get(id)
            .ok_or_else(|| GraphError::UnknownTaskId(id.to_string()))?;

        match self.config.retry.decide(task, &failure, output, changed_files) {
            RetryDecision::Retry { payload } => {
                let task = self
                    .graph
                    .get_mut(id)
                    .ok_or_else(|| GraphError::UnknownTaskId(id.to_string()))?;
                task.payload = payload;
                self.graph.mark_retrying(id)?;
                log::info!("[Orchestrator] Task '{}' queued for retry", id);
            }
            RetryDecision::Abandon { reason } => {
                self.graph.mark_abandoned(id)?;
                log::warn!("[Orchestrator] Task '{}' abandoned: {}", id, reason);
            }
        }
        Ok(())
    }

    fn changed_files(&self) -> Result<Vec<String>, OrchestratorError> {
        let change = self.workspace.change_set()?;
        Ok(change.files.into_iter().collect())
    }
}
