//! Bounded retry policy
//!
//! A failed attempt is retried at most `max_retries` times, each retry
//! carrying context from the failure (tail of the worker's output plus
//! the files it touched) injected into the task payload. Secret findings
//! never retry: the same payload would reproduce the same credential, so
//! the task is abandoned immediately.

use crate::models::Task;
use serde::{Deserialize, Serialize};

/// How an attempt failed, from the retry policy's point of view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Worker exited non-zero or was killed at the deadline
    WorkerFailure { detail: String },
    /// Verification rejected the change set
    Rejected { detail: String },
    /// Secret scan blocked the change set
    SecretsBlocked,
}

/// What to do with a task after a failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Dispatch again with the augmented payload
    Retry { payload: String },
    /// Give up permanently
    Abandon { reason: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Lines of worker output carried into the retry payload
    #[serde(default = "default_context_tail_lines")]
    pub context_tail_lines: usize,
}

fn default_max_retries() -> u32 {
    1
}

fn default_context_tail_lines() -> usize {
    50
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            context_tail_lines: default_context_tail_lines(),
        }
    }
}

impl RetryPolicy {
    /// Decide the fate of a task after a failed attempt.
    ///
    /// `worker_output` and `changed_files` are captured before the
    /// workspace revert, so the retry payload can describe what the
    /// failed attempt actually did.
    pub fn decide(
        &self,
        task: &Task,
        failure: &FailureKind,
        worker_output: &str,
        changed_files: &[String],
    ) -> RetryDecision {
        if let FailureKind::SecretsBlocked = failure {
            log::warn!(
                "[Retry] Task '{}' blocked on secrets, abandoning without retry",
                task.id
            );
            return RetryDecision::Abandon {
                reason: "Secret findings are not retryable".to_string(),
            };
        }

        // attempts counts dispatches; retries used = attempts - 1
        let retries_used = task.attempts.saturating_sub(1);
        if retries_used >= self.max_retries {
            log::info!(
                "[Retry] Task '{}' exhausted {} retr{}, abandoning",
                task.id,
                self.max_retries,
                if self.max_retries == 1 { "y" } else { "ies" }
            );
            return RetryDecision::Abandon {
                reason: format!("Retry budget of {} exhausted", self.max_retries),
            };
        }

        RetryDecision::Retry {
            payload: self.build_retry_payload(task, failure, worker_output, changed_files),
        }
    }

    /// Augment the base payload with failure context for the next attempt
    fn build_retry_payload(
        &self,
        task: &Task,
        failure: &FailureKind,
        worker_output: &str,
        changed_files: &[String],
    ) -> String {
        let mut payload = task.payload.clone();
        payload.push_str("\n\n--- Previous attempt failed ---\n");

        match failure {
            FailureKind::WorkerFailure { detail } => {
                payload.push_str(&format!("Worker failure: {}\n", detail));
            }
            FailureKind::Rejected { detail } => {
                payload.push_str(&format!("Verification rejected: {}\n", detail));
            }
            FailureKind::SecretsBlocked => unreachable!("secrets never reach payload building"),
        }

        if !changed_files.is_empty() {
            payload.push_str("\nFiles changed by the failed attempt:\n");
            for file in changed_files {
                payload.push_str(&format!("  {}\n", file));
            }
        }

        let tail = tail_lines(worker_output, self.context_tail_lines);
        if !tail.is_empty() {
            payload.push_str(&format!(
                "\nLast {} lines of worker output:\n{}\n",
                self.context_tail_lines.min(worker_output.lines().count()),
                tail
            ));
        }

        payload.push_str("\nThe workspace has been reverted; start clean and address the failure above.\n");
        payload
    }
}

/// Last `count` lines of `text`, joined back with newlines
pub fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
