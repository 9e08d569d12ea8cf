//! Worker Invoker
//!
//! Runs one external worker process per task attempt with a bounded
//! wall-clock deadline, capturing combined output to a per-attempt log
//! file. The invoker never inspects the workspace and never retries;
//! retry policy lives in the retry controller.

use crate::models::Task;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("Worker command is empty")]
    EmptyCommand,

    #[error("Worker executable '{0}' not found: {1}")]
    ExecutableNotFound(String, which::Error),

    #[error("Failed to create log sink {0:?}: {1}")]
    LogSink(PathBuf, std::io::Error),

    #[error("Failed to spawn worker process: {0}")]
    Spawn(std::io::Error),
}

/// Result of polling a running worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPoll {
    /// Still running, deadline not reached
    Running,
    /// Process exited on its own with this code
    Exited(i32),
    /// Deadline hit; the process (and its group) was killed. Always a
    /// failure, never reported as success.
    TimedOut,
}

impl WorkerPoll {
    /// Whether the attempt finished successfully
    pub fn is_success(&self) -> bool {
        matches!(self, WorkerPoll::Exited(0))
    }
}

/// Spawns worker processes for task attempts
pub struct WorkerInvoker {
    command: Vec<String>,
    timeout: Duration,
    log_dir: PathBuf,
}

/// A single running worker attempt
pub struct WorkerHandle {
    pub task_id: String,
    pub attempt: u32,
    pub log_path: PathBuf,
    child: Child,
    started: Instant,
    deadline: Duration,
    finished: Option<WorkerPoll>,
}

impl WorkerInvoker {
    pub fn new(command: Vec<String>, timeout: Duration, log_dir: &Path) -> Self {
        Self {
            command,
            timeout,
            log_dir: log_dir.to_path_buf(),
        }
    }

    /// Spawn a worker for the task's current attempt. The payload is passed
    /// as the final command argument; stdout and stderr are redirected to
    /// one combined per-attempt log file in the workspace-local log dir.
    pub fn spawn(&self, task: &Task, workdir: &Path) -> Result<WorkerHandle, InvokeError> {
        let program = self.command.first().ok_or(InvokeError::EmptyCommand)?;

        // Resolve via PATH unless the configured program is already a path
        let resolved = if program.contains(std::path::MAIN_SEPARATOR) {
            PathBuf::from(program)
        } else {
            which::which(program)
                .map_err(|e| InvokeError::ExecutableNotFound(program.clone(), e))?
        };

        std::fs::create_dir_all(&self.log_dir)
            .map_err(|e| InvokeError::LogSink(self.log_dir.clone(), e))?;
        let log_path = self
            .log_dir
            .join(format!("{}-attempt{}.log", task.id, task.attempts));
        let stdout_sink =
            File::create(&log_path).map_err(|e| InvokeError::LogSink(log_path.clone(), e))?;
        let stderr_sink = stdout_sink
            .try_clone()
            .map_err(|e| InvokeError::LogSink(log_path.clone(), e))?;

        let mut cmd = Command::new(&resolved);
        cmd.args(&self.command[1..])
            .arg(&task.payload)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_sink))
            .stderr(Stdio::from(stderr_sink));

        // Own process group so a timeout kill reaches worker children too
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn().map_err(InvokeError::Spawn)?;

        log::info!(
            "[WorkerInvoker] Spawned worker for task {} attempt {} (pid {})",
            task.id,
            task.attempts,
            child.id()
        );

        Ok(WorkerHandle {
            task_id: task.id.clone(),
            attempt: task.attempts,
            log_path,
            child,
            started: Instant::now(),
            deadline: self.timeout,
            finished: None,
        })
    }
}

impl WorkerHandle {
    /// Non-blocking liveness check. Enforces the wall-clock deadline: once
    /// elapsed, the process group is killed and the attempt reports
    /// `TimedOut`.
    pub fn poll(&mut self) -> std::io::Result<WorkerPoll> {
        if let Some(done) = self.finished {
            return Ok(done);
        }

        match self.child.try_wait()? {
            Some(status) => {
                let code = status.code().unwrap_or(-1);
                self.finished = Some(WorkerPoll::Exited(code));
                Ok(WorkerPoll::Exited(code))
            }
            None => {
                if self.started.elapsed() >= self.deadline {
                    log::warn!(
                        "[WorkerInvoker] Task {} attempt {} exceeded deadline, killing",
                        self.task_id,
                        self.attempt
                    );
                    self.kill();
                    self.finished = Some(WorkerPoll::TimedOut);
                    Ok(WorkerPoll::TimedOut)
                } else {
                    Ok(WorkerPoll::Running)
                }
            }
        }
    }

    /// Kill the worker and its process group, then reap it
    pub fn kill(&mut self) {
        #[cfg(unix)]
        {
            let pid = self.child.id() as i32;
            unsafe {
                libc::killpg(pid, libc::SIGKILL);
            }
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }

    /// Read the captured output of this attempt
    pub fn captured_output(&self) -> String {
        std::fs::read_to_string(&self.log_path).unwrap_or_default()
    }
}
