// Task status state machine with validation

use super::TaskStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateTransitionError {
    #[error("Invalid state transition from {from:?} to {to:?}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("Task already in terminal state: {0:?}")]
    AlreadyTerminal(TaskStatus),
}

/// Validates if a task can transition from one status to another
pub fn can_transition(from: TaskStatus, to: TaskStatus) -> bool {
    match (from, to) {
        // From Pending
        (TaskStatus::Pending, TaskStatus::Running) => true,

        // From Running
        (TaskStatus::Running, TaskStatus::Done) => true,
        (TaskStatus::Running, TaskStatus::Failed) => true,

        // From Failed - retry or give up
        (TaskStatus::Failed, TaskStatus::Retrying) => true,
        (TaskStatus::Failed, TaskStatus::Abandoned) => true,

        // From Retrying - re-dispatched through the normal scheduler path
        (TaskStatus::Retrying, TaskStatus::Running) => true,

        // Done and Abandoned are terminal; everything else is invalid
        _ => false,
    }
}

/// Validates and performs a state transition
pub fn transition_state(
    current: TaskStatus,
    target: TaskStatus,
) -> Result<TaskStatus, StateTransitionError> {
    if is_terminal_state(current) {
        return Err(StateTransitionError::AlreadyTerminal(current));
    }

    if !can_transition(current, target) {
        return Err(StateTransitionError::InvalidTransition {
            from: current,
            to: target,
        });
    }

    Ok(target)
}

/// Check if a status is a terminal state
pub fn is_terminal_state(status: TaskStatus) -> bool {
    matches!(status, TaskStatus::Done | TaskStatus::Abandoned)
}

/// Check if a status indicates active work
pub fn is_active_state(status: TaskStatus) -> bool {
    matches!(status, TaskStatus::Running)
}

/// Check if a status indicates the task is waiting for dispatch
pub fn is_dispatchable_state(status: TaskStatus) -> bool {
    matches!(status, TaskStatus::Pending | TaskStatus::Retrying)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_to_running() {
        assert!(can_transition(TaskStatus::Pending, TaskStatus::Running));
        let result = transition_state(TaskStatus::Pending, TaskStatus::Running);
        assert_eq!(result.unwrap(), TaskStatus::Running);
    }

    #[test]
    fn test_running_to_done_and_failed() {
        assert!(can_transition(TaskStatus::Running, TaskStatus::Done));
        assert!(can_transition(TaskStatus::Running, TaskStatus::Failed));
    }

    #[test]
    fn test_failed_can_retry_or_abandon() {
        assert!(can_transition(TaskStatus::Failed, TaskStatus::Retrying));
        assert!(can_transition(TaskStatus::Failed, TaskStatus::Abandoned));
    }

    #[test]
    fn test_retrying_back_to_running() {
        assert!(can_transition(TaskStatus::Retrying, TaskStatus::Running));
        assert!(!can_transition(TaskStatus::Retrying, TaskStatus::Done));
    }

    #[test]
    fn test_pending_cannot_skip_to_done() {
        assert!(!can_transition(TaskStatus::Pending, TaskStatus::Done));
        let result = transition_state(TaskStatus::Pending, TaskStatus::Done);
        assert!(result.is_err());
    }

    #[test]
    fn test_terminal_states_never_transition() {
        for target in [
            TaskStatus::Pending,
            TaskStatus::Running,
            TaskStatus::Failed,
            TaskStatus::Retrying,
        ] {
            assert!(!can_transition(TaskStatus::Done, target));
            assert!(!can_transition(TaskStatus::Abandoned, target));
        }

        let result = transition_state(TaskStatus::Done, TaskStatus::Running);
        assert!(matches!(
            result,
            Err(StateTransitionError::AlreadyTerminal(TaskStatus::Done))
        ));
    }

    #[test]
    fn test_is_terminal_state() {
        assert!(is_terminal_state(TaskStatus::Done));
        assert!(is_terminal_state(TaskStatus::Abandoned));
        assert!(!is_terminal_state(TaskStatus::Failed));
        assert!(!is_terminal_state(TaskStatus::Pending));
    }

    #[test]
    fn test_is_dispatchable_state() {
        assert!(is_dispatchable_state(TaskStatus::Pending));
        assert!(is_dispatchable_state(TaskStatus::Retrying));
        assert!(!is_dispatchable_state(TaskStatus::Running));
    }
}
