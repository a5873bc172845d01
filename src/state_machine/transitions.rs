//! Pure transition rules for steps, tasks and jobs.
//!
//! Every storage backend reads the current status inside its transaction,
//! asks these functions whether the requested transition is legal, and only
//! then writes. Keeping the rules here means the Postgres backend and the
//! in-memory fake can never disagree about legality.

use crate::error::{CoreError, Result};
use crate::state_machine::states::{ExecutionStatus, JobStatus};

/// Job-level transition requests, one per public `mark_job_*` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTransition {
    Pause,
    Resume,
    Cancel,
    Finish,
    Fail,
    NeedsInput,
}

impl JobTransition {
    fn target(&self) -> JobStatus {
        match self {
            Self::Pause => JobStatus::Paused,
            Self::Resume => JobStatus::Running,
            Self::Cancel => JobStatus::Cancelled,
            Self::Finish => JobStatus::Finished,
            Self::Fail => JobStatus::Failed,
            Self::NeedsInput => JobStatus::NeedsInput,
        }
    }
}

/// Outcome of a legal job transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTransitionOutcome {
    /// Write the new status.
    Applied(JobStatus),
    /// Already in the requested status; nothing to write.
    NoOp,
}

/// Validate starting a step. Legal only from `PendingStart`.
pub fn validate_step_start(entity: &str, current: ExecutionStatus) -> Result<()> {
    match current {
        ExecutionStatus::PendingStart => Ok(()),
        _ => Err(CoreError::invalid_transition(entity, current, "started")),
    }
}

/// Validate finishing a step.
///
/// Returns `Ok(true)` when the transition applies (from `Started`) and
/// `Ok(false)` when the step is already terminal: a crashed-and-retried
/// executor may safely re-report completion, and the caller must record
/// nothing in that case. Finishing a step that never started is an error.
pub fn validate_step_finish(entity: &str, current: ExecutionStatus) -> Result<bool> {
    match current {
        ExecutionStatus::Started => Ok(true),
        ExecutionStatus::Finished | ExecutionStatus::Failed => Ok(false),
        ExecutionStatus::PendingStart => {
            Err(CoreError::invalid_transition(entity, current, "finished"))
        }
    }
}

/// Validate failing a step.
///
/// Failure overrides any prior status except a terminal `Finished`; the
/// statistics of the failed attempt are always worth recording.
pub fn validate_step_fail(entity: &str, current: ExecutionStatus) -> Result<()> {
    match current {
        ExecutionStatus::Finished => Err(CoreError::invalid_transition(entity, current, "failed")),
        _ => Ok(()),
    }
}

/// Validate re-asserting `PendingStart` on a step.
///
/// A no-op on a step that is still pending (used when work is re-queued
/// after a resume); any later status would be a regression and is rejected.
pub fn validate_step_pending_start(entity: &str, current: ExecutionStatus) -> Result<()> {
    match current {
        ExecutionStatus::PendingStart => Ok(()),
        _ => Err(CoreError::invalid_transition(entity, current, "pending_start")),
    }
}

/// Validate a job-level transition against its legal source set.
pub fn validate_job_transition(
    entity: &str,
    current: JobStatus,
    transition: JobTransition,
) -> Result<JobTransitionOutcome> {
    let target = transition.target();
    let legal = match transition {
        JobTransition::Pause => matches!(current, JobStatus::Running),
        JobTransition::Resume => matches!(
            current,
            JobStatus::Submitted | JobStatus::Paused | JobStatus::NeedsInput
        ),
        JobTransition::NeedsInput => {
            if current == JobStatus::NeedsInput {
                return Ok(JobTransitionOutcome::NoOp);
            }
            matches!(current, JobStatus::Running | JobStatus::Paused)
        }
        JobTransition::Cancel | JobTransition::Finish | JobTransition::Fail => {
            !current.is_terminal()
        }
    };

    if legal {
        Ok(JobTransitionOutcome::Applied(target))
    } else {
        Err(CoreError::invalid_transition(
            entity,
            current,
            target.to_string(),
        ))
    }
}

/// Job promotion when a step starts: a `Submitted` job becomes `Running`.
///
/// Any other status is left alone; a paused job does not silently resume
/// because an in-flight executor reported a start.
pub fn job_running_on_step_start(current: JobStatus) -> Option<JobStatus> {
    match current {
        JobStatus::Submitted => Some(JobStatus::Running),
        _ => None,
    }
}

/// Derive a task's terminal status from its steps' statuses, if any.
///
/// Returns `Some(Finished)` once every step finished, `Some(Failed)` once
/// every step is terminal and at least one failed, `None` while work is
/// still outstanding.
pub fn derive_task_status(step_statuses: &[ExecutionStatus]) -> Option<ExecutionStatus> {
    if step_statuses.is_empty() || !step_statuses.iter().all(|s| s.is_terminal()) {
        return None;
    }
    if step_statuses.contains(&ExecutionStatus::Failed) {
        Some(ExecutionStatus::Failed)
    } else {
        Some(ExecutionStatus::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_start_requires_pending_start() {
        assert!(validate_step_start("step 1/compose", ExecutionStatus::PendingStart).is_ok());

        for current in [
            ExecutionStatus::Started,
            ExecutionStatus::Finished,
            ExecutionStatus::Failed,
        ] {
            let err = validate_step_start("step 1/compose", current).unwrap_err();
            assert!(matches!(err, CoreError::InvalidStateTransition { .. }));
        }
    }

    #[test]
    fn step_finish_is_idempotent_on_terminal() {
        assert!(validate_step_finish("step 1/compose", ExecutionStatus::Started).unwrap());
        assert!(!validate_step_finish("step 1/compose", ExecutionStatus::Finished).unwrap());
        assert!(!validate_step_finish("step 1/compose", ExecutionStatus::Failed).unwrap());

        let err = validate_step_finish("step 1/compose", ExecutionStatus::PendingStart).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStateTransition { .. }));
    }

    #[test]
    fn step_fail_rejects_only_finished() {
        for current in [
            ExecutionStatus::PendingStart,
            ExecutionStatus::Started,
            ExecutionStatus::Failed,
        ] {
            assert!(validate_step_fail("step 1/compose", current).is_ok());
        }

        let err = validate_step_fail("step 1/compose", ExecutionStatus::Finished).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStateTransition { .. }));
    }

    #[test]
    fn pending_start_cannot_regress() {
        assert!(validate_step_pending_start("step 1/compose", ExecutionStatus::PendingStart).is_ok());
        let err =
            validate_step_pending_start("step 1/compose", ExecutionStatus::Started).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStateTransition { .. }));
    }

    #[test]
    fn terminal_jobs_reject_everything() {
        for current in [JobStatus::Cancelled, JobStatus::Finished, JobStatus::Failed] {
            for transition in [
                JobTransition::Pause,
                JobTransition::Resume,
                JobTransition::Cancel,
                JobTransition::Finish,
                JobTransition::Fail,
                JobTransition::NeedsInput,
            ] {
                let result = validate_job_transition("job 1", current, transition);
                assert!(
                    matches!(result, Err(CoreError::InvalidStateTransition { .. })),
                    "{current:?} must reject {transition:?}"
                );
            }
        }
    }

    #[test]
    fn needs_input_again_is_a_no_op() {
        assert_eq!(
            validate_job_transition("job 1", JobStatus::NeedsInput, JobTransition::NeedsInput)
                .unwrap(),
            JobTransitionOutcome::NoOp
        );
        assert_eq!(
            validate_job_transition("job 1", JobStatus::Running, JobTransition::NeedsInput)
                .unwrap(),
            JobTransitionOutcome::Applied(JobStatus::NeedsInput)
        );
    }

    #[test]
    fn pause_resume_cycle() {
        assert_eq!(
            validate_job_transition("job 1", JobStatus::Running, JobTransition::Pause).unwrap(),
            JobTransitionOutcome::Applied(JobStatus::Paused)
        );
        assert_eq!(
            validate_job_transition("job 1", JobStatus::Paused, JobTransition::Resume).unwrap(),
            JobTransitionOutcome::Applied(JobStatus::Running)
        );
        assert!(
            validate_job_transition("job 1", JobStatus::Paused, JobTransition::Pause).is_err()
        );
    }

    #[test]
    fn submitted_job_promotes_to_running_on_step_start() {
        assert_eq!(
            job_running_on_step_start(JobStatus::Submitted),
            Some(JobStatus::Running)
        );
        assert_eq!(job_running_on_step_start(JobStatus::Paused), None);
        assert_eq!(job_running_on_step_start(JobStatus::Running), None);
    }

    #[test]
    fn task_status_derivation() {
        use ExecutionStatus::*;

        assert_eq!(derive_task_status(&[Finished, Finished]), Some(Finished));
        assert_eq!(derive_task_status(&[Finished, Failed]), Some(Failed));
        assert_eq!(derive_task_status(&[Finished, Started]), None);
        assert_eq!(derive_task_status(&[PendingStart]), None);
        assert_eq!(derive_task_status(&[]), None);
    }
}
