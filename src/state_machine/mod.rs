// State machine module for the job/task/step lifecycle.
//
// Transition legality lives here as pure functions over status enums so that
// every storage backend applies exactly the same rules inside its own
// transaction. The backends own the check-then-act atomicity; this module
// owns the "check".

pub mod states;
pub mod transitions;

pub use states::{ExecutionStatus, JobStatus};
pub use transitions::{
    derive_task_status, job_running_on_step_start, validate_job_transition, validate_step_fail,
    validate_step_finish, validate_step_pending_start, validate_step_start, JobTransition,
    JobTransitionOutcome,
};
