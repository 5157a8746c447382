use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Sequence number identifying one simulated user run.
pub type TaskId = u32;

/// One unit of work for the pool: a single simulated user run.
///
/// Owned exclusively by the worker executing it; converted into a
/// [`RunResult`] when the worker finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerTask {
    pub id: TaskId,
}

/// Workflow step that can block on the target application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStep {
    Login,
    Submission,
    Confirmation,
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStep::Login => write!(f, "login"),
            WorkflowStep::Submission => write!(f, "submission"),
            WorkflowStep::Confirmation => write!(f, "confirmation"),
        }
    }
}

/// Why a single task failed. Captured per task and never propagated as a
/// harness-level error.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum FailureReason {
    #[error("session unavailable: {0}")]
    SessionUnavailable(String),
    #[error("login failed: {0}")]
    LoginFailed(String),
    #[error("submission failed: {0}")]
    SubmissionFailed(String),
    #[error("confirmation did not appear within {waited:?}")]
    ConfirmationTimeout { waited: Duration },
    #[error("{step} exceeded its {deadline:?} deadline")]
    StepTimeout {
        step: WorkflowStep,
        deadline: Duration,
    },
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl FailureReason {
    /// Stable label used for grouping in the aggregate report.
    pub fn label(&self) -> &'static str {
        match self {
            FailureReason::SessionUnavailable(_) => "session_unavailable",
            FailureReason::LoginFailed(_) => "login_failed",
            FailureReason::SubmissionFailed(_) => "submission_failed",
            FailureReason::ConfirmationTimeout { .. } => "confirmation_timeout",
            FailureReason::StepTimeout { .. } => "step_timeout",
            FailureReason::Unexpected(_) => "unexpected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failure(FailureReason),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Immutable record of one finished task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub task_id: TaskId,
    /// Measured from session acquisition to result verification.
    pub duration: Duration,
    pub outcome: Outcome,
    /// Display name of the generated record, when the run got that far.
    pub patient_name: Option<String>,
}
