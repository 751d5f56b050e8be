use reelgen_core::job::JobStatus;
use reelgen_core::job_events::CANCELLED_REASON;
use reelgen_core::types::JobId;
use reelgen_db::StoreError;

/// Failure reported by a [`Generator`](crate::Generator).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct GeneratorError(pub String);

impl GeneratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Why a run stopped before completing.
///
/// Every variant ends the job the same way (status `failed`, reason =
/// `Display` of the error); the tags only matter for logging.
#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    #[error("Generation failed: {0}")]
    Generator(#[from] GeneratorError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The record left `processing` underneath the run.
    #[error("Job {0} is no longer processing")]
    Interrupted(JobId),

    #[error("{}", CANCELLED_REASON)]
    Cancelled,

    /// The generator panicked mid-run.
    #[error("Generation panicked: {0}")]
    Panicked(String),
}

/// Errors surfaced synchronously to callers of the runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Job {0} not found")]
    NotFound(JobId),

    #[error("Job {id} cannot be started from status '{status}'")]
    InvalidState { id: JobId, status: JobStatus },

    #[error("Job {0} has no active run")]
    NotRunning(JobId),

    #[error("Runner is shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Store(#[from] StoreError),
}
