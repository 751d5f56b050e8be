//! WebSocket message type constants for job lifecycle events.
//!
//! Used by the job runner when publishing progress to the owner's live
//! connections.

/// Progress update during job execution (percentage + phase message).
pub const MSG_TYPE_JOB_PROGRESS: &str = "job_progress";

/// Job completed successfully.
pub const MSG_TYPE_JOB_COMPLETED: &str = "job_completed";

/// Job failed (including cancellation).
pub const MSG_TYPE_JOB_FAILED: &str = "job_failed";

/// Failure reason recorded when a run is cancelled.
pub const CANCELLED_REASON: &str = "Job cancelled";
