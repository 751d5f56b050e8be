//! Generation job record and its status machine.
//!
//! A job is created `pending`, claimed into `processing` by exactly one run,
//! and finishes `completed` or `failed`. Terminal states are final.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, JobId, Timestamp};

/// Status ID type matching the SMALLINT `status_id` column.
pub type StatusId = i16;

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a generation job.
///
/// Discriminants match the seed order of the `job_statuses` lookup table.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending = 1,
    Processing = 2,
    Completed = 3,
    Failed = 4,
}

impl JobStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// `true` for `completed` and `failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether the machine allows moving from `self` to `next`.
    ///
    /// Only `pending -> processing` and `processing -> {completed, failed}`
    /// are legal.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl From<JobStatus> for StatusId {
    fn from(value: JobStatus) -> Self {
        value as StatusId
    }
}

impl TryFrom<StatusId> for JobStatus {
    type Error = CoreError;

    fn try_from(id: StatusId) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(JobStatus::Pending),
            2 => Ok(JobStatus::Processing),
            3 => Ok(JobStatus::Completed),
            4 => Ok(JobStatus::Failed),
            other => Err(CoreError::Internal(format!("Unknown job status id {other}"))),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// JobKind
// ---------------------------------------------------------------------------

/// What a job generates. Each kind has its own phase table and result shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Video,
    Script,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Video => "video",
            JobKind::Script => "script",
        }
    }
}

impl FromStr for JobKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(JobKind::Video),
            "script" => Ok(JobKind::Script),
            other => Err(CoreError::Validation(format!("Unknown job kind '{other}'"))),
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One generation request and its execution state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub owner_id: DbId,
    pub status: JobStatus,
    /// 0..=100, non-decreasing while processing.
    pub progress: i16,
    /// Message of the last recorded phase.
    pub progress_message: Option<String>,
    pub parameters: serde_json::Value,
    /// Present iff `status == Completed`.
    pub result: Option<serde_json::Value>,
    /// Present iff `status == Failed`.
    pub failure_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl Job {
    /// Build a fresh `pending` record for the given request.
    pub fn new_pending(input: NewJob) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::now_v7(),
            kind: input.kind,
            owner_id: input.owner_id,
            status: JobStatus::Pending,
            progress: 0,
            progress_message: None,
            parameters: input.parameters,
            result: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }
}

/// Input for creating a new pending job.
#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub kind: JobKind,
    pub owner_id: DbId,
    #[serde(default = "empty_object")]
    pub parameters: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
