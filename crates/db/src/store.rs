//! The job persistence contract.

use async_trait::async_trait;
use reelgen_core::error::CoreError;
use reelgen_core::job::{Job, NewJob};
use reelgen_core::types::{DbId, JobId};

/// Errors raised by a [`JobStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be mapped back into a [`Job`].
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for generation jobs.
///
/// Every mutating method is guarded by the status machine: it only touches
/// a row whose current status allows the change, and reports whether a row
/// was actually updated. Callers never need to read-then-write.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new `pending` job and return it.
    async fn insert(&self, input: NewJob) -> StoreResult<Job>;

    async fn find_by_id(&self, id: JobId) -> StoreResult<Option<Job>>;

    /// All jobs of one owner, newest first.
    async fn list_by_owner(&self, owner_id: DbId) -> StoreResult<Vec<Job>>;

    /// Atomically move a `pending` job to `processing` with progress 0.
    ///
    /// Returns `None` when the job is missing or not pending, so two
    /// concurrent claims on the same job can never both succeed.
    async fn claim(&self, id: JobId) -> StoreResult<Option<Job>>;

    /// Record phase progress on a `processing` job.
    ///
    /// Ignored (returns `false`) if the job is not processing or `percent`
    /// is lower than the stored value.
    async fn update_progress(&self, id: JobId, percent: i16, message: &str) -> StoreResult<bool>;

    /// `processing -> completed`, sets progress to 100 and stores `result`.
    async fn complete(&self, id: JobId, result: &serde_json::Value) -> StoreResult<bool>;

    /// `processing -> failed` with a reason. Progress is left untouched.
    async fn fail(&self, id: JobId, reason: &str) -> StoreResult<bool>;

    /// Administrative removal of a job that is not `processing`.
    ///
    /// Returns `false` if the job is missing or still processing.
    async fn delete(&self, id: JobId) -> StoreResult<bool>;
}
