//! PostgreSQL implementation of [`JobStore`] over the `jobs` table.
//!
//! Every status literal goes through [`JobStatus::id`]; no magic numbers.

use async_trait::async_trait;
use reelgen_core::error::CoreError;
use reelgen_core::job::{Job, JobStatus, NewJob, StatusId};
use reelgen_core::types::{DbId, JobId, Timestamp};
use sqlx::FromRow;

use crate::store::{JobStore, StoreResult};
use crate::DbPool;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, kind, owner_id, status_id, progress, progress_message, \
    parameters, result, failure_reason, \
    created_at, updated_at, started_at, completed_at";

/// A raw row from the `jobs` table.
#[derive(Debug, FromRow)]
struct JobRow {
    id: JobId,
    kind: String,
    owner_id: DbId,
    status_id: StatusId,
    progress: i16,
    progress_message: Option<String>,
    parameters: serde_json::Value,
    result: Option<serde_json::Value>,
    failure_reason: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
    started_at: Option<Timestamp>,
    completed_at: Option<Timestamp>,
}

impl TryFrom<JobRow> for Job {
    type Error = CoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: row.id,
            kind: row.kind.parse()?,
            owner_id: row.owner_id,
            status: JobStatus::try_from(row.status_id)?,
            progress: row.progress,
            progress_message: row.progress_message,
            parameters: row.parameters,
            result: row.result,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

/// `sqlx`-backed job store.
#[derive(Clone)]
pub struct JobRepo {
    pool: DbPool,
}

impl JobRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for JobRepo {
    async fn insert(&self, input: NewJob) -> StoreResult<Job> {
        let job = Job::new_pending(input);
        let query = format!(
            "INSERT INTO jobs (id, kind, owner_id, status_id, progress, parameters, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, 0, $5, $6, $6) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(job.id)
            .bind(job.kind.as_str())
            .bind(job.owner_id)
            .bind(JobStatus::Pending.id())
            .bind(&job.parameters)
            .bind(job.created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(Job::try_from(row)?)
    }

    async fn find_by_id(&self, id: JobId) -> StoreResult<Option<Job>> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Job::try_from).transpose()?)
    }

    async fn list_by_owner(&self, owner_id: DbId) -> StoreResult<Vec<Job>> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs WHERE owner_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, JobRow>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| Job::try_from(row).map_err(Into::into))
            .collect()
    }

    async fn claim(&self, id: JobId) -> StoreResult<Option<Job>> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $2, progress = 0, progress_message = NULL, \
                 started_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .bind(JobStatus::Processing.id())
            .bind(JobStatus::Pending.id())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Job::try_from).transpose()?)
    }

    async fn update_progress(&self, id: JobId, percent: i16, message: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET progress = $2, progress_message = $3, updated_at = NOW() \
             WHERE id = $1 AND status_id = $4 AND progress <= $2",
        )
        .bind(id)
        .bind(percent)
        .bind(message)
        .bind(JobStatus::Processing.id())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn complete(&self, id: JobId, result: &serde_json::Value) -> StoreResult<bool> {
        let outcome = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, result = $3, progress = 100, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(id)
        .bind(JobStatus::Completed.id())
        .bind(result)
        .bind(JobStatus::Processing.id())
        .execute(&self.pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    async fn fail(&self, id: JobId, reason: &str) -> StoreResult<bool> {
        let outcome = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, failure_reason = $3, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(id)
        .bind(JobStatus::Failed.id())
        .bind(reason)
        .bind(JobStatus::Processing.id())
        .execute(&self.pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    async fn delete(&self, id: JobId) -> StoreResult<bool> {
        let outcome = sqlx::query("DELETE FROM jobs WHERE id = $1 AND status_id <> $2")
            .bind(id)
            .bind(JobStatus::Processing.id())
            .execute(&self.pool)
            .await?;
        Ok(outcome.rows_affected() > 0)
    }
}
