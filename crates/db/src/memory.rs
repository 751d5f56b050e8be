//! In-process [`JobStore`] backed by a `RwLock<HashMap>`.
//!
//! Applies the same guards as the SQL store so the runner behaves
//! identically against either backend.

use std::collections::HashMap;

use async_trait::async_trait;
use reelgen_core::job::{Job, JobStatus, NewJob};
use reelgen_core::types::{DbId, JobId};
use tokio::sync::RwLock;

use crate::store::{JobStore, StoreResult};

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to a job whose status is `expected`. Returns whether it ran.
    async fn update_if(&self, id: JobId, expected: JobStatus, f: impl FnOnce(&mut Job)) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&id) {
            Some(job) if job.status == expected => {
                f(job);
                job.updated_at = chrono::Utc::now();
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, input: NewJob) -> StoreResult<Job> {
        let job = Job::new_pending(input);
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: JobId) -> StoreResult<Option<Job>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: DbId) -> StoreResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.owner_id == owner_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(jobs)
    }

    async fn claim(&self, id: JobId) -> StoreResult<Option<Job>> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Pending => {
                let now = chrono::Utc::now();
                job.status = JobStatus::Processing;
                job.progress = 0;
                job.progress_message = None;
                job.started_at = Some(now);
                job.updated_at = now;
                Ok(Some(job.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_progress(&self, id: JobId, percent: i16, message: &str) -> StoreResult<bool> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Processing && job.progress <= percent => {
                job.progress = percent;
                job.progress_message = Some(message.to_string());
                job.updated_at = chrono::Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete(&self, id: JobId, result: &serde_json::Value) -> StoreResult<bool> {
        Ok(self
            .update_if(id, JobStatus::Processing, |job| {
                job.status = JobStatus::Completed;
                job.progress = 100;
                job.result = Some(result.clone());
                job.completed_at = Some(chrono::Utc::now());
            })
            .await)
    }

    async fn fail(&self, id: JobId, reason: &str) -> StoreResult<bool> {
        Ok(self
            .update_if(id, JobStatus::Processing, |job| {
                job.status = JobStatus::Failed;
                job.failure_reason = Some(reason.to_string());
                job.completed_at = Some(chrono::Utc::now());
            })
            .await)
    }

    async fn delete(&self, id: JobId) -> StoreResult<bool> {
        let mut jobs = self.jobs.write().await;
        match jobs.get(&id) {
            Some(job) if job.status != JobStatus::Processing => {
                jobs.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use reelgen_core::job::JobKind;

    use super::*;

    fn video_for(owner_id: DbId) -> NewJob {
        NewJob {
            kind: JobKind::Video,
            owner_id,
            parameters: serde_json::json!({"prompt": "a cat surfing"}),
        }
    }

    #[tokio::test]
    async fn claim_succeeds_only_once() {
        let store = MemoryJobStore::new();
        let job = store.insert(video_for(1)).await.unwrap();

        let claimed = store.claim(job.id).await.unwrap().expect("first claim wins");
        assert_eq!(claimed.status, JobStatus::Processing);
        assert!(claimed.started_at.is_some());

        assert!(store.claim(job.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_unknown_job_returns_none() {
        let store = MemoryJobStore::new();
        assert!(store.claim(uuid::Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn progress_requires_processing_and_never_goes_backwards() {
        let store = MemoryJobStore::new();
        let job = store.insert(video_for(1)).await.unwrap();

        // Not yet claimed.
        assert!(!store.update_progress(job.id, 10, "early").await.unwrap());

        store.claim(job.id).await.unwrap();
        assert!(store.update_progress(job.id, 30, "thirty").await.unwrap());
        assert!(!store.update_progress(job.id, 20, "back").await.unwrap());

        let stored = store.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(stored.progress, 30);
        assert_eq!(stored.progress_message.as_deref(), Some("thirty"));
    }

    #[tokio::test]
    async fn complete_sets_result_and_full_progress() {
        let store = MemoryJobStore::new();
        let job = store.insert(video_for(1)).await.unwrap();
        store.claim(job.id).await.unwrap();

        let result = serde_json::json!({"video_url": "https://cdn.test/v.mp4"});
        assert!(store.complete(job.id, &result).await.unwrap());

        let stored = store.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.progress, 100);
        assert_eq!(stored.result, Some(result));
        assert!(stored.failure_reason.is_none());
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn terminal_jobs_reject_further_changes() {
        let store = MemoryJobStore::new();
        let job = store.insert(video_for(1)).await.unwrap();
        store.claim(job.id).await.unwrap();
        store.update_progress(job.id, 60, "sixty").await.unwrap();
        assert!(store.fail(job.id, "boom").await.unwrap());

        assert!(!store.complete(job.id, &serde_json::json!({})).await.unwrap());
        assert!(!store.fail(job.id, "again").await.unwrap());
        assert!(!store.update_progress(job.id, 80, "late").await.unwrap());
        assert!(store.claim(job.id).await.unwrap().is_none());

        let stored = store.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.progress, 60);
        assert_eq!(stored.failure_reason.as_deref(), Some("boom"));
        assert!(stored.result.is_none());
    }

    #[tokio::test]
    async fn list_by_owner_filters_other_owners() {
        let store = MemoryJobStore::new();
        store.insert(video_for(1)).await.unwrap();
        store.insert(video_for(1)).await.unwrap();
        store.insert(video_for(2)).await.unwrap();

        let mine = store.list_by_owner(1).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|j| j.owner_id == 1));
        assert!(mine[0].created_at >= mine[1].created_at);
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let store = MemoryJobStore::new();
        let job = store.insert(video_for(1)).await.unwrap();

        assert!(store.delete(job.id).await.unwrap());
        assert!(!store.delete(job.id).await.unwrap());
        assert!(store.find_by_id(job.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_skips_processing_job() {
        let store = MemoryJobStore::new();
        let job = store.insert(video_for(1)).await.unwrap();
        store.claim(job.id).await.unwrap();

        assert!(!store.delete(job.id).await.unwrap());
        assert!(store.find_by_id(job.id).await.unwrap().is_some());

        store.fail(job.id, "stopped").await.unwrap();
        assert!(store.delete(job.id).await.unwrap());
    }
}
