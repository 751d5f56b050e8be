//! Job runner.
//!
//! One run per job: [`JobRunner::start`] atomically claims a `pending` job
//! and spawns a task that walks the kind's phase table. Every phase waits
//! the configured delay, runs the generator, records progress and
//! notifies the owner. Any error, including a panicking generator, ends the
//! job `failed`; errors never leave the spawned task.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::FutureExt;
use reelgen_core::job::{Job, JobStatus};
use reelgen_core::phases::phases_for;
use reelgen_core::types::JobId;
use reelgen_db::JobStore;
use reelgen_events::{ProgressEvent, ProgressNotifier};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::{PhaseError, RunnerError};
use crate::generator::Generator;

/// Default wait before each phase.
const DEFAULT_PHASE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Simulated work time per phase.
    pub phase_delay: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            phase_delay: DEFAULT_PHASE_DELAY,
        }
    }
}

type ActiveRuns = Mutex<HashMap<JobId, CancellationToken>>;

fn lock(active: &ActiveRuns) -> MutexGuard<'_, HashMap<JobId, CancellationToken>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registration of one run in the active map. Dropping it deregisters.
struct ActiveRun {
    active: Arc<ActiveRuns>,
    job_id: JobId,
    cancel: CancellationToken,
}

impl ActiveRun {
    /// Deregister and report whether the run was cancelled before that.
    ///
    /// Both happen under the map lock, so a `cancel` either lands before
    /// this point and is honored, or after it and gets `NotRunning`.
    fn release(self) -> bool {
        let mut active = lock(&self.active);
        active.remove(&self.job_id);
        self.cancel.is_cancelled()
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        lock(&self.active).remove(&self.job_id);
    }
}

/// Drives generation jobs to a terminal state.
///
/// Holds the registry of active runs (job id -> cancellation token). Share
/// it as `Arc<JobRunner>`; [`shutdown`](Self::shutdown) cancels every run
/// and waits for the tasks to finish.
pub struct JobRunner {
    store: Arc<dyn JobStore>,
    notifier: Arc<ProgressNotifier>,
    generator: Arc<dyn Generator>,
    config: RunnerConfig,
    active: Arc<ActiveRuns>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn JobStore>,
        notifier: Arc<ProgressNotifier>,
        generator: Arc<dyn Generator>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            generator,
            config,
            active: Arc::new(Mutex::new(HashMap::new())),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Claim `job_id` and run it on a background task.
    ///
    /// Returns once the job is `processing`. Fails with
    /// [`RunnerError::NotFound`] or [`RunnerError::InvalidState`] without
    /// touching the record.
    pub async fn start(self: &Arc<Self>, job_id: JobId) -> Result<(), RunnerError> {
        let (job, run) = self.claim(job_id).await?;

        let runner = Arc::clone(self);
        self.tracker.spawn(async move {
            runner.execute(job, run).await;
        });

        Ok(())
    }

    /// Claim `job_id` and run it to completion on the current task.
    ///
    /// Returns the final record.
    pub async fn run(&self, job_id: JobId) -> Result<Job, RunnerError> {
        let (job, run) = self.claim(job_id).await?;
        self.execute(job, run).await;

        self.store
            .find_by_id(job_id)
            .await?
            .ok_or(RunnerError::NotFound(job_id))
    }

    /// Cancel the active run of `job_id`. The job ends `failed`.
    pub async fn cancel(&self, job_id: JobId) -> Result<(), RunnerError> {
        match lock(&self.active).get(&job_id) {
            Some(token) => {
                token.cancel();
                tracing::info!(job_id = %job_id, "Job cancellation requested");
                Ok(())
            }
            None => Err(RunnerError::NotRunning(job_id)),
        }
    }

    /// Number of runs currently in flight.
    pub fn active_count(&self) -> usize {
        lock(&self.active).len()
    }

    /// Cancel every active run, refuse new ones, and wait for all run tasks
    /// to finish recording their outcome.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        let count = self.active_count();
        tracing::info!(count, "Job runner shutting down");
        self.tracker.wait().await;
        tracing::info!("Job runner drained");
    }

    // -----------------------------------------------------------------------
    // Claiming
    // -----------------------------------------------------------------------

    /// Check, register and claim. The run is registered before the store
    /// claim so a `cancel` issued while `start` is in flight is never
    /// answered with `NotRunning`; a failed claim drops the registration.
    async fn claim(&self, job_id: JobId) -> Result<(Job, ActiveRun), RunnerError> {
        if self.shutdown.is_cancelled() {
            return Err(RunnerError::ShuttingDown);
        }

        let job = self
            .store
            .find_by_id(job_id)
            .await?
            .ok_or(RunnerError::NotFound(job_id))?;

        if job.status != JobStatus::Pending {
            return Err(RunnerError::InvalidState {
                id: job_id,
                status: job.status,
            });
        }

        // Another start for this job is already in flight.
        let run = self.register(job_id).ok_or(RunnerError::InvalidState {
            id: job_id,
            status: JobStatus::Processing,
        })?;

        match self.store.claim(job_id).await? {
            Some(claimed) => Ok((claimed, run)),
            // Lost the race against another start.
            None => match self.store.find_by_id(job_id).await? {
                Some(current) => Err(RunnerError::InvalidState {
                    id: job_id,
                    status: current.status,
                }),
                None => Err(RunnerError::NotFound(job_id)),
            },
        }
    }

    fn register(&self, job_id: JobId) -> Option<ActiveRun> {
        let mut active = lock(&self.active);
        if active.contains_key(&job_id) {
            return None;
        }

        let cancel = self.shutdown.child_token();
        active.insert(job_id, cancel.clone());
        Some(ActiveRun {
            active: Arc::clone(&self.active),
            job_id,
            cancel,
        })
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    async fn execute(&self, job: Job, run: ActiveRun) {
        let started = Instant::now();
        tracing::info!(
            job_id = %job.id,
            kind = %job.kind,
            owner_id = job.owner_id,
            "Job run started",
        );

        let mut progress = job.progress;
        let outcome = AssertUnwindSafe(self.run_phases(&job, &run.cancel, &mut progress))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(PhaseError::Panicked(panic_message(panic.as_ref()))));

        // Leave the active map before the outcome is recorded.
        let cancelled = run.release();
        let outcome = match outcome {
            Ok(_) if cancelled => Err(PhaseError::Cancelled),
            other => other,
        };

        match outcome {
            Ok(result) => self.finish_completed(&job, result, progress).await,
            Err(e) => self.finish_failed(&job, e, progress).await,
        }

        tracing::debug!(
            job_id = %job.id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Job run finished",
        );
    }

    /// Walk the phase table. `progress` tracks the last recorded percent.
    async fn run_phases(
        &self,
        job: &Job,
        cancel: &CancellationToken,
        progress: &mut i16,
    ) -> Result<serde_json::Value, PhaseError> {
        for phase in phases_for(job.kind) {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PhaseError::Cancelled),
                outcome = async {
                    tokio::time::sleep(self.config.phase_delay).await;
                    self.generator.run_phase(job, phase).await
                } => outcome?,
            }

            if !self
                .store
                .update_progress(job.id, phase.percent, phase.message)
                .await?
            {
                return Err(PhaseError::Interrupted(job.id));
            }
            *progress = phase.percent;

            tracing::debug!(
                job_id = %job.id,
                percent = phase.percent,
                phase = phase.message,
                "Job phase recorded",
            );
            self.notifier
                .publish(
                    job.owner_id,
                    ProgressEvent::progress(job.id, job.kind, phase.percent, phase.message),
                )
                .await;
        }

        if cancel.is_cancelled() {
            return Err(PhaseError::Cancelled);
        }

        Ok(self.generator.produce_result(job).await?)
    }

    async fn finish_completed(&self, job: &Job, result: serde_json::Value, progress: i16) {
        match self.store.complete(job.id, &result).await {
            Ok(true) => {
                tracing::info!(job_id = %job.id, kind = %job.kind, "Job completed");
                self.notifier
                    .publish(job.owner_id, ProgressEvent::completed(job.id, job.kind, result))
                    .await;
            }
            Ok(false) => {
                tracing::warn!(
                    job_id = %job.id,
                    "Job left processing before completion was recorded",
                );
            }
            Err(e) => self.finish_failed(job, PhaseError::Store(e), progress).await,
        }
    }

    async fn finish_failed(&self, job: &Job, error: PhaseError, progress: i16) {
        let reason = error.to_string();

        match &error {
            PhaseError::Cancelled => {
                tracing::info!(job_id = %job.id, percent = progress, "Job cancelled");
            }
            PhaseError::Generator(_) | PhaseError::Interrupted(_) => {
                tracing::warn!(job_id = %job.id, percent = progress, error = %error, "Job failed");
            }
            PhaseError::Store(_) | PhaseError::Panicked(_) => {
                tracing::error!(job_id = %job.id, percent = progress, error = %error, "Job failed");
            }
        }

        match self.store.fail(job.id, &reason).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(job_id = %job.id, "Job left processing before failure was recorded");
                return;
            }
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to mark job as failed");
            }
        }

        self.notifier
            .publish(
                job.owner_id,
                ProgressEvent::failed(job.id, job.kind, progress, reason),
            )
            .await;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
