//! Handlers for the `/jobs` resource.
//!
//! All endpoints require authentication via [`AuthUser`]. Users only see
//! and drive their own jobs; admins may view any job and delete jobs.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use reelgen_core::error::CoreError;
use reelgen_core::job::{Job, JobKind, JobStatus, NewJob};
use reelgen_core::roles::ROLE_ADMIN;
use reelgen_core::types::JobId;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /api/v1/jobs`.
#[derive(Debug, Deserialize)]
pub struct CreateJob {
    pub kind: JobKind,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a job by ID and verify the caller owns it (or is admin).
///
/// Returns `NotFound` if the job does not exist, `Forbidden` if the caller
/// is not the owner and is not an admin. `action` is used in the error
/// message (e.g. "view", "start", "cancel").
async fn find_and_authorize(
    state: &AppState,
    job_id: JobId,
    auth: &AuthUser,
    action: &str,
) -> AppResult<Job> {
    let job = state
        .store
        .find_by_id(job_id)
        .await?
        .ok_or_else(|| not_found(job_id))?;

    if job.owner_id != auth.user_id && auth.role != ROLE_ADMIN {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Cannot {action} another user's job"
        ))));
    }

    Ok(job)
}

fn not_found(job_id: JobId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Job",
        id: job_id.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Create a `pending` job owned by the caller. Returns 201 with the job.
/// Nothing runs until the job is started.
pub async fn create_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateJob>,
) -> AppResult<impl IntoResponse> {
    let parameters = match input.parameters {
        None | Some(serde_json::Value::Null) => serde_json::json!({}),
        Some(value @ serde_json::Value::Object(_)) => value,
        Some(_) => {
            return Err(AppError::BadRequest(
                "parameters must be a JSON object".into(),
            ))
        }
    };

    let job = state
        .store
        .insert(NewJob {
            kind: input.kind,
            owner_id: auth.user_id,
            parameters,
        })
        .await?;

    tracing::info!(
        job_id = %job.id,
        kind = %job.kind,
        user_id = auth.user_id,
        "Job created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

// ---------------------------------------------------------------------------
// List / Get
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs
///
/// The caller's jobs, newest first.
pub async fn list_jobs(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let jobs = state.store.list_by_owner(auth.user_id).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = find_and_authorize(&state, job_id, &auth, "view").await?;
    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// Start / Cancel
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/start
///
/// Start a `pending` job in the background. Returns 202 with the job as it
/// stands right after the claim; progress arrives over the WebSocket.
/// 409 if the job is not pending.
pub async fn start_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state, job_id, &auth, "start").await?;

    state.runner.start(job_id).await?;

    tracing::info!(job_id = %job_id, user_id = auth.user_id, "Job started");

    let job = state
        .store
        .find_by_id(job_id)
        .await?
        .ok_or_else(|| not_found(job_id))?;

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: job })))
}

/// POST /api/v1/jobs/{id}/cancel
///
/// Cancel the active run of a job. Returns 202; the job ends `failed` once
/// the run observes the cancellation. 409 if the job is not running.
pub async fn cancel_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state, job_id, &auth, "cancel").await?;

    state.runner.cancel(job_id).await?;

    tracing::info!(job_id = %job_id, user_id = auth.user_id, "Job cancel requested");

    Ok(StatusCode::ACCEPTED)
}

// ---------------------------------------------------------------------------
// Delete (admin)
// ---------------------------------------------------------------------------

/// DELETE /api/v1/jobs/{id}
///
/// Remove a job record. Admin only. A job that is still processing must be
/// cancelled first (409).
pub async fn delete_job(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    // The store refuses to delete a processing job; tell the two misses apart.
    if !state.store.delete(job_id).await? {
        return match state.store.find_by_id(job_id).await? {
            Some(job) if job.status == JobStatus::Processing => Err(AppError::Core(
                CoreError::InvalidState("Job is processing; cancel it before deleting".into()),
            )),
            _ => Err(not_found(job_id)),
        };
    }

    tracing::info!(job_id = %job_id, admin_id = admin.user_id, "Job deleted");

    Ok(StatusCode::NO_CONTENT)
}
