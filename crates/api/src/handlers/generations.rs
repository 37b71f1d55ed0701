//! Handlers for the `/generations` resource.
//!
//! A generation is a job row in the ledger. Submission returns as soon as
//! the row exists; clients poll `GET /generations/{id}` until the status
//! is terminal and then fetch the image.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use muralist_core::error::CoreError;
use muralist_core::request::GenerationRequest;
use muralist_core::storage::ArtifactRef;
use muralist_core::types::{JobId, Timestamp};
use muralist_db::models::job::{Job, RecentJobsQuery};
use muralist_db::models::status::JobStatus;
use muralist_db::repositories::JobRepo;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Returned by submit and retry.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub generation_id: JobId,
    pub status: &'static str,
    pub message: &'static str,
}

/// Client-facing view of a job.
///
/// A pure function of the row, so repeated reads of a terminal job are
/// identical.
#[derive(Debug, Serialize)]
pub struct GenerationStatus {
    pub generation_id: JobId,
    pub status: &'static str,
    pub progress: i16,
    /// Artifact endpoint path once completed, otherwise `null`.
    pub image_url: Option<String>,
    pub error_message: Option<String>,
    pub description: String,
    pub genre: Option<String>,
    pub art_style: Option<String>,
    pub user_id: Option<String>,
    pub retry_of: Option<JobId>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl From<&Job> for GenerationStatus {
    fn from(job: &Job) -> Self {
        let status = job.status();
        Self {
            generation_id: job.id,
            status: status.name(),
            progress: job.progress,
            image_url: (status == JobStatus::Completed).then(|| image_url(job.id)),
            error_message: job.error_message.clone(),
            description: job.description.clone(),
            genre: job.genre.clone(),
            art_style: job.art_style.clone(),
            user_id: job.user_id.clone(),
            retry_of: job.retry_of_job_id,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

/// Path of the artifact endpoint for `id`.
pub fn image_url(id: JobId) -> String {
    format!("/api/v1/generations/{id}/image")
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_job(pool: &sqlx::PgPool, id: JobId) -> AppResult<Job> {
    JobRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Generation",
            id,
        }))
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/generations
///
/// Validate the request, create a pending job and start generation in the
/// background. Returns 201 immediately.
pub async fn submit_generation(
    State(state): State<AppState>,
    Json(input): Json<GenerationRequest>,
) -> AppResult<impl IntoResponse> {
    let job = state.supervisor.submit(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SubmitResponse {
                generation_id: job.id,
                status: job.status().name(),
                message: "Generation started",
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/v1/generations/{id}
pub async fn get_generation(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: GenerationStatus::from(&job),
    }))
}

/// GET /api/v1/generations/recent?limit=
///
/// Completed generations, most recently completed first.
pub async fn list_recent(
    State(state): State<AppState>,
    Query(params): Query<RecentJobsQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs = JobRepo::list_recent(&state.pool, Some(JobStatus::Completed), params.limit).await?;
    let data: Vec<GenerationStatus> = jobs.iter().map(GenerationStatus::from).collect();
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/generations/{id}/image
///
/// The final PNG. 404 for an unknown id, 409 `NOT_READY` until the job is
/// completed.
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state.pool, id).await?;
    if job.status() != JobStatus::Completed {
        return Err(AppError::Core(CoreError::NotReady(format!(
            "Generation is {}, image not available",
            job.status().name()
        ))));
    }

    let raw = job.result_ref.as_deref().ok_or_else(|| {
        AppError::InternalError(format!("completed generation {id} has no result_ref"))
    })?;
    let artifact = ArtifactRef::parse(raw)?;
    let bytes = state.store.get(&artifact).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        bytes,
    ))
}

// ---------------------------------------------------------------------------
// Cancel / retry
// ---------------------------------------------------------------------------

/// POST /api/v1/generations/{id}/cancel
///
/// 409 if the generation already finished.
pub async fn cancel_generation(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = state.supervisor.cancel(id).await?;
    Ok(Json(DataResponse {
        data: GenerationStatus::from(&job),
    }))
}

/// POST /api/v1/generations/{id}/retry
///
/// Start a new generation from a failed one's request. 409 unless the
/// original failed.
pub async fn retry_generation(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = state.supervisor.retry(id).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SubmitResponse {
                generation_id: job.id,
                status: job.status().name(),
                message: "Generation retry started",
            },
        }),
    ))
}
