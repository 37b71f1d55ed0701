//! Repository for the `generation_jobs` table.
//!
//! Every write is a single conditional `UPDATE ... RETURNING` statement.
//! The `WHERE` clause carries the state-machine guard (legal predecessor
//! statuses, progress monotonicity), so concurrent writers to the same row
//! are serialized by PostgreSQL row locking and a stale writer simply
//! matches nothing.

use chrono::Utc;
use muralist_core::request::GenerationRequest;
use muralist_core::types::JobId;
use sqlx::PgPool;

use crate::error::LedgerError;
use crate::models::job::{Job, JobPatch};
use crate::models::status::{JobStatus, StatusId};

/// Column list for `generation_jobs` queries.
const COLUMNS: &str = "\
    id, status_id, progress, description, genre, art_style, user_id, \
    result_ref, error_message, retry_of_job_id, \
    created_at, updated_at, started_at, completed_at";

/// Maximum page size for recent-job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for recent-job listing.
const DEFAULT_LIMIT: i64 = 10;

/// Primary key constraint name, used to detect duplicate ids.
const PK_CONSTRAINT: &str = "generation_jobs_pkey";

/// Error recorded on jobs cancelled through the API.
pub const CANCELLED_MESSAGE: &str = "Cancelled by user";

/// Provides ledger operations for generation jobs.
pub struct JobRepo;

impl JobRepo {
    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Insert a new pending job with progress 0.
    ///
    /// Fails with [`LedgerError::AlreadyExists`] if `id` is taken.
    pub async fn create(
        pool: &PgPool,
        id: JobId,
        request: &GenerationRequest,
    ) -> Result<Job, LedgerError> {
        Self::insert(pool, id, request, None).await
    }

    /// Insert a new pending job re-running `original`'s request fields.
    pub async fn create_retry(
        pool: &PgPool,
        id: JobId,
        original: &Job,
    ) -> Result<Job, LedgerError> {
        Self::insert(pool, id, &original.request(), Some(original.id)).await
    }

    async fn insert(
        pool: &PgPool,
        id: JobId,
        request: &GenerationRequest,
        retry_of: Option<JobId>,
    ) -> Result<Job, LedgerError> {
        let query = format!(
            "INSERT INTO generation_jobs \
                 (id, status_id, progress, description, genre, art_style, user_id, retry_of_job_id) \
             VALUES ($1, $2, 0, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(JobStatus::Pending.id())
            .bind(&request.description)
            .bind(&request.genre)
            .bind(&request.art_style)
            .bind(&request.user_id)
            .bind(retry_of)
            .fetch_one(pool)
            .await
            .map_err(|e| {
                if is_duplicate_id(&e) {
                    LedgerError::AlreadyExists(id)
                } else {
                    LedgerError::Database(e)
                }
            })
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Apply `patch` atomically.
    ///
    /// Returns `Ok(None)` if no job has this id, or if the job's current
    /// state does not allow the patch:
    ///
    /// - with a `status`: the job must be in one of
    ///   [`JobStatus::predecessors`] (so terminal rows never match);
    /// - without a `status` but with `progress`: the job must be
    ///   processing and its stored progress must not exceed the new value;
    /// - otherwise the job must not be terminal.
    ///
    /// Entering processing stamps `started_at`. Entering a terminal status
    /// stamps `completed_at` unless it is already set.
    pub async fn update(
        pool: &PgPool,
        id: JobId,
        patch: &JobPatch,
    ) -> Result<Option<Job>, LedgerError> {
        patch.check().map_err(LedgerError::InvalidPatch)?;

        let allowed_from: Vec<StatusId> = match patch.status {
            Some(status) => status.predecessors().iter().map(|s| s.id()).collect(),
            None if patch.progress.is_some() => vec![JobStatus::Processing.id()],
            None => vec![JobStatus::Pending.id(), JobStatus::Processing.id()],
        };

        // $1 = id, $2 = allowed statuses; SET binds start at $3.
        let mut sets: Vec<String> = vec!["updated_at = NOW()".to_string()];
        let mut bind_idx: u32 = 3;

        if let Some(status) = patch.status {
            sets.push(format!("status_id = ${bind_idx}"));
            bind_idx += 1;
            if status == JobStatus::Processing {
                sets.push("started_at = COALESCE(started_at, NOW())".to_string());
            }
            if status.is_terminal() {
                sets.push(format!("completed_at = COALESCE(completed_at, ${bind_idx})"));
                bind_idx += 1;
            }
        }
        if patch.progress.is_some() {
            sets.push(format!("progress = ${bind_idx}"));
            bind_idx += 1;
        }
        if patch.result_ref.is_some() {
            sets.push(format!("result_ref = ${bind_idx}"));
            bind_idx += 1;
        }
        if patch.error_message.is_some() {
            sets.push(format!("error_message = ${bind_idx}"));
            bind_idx += 1;
        }

        let mut conditions = vec!["id = $1".to_string(), "status_id = ANY($2)".to_string()];
        let monotonic_guard = patch.status.is_none() && patch.progress.is_some();
        if monotonic_guard {
            conditions.push(format!("progress <= ${bind_idx}"));
        }

        let query = format!(
            "UPDATE generation_jobs SET {} WHERE {} RETURNING {COLUMNS}",
            sets.join(", "),
            conditions.join(" AND "),
        );

        let mut q = sqlx::query_as::<_, Job>(&query).bind(id).bind(&allowed_from);

        if let Some(status) = patch.status {
            q = q.bind(status.id());
            if status.is_terminal() {
                q = q.bind(patch.completed_at.unwrap_or_else(Utc::now));
            }
        }
        if let Some(progress) = patch.progress {
            q = q.bind(progress);
        }
        if let Some(result_ref) = &patch.result_ref {
            q = q.bind(result_ref);
        }
        if let Some(message) = &patch.error_message {
            q = q.bind(message);
        }
        if monotonic_guard {
            q = q.bind(patch.progress);
        }

        Ok(q.fetch_optional(pool).await?)
    }

    /// Move a pending job to processing. `None` if it is no longer pending.
    pub async fn mark_processing(pool: &PgPool, id: JobId) -> Result<Option<Job>, LedgerError> {
        Self::update(pool, id, &JobPatch::status(JobStatus::Processing)).await
    }

    /// Record a progress checkpoint.
    ///
    /// Returns `false` (and writes nothing) unless the job is processing
    /// and `percent` is not below the stored progress.
    pub async fn update_progress(
        pool: &PgPool,
        id: JobId,
        percent: i16,
    ) -> Result<bool, LedgerError> {
        Ok(Self::update(pool, id, &JobPatch::progress(percent))
            .await?
            .is_some())
    }

    /// Processing -> completed, with progress 100 and the final artifact.
    pub async fn complete(
        pool: &PgPool,
        id: JobId,
        result_ref: &str,
    ) -> Result<Option<Job>, LedgerError> {
        let patch = JobPatch::status(JobStatus::Completed)
            .with_progress(100)
            .with_result_ref(result_ref);
        Self::update(pool, id, &patch).await
    }

    /// Pending/processing -> failed with a human-readable reason.
    pub async fn fail(pool: &PgPool, id: JobId, error: &str) -> Result<Option<Job>, LedgerError> {
        let patch = JobPatch::status(JobStatus::Failed).with_error(error);
        Self::update(pool, id, &patch).await
    }

    /// Pending/processing -> cancelled. `None` if the job is already terminal.
    pub async fn cancel(pool: &PgPool, id: JobId) -> Result<Option<Job>, LedgerError> {
        let patch = JobPatch::status(JobStatus::Cancelled).with_error(CANCELLED_MESSAGE);
        Self::update(pool, id, &patch).await
    }

    /// Fail every job left pending or processing, e.g. by a restart that
    /// dropped their background tasks. Returns the number of rows failed.
    pub async fn fail_interrupted(pool: &PgPool, reason: &str) -> Result<u64, LedgerError> {
        let result = sqlx::query(
            "UPDATE generation_jobs \
             SET status_id = $1, error_message = $2, \
                 completed_at = COALESCE(completed_at, NOW()), updated_at = NOW() \
             WHERE status_id IN ($3, $4)",
        )
        .bind(JobStatus::Failed.id())
        .bind(reason)
        .bind(JobStatus::Pending.id())
        .bind(JobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: JobId) -> Result<Option<Job>, LedgerError> {
        let query = format!("SELECT {COLUMNS} FROM generation_jobs WHERE id = $1");
        Ok(sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?)
    }

    /// List jobs by completion time, most recent first. Jobs that have not
    /// finished sort last. `limit` defaults to 10 and is clamped to 1..=100.
    pub async fn list_recent(
        pool: &PgPool,
        status: Option<JobStatus>,
        limit: Option<i64>,
    ) -> Result<Vec<Job>, LedgerError> {
        let limit = clamp_limit(limit);
        let where_clause = if status.is_some() {
            "WHERE status_id = $2"
        } else {
            ""
        };
        let query = format!(
            "SELECT {COLUMNS} FROM generation_jobs \
             {where_clause} \
             ORDER BY completed_at DESC NULLS LAST, created_at DESC \
             LIMIT $1"
        );

        let mut q = sqlx::query_as::<_, Job>(&query).bind(limit);
        if let Some(status) = status {
            q = q.bind(status.id());
        }
        Ok(q.fetch_all(pool).await?)
    }
}

/// PostgreSQL unique violation (23505) on the primary key.
fn is_duplicate_id(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(PK_CONSTRAINT)
        }
        _ => false,
    }
}

/// Clamp a requested page size into `1..=MAX_LIMIT`.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}
