//! Background job supervisor.
//!
//! Creates job rows, spawns one Tokio task per job, and records each
//! task's outcome in the ledger. The ledger is the only record of job
//! state; the supervisor itself only keeps a cancellation token per
//! in-flight task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use muralist_core::error::CoreError;
use muralist_core::request::GenerationRequest;
use muralist_core::storage::ArtifactRef;
use muralist_core::types::JobId;
use muralist_db::models::job::Job;
use muralist_db::models::status::JobStatus;
use muralist_db::repositories::JobRepo;
use muralist_pipeline::GenerationPipeline;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::engine::LedgerProgressSink;
use crate::error::{AppError, AppResult};

/// Prefix of the error recorded when generation succeeded but the
/// completed transition could not be written.
pub const PERSISTENCE_FAILURE: &str = "persistence failure after successful generation";

/// Reason recorded on jobs orphaned by a restart.
pub const INTERRUPTED_MESSAGE: &str = "interrupted by server restart";

pub struct JobSupervisor {
    pool: PgPool,
    pipeline: Arc<GenerationPipeline>,
    tasks: RwLock<HashMap<JobId, CancellationToken>>,
    tracker: TaskTracker,
    /// Parent of every task token; cancelled on shutdown.
    shutdown: CancellationToken,
}

impl JobSupervisor {
    pub fn new(pool: PgPool, pipeline: Arc<GenerationPipeline>) -> Arc<Self> {
        Arc::new(Self {
            pool,
            pipeline,
            tasks: RwLock::new(HashMap::new()),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Fail every job a previous process left pending or processing.
    ///
    /// Call once at startup, before accepting requests.
    pub async fn recover_interrupted(&self) -> AppResult<u64> {
        let failed = JobRepo::fail_interrupted(&self.pool, INTERRUPTED_MESSAGE).await?;
        if failed > 0 {
            tracing::warn!(count = failed, "Failed jobs interrupted by restart");
        }
        Ok(failed)
    }

    // -----------------------------------------------------------------------
    // Submit / retry
    // -----------------------------------------------------------------------

    /// Validate `request`, create a pending job and start generating.
    ///
    /// Returns the job as created (pending, progress 0). Invalid requests
    /// fail with [`CoreError::Validation`] and create nothing.
    pub async fn submit(self: &Arc<Self>, request: GenerationRequest) -> AppResult<Job> {
        let request = request.validate()?;
        let job = JobRepo::create(&self.pool, JobId::new_v4(), &request).await?;

        tracing::info!(
            job_id = %job.id,
            genre = ?job.genre,
            art_style = ?job.art_style,
            "Generation submitted",
        );

        self.spawn(job.id, request).await;
        Ok(job)
    }

    /// Start a new job repeating a failed job's request.
    ///
    /// Only failed jobs may be retried; the new job starts from progress 0
    /// and links back through `retry_of_job_id`.
    pub async fn retry(self: &Arc<Self>, id: JobId) -> AppResult<Job> {
        let original = self.find(id).await?;
        if original.status() != JobStatus::Failed {
            return Err(AppError::Core(CoreError::Conflict(format!(
                "Only failed generations can be retried (status is {})",
                original.status().name()
            ))));
        }

        let job = JobRepo::create_retry(&self.pool, JobId::new_v4(), &original).await?;
        tracing::info!(job_id = %job.id, retry_of = %id, "Generation retried");

        self.spawn(job.id, job.request()).await;
        Ok(job)
    }

    // -----------------------------------------------------------------------
    // Cancel / shutdown
    // -----------------------------------------------------------------------

    /// Cancel a pending or processing job and stop its task.
    pub async fn cancel(&self, id: JobId) -> AppResult<Job> {
        let Some(job) = JobRepo::cancel(&self.pool, id).await? else {
            let existing = self.find(id).await?;
            return Err(AppError::Core(CoreError::Conflict(format!(
                "Generation is already {} and cannot be cancelled",
                existing.status().name()
            ))));
        };

        if let Some(token) = self.tasks.read().await.get(&id) {
            token.cancel();
        }
        tracing::info!(job_id = %id, "Generation cancelled");
        Ok(job)
    }

    /// Number of jobs with a live background task.
    pub async fn active_jobs(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Stop every in-flight task and wait up to `timeout` for them to exit.
    ///
    /// Rows of stopped jobs stay pending/processing until the next
    /// startup's [`JobSupervisor::recover_interrupted`].
    pub async fn shutdown(&self, timeout: Duration) {
        let active = self.active_jobs().await;
        tracing::info!(active, "Stopping generation tasks");

        self.shutdown.cancel();
        self.tracker.close();
        if tokio::time::timeout(timeout, self.tracker.wait()).await.is_err() {
            tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Generation tasks did not stop in time",
            );
        }
    }

    // -----------------------------------------------------------------------
    // Task body
    // -----------------------------------------------------------------------

    async fn spawn(self: &Arc<Self>, job_id: JobId, request: GenerationRequest) {
        let token = self.shutdown.child_token();
        self.tasks.write().await.insert(job_id, token.clone());

        let this = Arc::clone(self);
        self.tracker.spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    if this.shutdown.is_cancelled() {
                        tracing::info!(job_id = %job_id, "Generation interrupted by shutdown");
                    } else {
                        tracing::info!(job_id = %job_id, "Generation task stopped after cancel");
                    }
                }
                () = this.execute(job_id, &request) => {}
            }
            this.tasks.write().await.remove(&job_id);
        });
    }

    /// Run one job to a terminal status. Never returns an error: every
    /// failure is recorded on the job row.
    async fn execute(&self, job_id: JobId, request: &GenerationRequest) {
        match JobRepo::mark_processing(&self.pool, job_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::info!(job_id = %job_id, "Job no longer pending, not starting");
                return;
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to start job");
                self.record_failure(job_id, &format!("Failed to start generation: {e}"))
                    .await;
                return;
            }
        }

        let sink = LedgerProgressSink::new(self.pool.clone(), job_id);
        match self.pipeline.run(job_id, request, &sink).await {
            Ok(artifact) => self.record_success(job_id, &artifact).await,
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Generation failed");
                self.record_failure(job_id, &e.to_string()).await;
            }
        }
    }

    async fn record_success(&self, job_id: JobId, artifact: &ArtifactRef) {
        match JobRepo::complete(&self.pool, job_id, artifact.as_str()).await {
            Ok(Some(_)) => {
                tracing::info!(job_id = %job_id, artifact = %artifact, "Generation completed");
            }
            Ok(None) => {
                // Either a concurrent cancel won, or the row left processing
                // some other way. Only the latter needs escalating.
                match JobRepo::find_by_id(&self.pool, job_id).await {
                    Ok(Some(job)) if job.is_terminal() => {
                        tracing::info!(
                            job_id = %job_id,
                            status = job.status().name(),
                            "Job already terminal, discarding result",
                        );
                    }
                    Ok(None) => {
                        tracing::error!(
                            job_id = %job_id,
                            artifact = %artifact,
                            "Job row disappeared, generation result lost",
                        );
                    }
                    Ok(Some(job)) => {
                        tracing::error!(
                            job_id = %job_id,
                            artifact = %artifact,
                            status = job.status().name(),
                            "Completion matched no row, failing job",
                        );
                        self.record_failure(
                            job_id,
                            &format!("{PERSISTENCE_FAILURE}: completion was not recorded"),
                        )
                        .await;
                    }
                    Err(e) => {
                        tracing::error!(
                            job_id = %job_id,
                            artifact = %artifact,
                            error = %e,
                            "Failed to re-read job after completion matched no row",
                        );
                        self.record_failure(
                            job_id,
                            &format!("{PERSISTENCE_FAILURE}: completion was not recorded"),
                        )
                        .await;
                    }
                }
            }
            Err(e) => {
                tracing::error!(
                    job_id = %job_id,
                    artifact = %artifact,
                    error = %e,
                    "Failed to mark job completed",
                );
                self.record_failure(job_id, &format!("{PERSISTENCE_FAILURE}: {e}"))
                    .await;
            }
        }
    }

    async fn record_failure(&self, job_id: JobId, message: &str) {
        match JobRepo::fail(&self.pool, job_id, message).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::debug!(job_id = %job_id, "Job already terminal, failure not recorded");
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to mark job as failed");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn find(&self, id: JobId) -> AppResult<Job> {
        JobRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Generation",
                id,
            }))
    }
}
