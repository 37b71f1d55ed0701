//! Integration tests for `JobSupervisor`.
//!
//! Drives the supervisor directly (no HTTP) to check what `submit` leaves
//! in the ledger and how a successful generation is recorded when the
//! completion write no longer matches the job row.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use common::{png, wait_for_idle, Script};
use muralist_api::engine::supervisor::PERSISTENCE_FAILURE;
use muralist_core::request::GenerationRequest;
use muralist_core::storage::{ArtifactKind, ArtifactRef, ArtifactStore};
use muralist_core::synthesis::{ImagePart, ImageSynthesizer, Synthesis, SynthesisError};
use muralist_db::models::status::JobStatus;
use muralist_db::repositories::JobRepo;
use sqlx::PgPool;

fn barn() -> GenerationRequest {
    GenerationRequest {
        description: "a red barn".into(),
        genre: Some("Nature".into()),
        art_style: Some("Realistic".into()),
        user_id: None,
    }
}

// ---------------------------------------------------------------------------
// Ledger tampering synthesizer
// ---------------------------------------------------------------------------

/// What happens to the processing row during the first synthesis call.
#[derive(Debug, Clone, Copy)]
enum Tamper {
    /// Put it back to pending, so the completed transition matches nothing.
    Rewind,
    /// Delete it outright.
    Delete,
}

/// Answers like `Script::Images`, but first rewrites the ledger behind
/// the supervisor's back.
struct TamperingSynthesizer {
    pool: PgPool,
    tamper: Tamper,
    calls: AtomicUsize,
}

impl TamperingSynthesizer {
    fn new(pool: PgPool, tamper: Tamper) -> Arc<Self> {
        Arc::new(Self {
            pool,
            tamper,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ImageSynthesizer for TamperingSynthesizer {
    fn name(&self) -> &'static str {
        "tampering"
    }

    async fn synthesize(
        &self,
        _prompt: &str,
        input: Option<&ImagePart>,
    ) -> Result<Synthesis, SynthesisError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            let sql = match self.tamper {
                Tamper::Rewind => {
                    "UPDATE generation_jobs SET status_id = 1, started_at = NULL \
                     WHERE status_id = 2"
                }
                Tamper::Delete => "DELETE FROM generation_jobs WHERE status_id = 2",
            };
            sqlx::query(sql).execute(&self.pool).await.unwrap();
        }

        let (width, height) = if input.is_some() { (90, 160) } else { (200, 200) };
        Ok(Synthesis {
            text_parts: vec![],
            images: vec![ImagePart::from_bytes(png(width, height))],
        })
    }
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn submit_returns_pending_row_already_in_the_ledger(pool: PgPool) {
    let app = common::build_test_app(pool.clone(), Script::Hang);

    let job = app.supervisor.submit(barn()).await.unwrap();
    assert_eq!(job.status(), JobStatus::Pending);
    assert_eq!(job.progress, 0);
    assert!(job.started_at.is_none());

    // The background task may already have started it, but never further
    // than processing while the first call is outstanding.
    let stored = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert!(matches!(stored.status(), JobStatus::Pending | JobStatus::Processing));
    assert!(stored.progress <= 10);
    assert_eq!(stored.created_at, job.created_at);
}

// ---------------------------------------------------------------------------
// Recording success
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn unrecorded_completion_fails_the_job(pool: PgPool) {
    let synthesizer = TamperingSynthesizer::new(pool.clone(), Tamper::Rewind);
    let app = common::build_test_app_with(pool.clone(), synthesizer);

    let job = app.supervisor.submit(barn()).await.unwrap();
    wait_for_idle(&app.supervisor).await;

    let stored = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(stored.status(), JobStatus::Failed);
    assert!(stored.result_ref.is_none());
    let message = stored.error_message.unwrap();
    assert!(
        message.starts_with(PERSISTENCE_FAILURE),
        "unexpected error: {message}"
    );

    // The image itself was produced and kept.
    let final_ref = ArtifactRef::new(job.id, ArtifactKind::Final);
    assert!(app.store.get(&final_ref).await.is_ok());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn completion_for_deleted_row_leaves_artifact_and_no_row(pool: PgPool) {
    let synthesizer = TamperingSynthesizer::new(pool.clone(), Tamper::Delete);
    let app = common::build_test_app_with(pool.clone(), synthesizer);

    let job = app.supervisor.submit(barn()).await.unwrap();
    wait_for_idle(&app.supervisor).await;

    assert!(JobRepo::find_by_id(&pool, job.id).await.unwrap().is_none());
    let final_ref = ArtifactRef::new(job.id, ArtifactKind::Final);
    assert!(app.store.get(&final_ref).await.is_ok());
}
