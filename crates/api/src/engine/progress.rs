//! Pipeline progress relay into the job ledger.
//!
//! Each checkpoint is a single conditional update that re-checks the job is
//! still processing and that progress does not go backwards, so late or
//! out-of-order reports are dropped by the database, not here.

use async_trait::async_trait;
use muralist_core::types::JobId;
use muralist_db::repositories::JobRepo;
use muralist_pipeline::progress::clamp;
use muralist_pipeline::ProgressSink;
use sqlx::PgPool;

/// Writes progress checkpoints for one job.
pub struct LedgerProgressSink {
    pool: PgPool,
    job_id: JobId,
}

impl LedgerProgressSink {
    pub fn new(pool: PgPool, job_id: JobId) -> Self {
        Self { pool, job_id }
    }
}

#[async_trait]
impl ProgressSink for LedgerProgressSink {
    async fn report(&self, percent: u8) {
        let percent = clamp(percent);
        match JobRepo::update_progress(&self.pool, self.job_id, i16::from(percent)).await {
            Ok(true) => {
                tracing::debug!(job_id = %self.job_id, percent, "Job progress updated");
            }
            Ok(false) => {
                tracing::debug!(
                    job_id = %self.job_id,
                    percent,
                    "Progress update ignored (job not processing or progress would decrease)",
                );
            }
            Err(e) => {
                tracing::error!(
                    job_id = %self.job_id,
                    error = %e,
                    "Failed to update job progress",
                );
            }
        }
    }
}
