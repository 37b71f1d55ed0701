//! Progress reporting seam between the pipeline and the job ledger.

use async_trait::async_trait;

/// Pipeline started.
pub const STARTED: u8 = 10;
/// Initial image generated and stored.
pub const INITIAL_STORED: u8 = 45;
/// Cropped image stored (two-stage only).
pub const CROPPED: u8 = 65;
/// Final image stored.
pub const FINAL_STORED: u8 = 90;

/// Highest value a pipeline may report. 100 belongs to the completed
/// status transition.
pub const MAX_REPORTED: u8 = 99;

/// Clamp a checkpoint into `0..=MAX_REPORTED`.
pub fn clamp(percent: u8) -> u8 {
    percent.min(MAX_REPORTED)
}

/// Receives progress checkpoints for one job.
///
/// Reporting is best effort: implementations log their own failures and
/// never abort the pipeline.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, percent: u8);
}

/// Sink that discards every checkpoint.
pub struct NoopSink;

#[async_trait]
impl ProgressSink for NoopSink {
    async fn report(&self, _percent: u8) {}
}
