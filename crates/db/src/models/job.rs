//! Generation job row model and the partial-update DTO.

use muralist_core::request::GenerationRequest;
use muralist_core::types::{JobId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::{JobStatus, StatusId};

/// A row from the `generation_jobs` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Job {
    pub id: JobId,
    pub status_id: StatusId,
    pub progress: i16,
    pub description: String,
    pub genre: Option<String>,
    pub art_style: Option<String>,
    pub user_id: Option<String>,
    pub result_ref: Option<String>,
    pub error_message: Option<String>,
    pub retry_of_job_id: Option<JobId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl Job {
    /// Decoded status. The foreign key to `job_statuses` guarantees a known id.
    pub fn status(&self) -> JobStatus {
        JobStatus::from_id(self.status_id).unwrap_or(JobStatus::Failed)
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// The request fields captured at intake.
    pub fn request(&self) -> GenerationRequest {
        GenerationRequest {
            description: self.description.clone(),
            genre: self.genre.clone(),
            art_style: self.art_style.clone(),
            user_id: self.user_id.clone(),
        }
    }
}

/// Partial update applied atomically by [`JobRepo::update`].
///
/// `None` fields are left untouched. `completed_at` only applies together
/// with a terminal `status`; when omitted, a terminal transition stamps
/// the current time. An existing `completed_at` is never overwritten.
///
/// [`JobRepo::update`]: crate::repositories::JobRepo::update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub progress: Option<i16>,
    pub result_ref: Option<String>,
    pub error_message: Option<String>,
    pub completed_at: Option<Timestamp>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn progress(percent: i16) -> Self {
        Self {
            progress: Some(percent),
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, percent: i16) -> Self {
        self.progress = Some(percent);
        self
    }

    pub fn with_result_ref(mut self, result_ref: impl Into<String>) -> Self {
        self.result_ref = Some(result_ref.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_completed_at(mut self, at: Timestamp) -> Self {
        self.completed_at = Some(at);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Reject combinations that no legal transition can produce.
    pub fn check(&self) -> Result<(), &'static str> {
        if self.is_empty() {
            return Err("patch sets no fields");
        }
        if let Some(p) = self.progress {
            if !(0..=100).contains(&p) {
                return Err("progress must be between 0 and 100");
            }
            if p == 100 && self.status != Some(JobStatus::Completed) {
                return Err("progress 100 is reserved for the completed transition");
            }
        }
        match self.status {
            Some(JobStatus::Pending) => return Err("no transition leads back to pending"),
            Some(JobStatus::Completed) if self.result_ref.is_none() => {
                return Err("completed requires a result_ref");
            }
            _ => {}
        }
        if self.result_ref.is_some() && self.status != Some(JobStatus::Completed) {
            return Err("result_ref may only be set by the completed transition");
        }
        if self.completed_at.is_some() && !self.status.is_some_and(JobStatus::is_terminal) {
            return Err("completed_at may only be set by a terminal transition");
        }
        if self.error_message.is_some()
            && !matches!(self.status, Some(JobStatus::Failed | JobStatus::Cancelled))
        {
            return Err("error_message may only be set by the failed or cancelled transition");
        }
        Ok(())
    }
}

/// Query parameters for `GET /api/v1/generations/recent`.
#[derive(Debug, Default, Deserialize)]
pub struct RecentJobsQuery {
    /// Maximum number of results. Defaults to 10, capped at 100.
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_rejected() {
        assert!(JobPatch::default().check().is_err());
    }

    #[test]
    fn progress_only_patch_accepted() {
        assert!(JobPatch::progress(45).check().is_ok());
    }

    #[test]
    fn progress_out_of_range_rejected() {
        assert!(JobPatch::progress(101).check().is_err());
        assert!(JobPatch::progress(-1).check().is_err());
    }

    #[test]
    fn progress_100_only_with_completion() {
        assert!(JobPatch::progress(100).check().is_err());
        let complete = JobPatch::status(JobStatus::Completed)
            .with_progress(100)
            .with_result_ref("x/final.png");
        assert!(complete.check().is_ok());
    }

    #[test]
    fn completion_requires_result_ref() {
        assert!(JobPatch::status(JobStatus::Completed).check().is_err());
    }

    #[test]
    fn result_ref_requires_completion() {
        let patch = JobPatch::status(JobStatus::Failed).with_result_ref("x/final.png");
        assert!(patch.check().is_err());
    }

    #[test]
    fn completed_at_requires_terminal_status() {
        let now = chrono::Utc::now();
        assert!(JobPatch::status(JobStatus::Processing)
            .with_completed_at(now)
            .check()
            .is_err());
        assert!(JobPatch::status(JobStatus::Failed)
            .with_error("boom")
            .with_completed_at(now)
            .check()
            .is_ok());
    }

    #[test]
    fn error_message_requires_failure_or_cancel() {
        assert!(JobPatch::default().with_error("stray").check().is_err());
        assert!(JobPatch::status(JobStatus::Processing)
            .with_error("stray")
            .check()
            .is_err());
        assert!(JobPatch::status(JobStatus::Cancelled)
            .with_error("Cancelled by user")
            .check()
            .is_ok());
    }

    #[test]
    fn back_to_pending_rejected() {
        assert!(JobPatch::status(JobStatus::Pending).check().is_err());
    }
}
