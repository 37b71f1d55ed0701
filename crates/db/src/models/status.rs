//! Job status enum mapping to the `job_statuses` lookup table.
//!
//! Each variant's discriminant matches the seed data id in
//! `job_statuses`.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// Generation job lifecycle status.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending = 1,
    Processing = 2,
    Completed = 3,
    Failed = 4,
    Cancelled = 5,
}

/// Statuses no transition may leave.
pub const TERMINAL_STATUSES: [JobStatus; 3] =
    [JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled];

impl JobStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Map a database status ID back to the enum.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(Self::Pending),
            2 => Some(Self::Processing),
            3 => Some(Self::Completed),
            4 => Some(Self::Failed),
            5 => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Lowercase name, matching `job_statuses.name` and the API wire format.
    pub fn name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        TERMINAL_STATUSES.contains(&self)
    }

    /// Statuses a job may be in immediately before moving to `self`.
    ///
    /// ```text
    /// pending -> processing -> completed
    ///    |           |
    ///    +-----------+------> failed | cancelled
    /// ```
    pub fn predecessors(self) -> &'static [JobStatus] {
        match self {
            Self::Pending => &[],
            Self::Processing => &[Self::Pending],
            Self::Completed => &[Self::Processing],
            Self::Failed | Self::Cancelled => &[Self::Pending, Self::Processing],
        }
    }
}

impl From<JobStatus> for StatusId {
    fn from(value: JobStatus) -> Self {
        value as StatusId
    }
}
