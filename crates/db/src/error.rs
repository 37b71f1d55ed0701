use muralist_core::types::JobId;

/// Errors from the job ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A job with this id already exists. Ids are generated fresh, so this
    /// is a logic error upstream.
    #[error("Job {0} already exists")]
    AlreadyExists(JobId),

    /// The patch combines fields in a way no legal transition allows.
    #[error("Invalid job patch: {0}")]
    InvalidPatch(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
