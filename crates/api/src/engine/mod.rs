//! Job execution engine.
//!
//! [`JobSupervisor`] owns one background task per generation job and
//! drives it through the ledger; [`LedgerProgressSink`] relays pipeline
//! checkpoints into the job row.

pub mod progress;
pub mod supervisor;

pub use progress::LedgerProgressSink;
pub use supervisor::JobSupervisor;
