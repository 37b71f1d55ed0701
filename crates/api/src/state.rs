use std::sync::Arc;

use muralist_core::storage::ArtifactStore;

use crate::engine::JobSupervisor;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: muralist_db::DbPool,
    /// Owns the background generation tasks.
    pub supervisor: Arc<JobSupervisor>,
    /// Where generated images are read back from.
    pub store: Arc<dyn ArtifactStore>,
}
