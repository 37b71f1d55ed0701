//! Route definitions for the `/generations` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generations;
use crate::state::AppState;

/// Routes mounted at `/generations`.
///
/// ```text
/// POST   /                -> submit_generation
/// GET    /recent          -> list_recent
/// GET    /{id}            -> get_generation
/// GET    /{id}/image      -> get_image
/// POST   /{id}/cancel     -> cancel_generation
/// POST   /{id}/retry      -> retry_generation
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(generations::submit_generation))
        .route("/recent", get(generations::list_recent))
        .route("/{id}", get(generations::get_generation))
        .route("/{id}/image", get(generations::get_image))
        .route("/{id}/cancel", post(generations::cancel_generation))
        .route("/{id}/retry", post(generations::retry_generation))
}
