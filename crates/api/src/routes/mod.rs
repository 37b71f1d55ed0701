pub mod generations;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generations                      submit (POST)
/// /generations/recent               completed generations, newest first
/// /generations/{id}                 status
/// /generations/{id}/image           final image (PNG)
/// /generations/{id}/cancel          cancel (POST)
/// /generations/{id}/retry           retry a failed generation (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/generations", generations::router())
}
