//! API endpoints.

mod health;
mod twitter;

use axum::Router;

use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/twitter", twitter::router())
}
