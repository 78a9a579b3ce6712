//! HTTP API layer for social-scrapper.
//!
//! - **Endpoints**: health check, tweet search, user timelines
//! - **Extractors**: validated query parameters
//! - **State**: shared services handed to every handler
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod state;

pub use endpoints::router;
pub use state::AppState;
