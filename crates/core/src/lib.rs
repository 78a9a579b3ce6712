//! Core logic for social-scrapper.
//!
//! - [`platform`]: the [`PlatformClient`] seam and its HTTP implementation
//! - [`services`]: the shared [`SessionManager`] and the [`ScraperService`]
//! - [`query`]: search-operator query building
//! - [`normalize`]: upstream payload to [`NormalizedPost`] conversion

pub mod normalize;
pub mod platform;
pub mod query;
pub mod services;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use normalize::{NormalizedPost, PostAuthor, normalize_timestamp};
pub use platform::{HttpPlatformClient, PlatformClient, SearchProduct, TimelineKind};
pub use query::{QueryFilters, build_query};
pub use services::*;
