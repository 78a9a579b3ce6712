//! Upstream platform client.
//!
//! The scraper services only talk to the platform through [`PlatformClient`],
//! which keeps the HTTP details (and the test fakes) behind one seam.

mod http;

pub use http::HttpPlatformClient;

use async_trait::async_trait;
use scrapper_common::{AppResult, Credentials};
use serde_json::Value;
use std::path::Path;

/// Result ordering for a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchProduct {
    /// Most recent first.
    Latest,
    /// Ranked by engagement.
    Top,
}

impl SearchProduct {
    /// Wire name of the product.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "Latest",
            Self::Top => "Top",
        }
    }
}

/// Which feed of a user's profile to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineKind {
    /// Original posts and retweets.
    Tweets,
    /// Posts including replies.
    Replies,
    /// Posts with media attached.
    Media,
    /// Posts the user liked.
    Likes,
}

impl TimelineKind {
    /// Wire name of the feed.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tweets => "Tweets",
            Self::Replies => "Replies",
            Self::Media => "Media",
            Self::Likes => "Likes",
        }
    }
}

/// Client for the upstream social platform.
///
/// Result items are returned as raw JSON; callers normalize them.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Perform the authentication handshake.
    ///
    /// Cookies found in `cookies_file` are reused instead of logging in
    /// again; a fresh login writes its cookies there.
    async fn login(&self, credentials: &Credentials, cookies_file: &Path) -> AppResult<()>;

    /// Fetch one page of search results.
    async fn search_tweet(&self, query: &str, product: SearchProduct) -> AppResult<Vec<Value>>;

    /// Look up a user by handle.
    async fn get_user_by_screen_name(&self, screen_name: &str) -> AppResult<Value>;

    /// Fetch one page of a user's timeline.
    async fn get_user_tweets(&self, user_id: &str, kind: TimelineKind) -> AppResult<Vec<Value>>;
}
