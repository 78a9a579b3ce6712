//! Tweet scraping service.
//!
//! Two fetch paths with deliberately different failure modes:
//!
//! - [`ScraperService::scrape_tweets`] authenticates once per process and is
//!   best-effort: malformed items are logged and skipped.
//! - [`ScraperService::get_user_tweets`] authenticates on every call and is
//!   fail-fast: one malformed item fails the whole request.

use scrapper_common::{AppError, AppResult};
use serde_json::Value;
use std::backtrace::Backtrace;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::normalize::{NormalizedPost, json_type_name};
use crate::platform::{SearchProduct, TimelineKind};
use crate::services::session::SessionManager;

/// Search and timeline scraping over the shared platform session.
#[derive(Clone)]
pub struct ScraperService {
    session: Arc<SessionManager>,
}

impl ScraperService {
    /// Create a new scraper service.
    #[must_use]
    pub const fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// The underlying session.
    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Search the latest tweets matching `query`.
    ///
    /// `limit` of `None` or `Some(0)` keeps everything in the upstream page.
    /// Items that fail normalization are skipped and do not count toward the
    /// limit.
    pub async fn scrape_tweets(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> AppResult<Vec<NormalizedPost>> {
        self.session.ensure_session_ready().await?;

        let items = self
            .session
            .client()
            .search_tweet(query, SearchProduct::Latest)
            .await
            .inspect_err(|e| error!(error = %e, query = %query, "Failed to search tweets"))?;

        let limit = limit.filter(|&l| l > 0);
        let mut results = Vec::new();

        for (index, item) in items.iter().enumerate() {
            if limit.is_some_and(|l| results.len() >= l) {
                break;
            }

            match NormalizedPost::from_json(item) {
                Ok(post) => results.push(post),
                Err(e) => log_skipped_item(index, item, &e),
            }
        }

        debug!(
            query = %query,
            upstream = items.len(),
            returned = results.len(),
            "Search completed"
        );

        Ok(results)
    }

    /// Fetch up to `limit` tweets from a user's timeline.
    ///
    /// Re-authenticates on every call. Unknown users and malformed items fail
    /// the whole call.
    pub async fn get_user_tweets(
        &self,
        username: &str,
        limit: Option<usize>,
    ) -> AppResult<Vec<NormalizedPost>> {
        self.session.authenticate().await?;

        self.fetch_user_timeline(username, limit)
            .await
            .inspect_err(|e| {
                error!(error = %e, username = %username, "Failed to fetch user tweets");
            })
    }

    async fn fetch_user_timeline(
        &self,
        username: &str,
        limit: Option<usize>,
    ) -> AppResult<Vec<NormalizedPost>> {
        let client = self.session.client();

        let user = client.get_user_by_screen_name(username).await?;
        let user_id = user_id_of(&user).ok_or_else(|| {
            AppError::Upstream(format!("lookup of user {username} returned no id"))
        })?;

        let items = client
            .get_user_tweets(&user_id, TimelineKind::Tweets)
            .await?;

        let limit = limit.filter(|&l| l > 0).unwrap_or(usize::MAX);
        items
            .iter()
            .take(limit)
            .map(NormalizedPost::from_json)
            .collect()
    }
}

fn user_id_of(user: &Value) -> Option<String> {
    match user.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) if id.is_u64() || id.is_i64() => Some(id.to_string()),
        _ => None,
    }
}

fn log_skipped_item(index: usize, item: &Value, err: &AppError) {
    let created_at = item.get("created_at");
    let created_at_value =
        created_at.map_or_else(|| "<missing>".to_string(), serde_json::Value::to_string);
    let backtrace = Backtrace::force_capture();

    warn!(
        error = %err,
        error_detail = ?err,
        index,
        created_at_type = json_type_name(created_at),
        created_at_value = %created_at_value,
        backtrace = %backtrace,
        "Skipping malformed tweet"
    );
}
