//! Twitter scraping endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use scrapper_common::AppResult;
use scrapper_core::{NormalizedPost, QueryFilters, build_query};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{extractors::ValidatedQuery, state::AppState};

/// Search request parameters.
#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    /// Search text, passed to the platform as is
    pub query: String,
    /// Maximum tweets to return, 0 for everything in one upstream page
    #[serde(default = "default_limit")]
    #[validate(range(min = 0, max = 500))]
    pub limit: i64,
    /// Lower date bound (`YYYY-MM-DD`)
    pub since: Option<String>,
    /// Upper date bound (`YYYY-MM-DD`)
    pub until: Option<String>,
    /// Language code (`ru`, `en`, ...)
    pub lang: Option<String>,
}

/// User timeline request parameters.
#[derive(Debug, Deserialize, Validate)]
pub struct UserTweetsRequest {
    /// Maximum tweets to return
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 500))]
    pub limit: i64,
}

const fn default_limit() -> i64 {
    100
}

/// Search response.
#[derive(Serialize)]
pub struct SearchResponse {
    /// Query sent upstream, filters included.
    pub query: String,
    /// Number of tweets returned.
    pub count: usize,
    /// Normalized tweets in upstream order.
    pub tweets: Vec<NormalizedPost>,
}

/// User timeline response.
#[derive(Serialize)]
pub struct UserTweetsResponse {
    /// Handle as requested.
    pub username: String,
    /// Number of tweets returned.
    pub count: usize,
    /// Normalized tweets in upstream order.
    pub tweets: Vec<NormalizedPost>,
}

/// Validated limits are non-negative; 0 maps to "no limit".
fn as_limit(limit: i64) -> Option<usize> {
    usize::try_from(limit).ok().filter(|&l| l > 0)
}

/// Search the latest tweets.
async fn search(
    State(state): State<AppState>,
    ValidatedQuery(req): ValidatedQuery<SearchRequest>,
) -> AppResult<Json<SearchResponse>> {
    let query = build_query(
        &req.query,
        &QueryFilters {
            since: req.since.as_deref(),
            until: req.until.as_deref(),
            lang: req.lang.as_deref(),
        },
    );

    let tweets = state
        .scraper_service
        .scrape_tweets(&query, as_limit(req.limit))
        .await
        .map_err(|e| e.context("Error while searching tweets"))?;

    Ok(Json(SearchResponse {
        query,
        count: tweets.len(),
        tweets,
    }))
}

/// Fetch a user's tweets.
async fn user_tweets(
    State(state): State<AppState>,
    Path(username): Path<String>,
    ValidatedQuery(req): ValidatedQuery<UserTweetsRequest>,
) -> AppResult<Json<UserTweetsResponse>> {
    let tweets = state
        .scraper_service
        .get_user_tweets(&username, as_limit(req.limit))
        .await
        .map_err(|e| e.context(format!("Error while fetching tweets for user {username}")))?;

    Ok(Json(UserTweetsResponse {
        username,
        count: tweets.len(),
        tweets,
    }))
}

/// Scraping routes, nested under `/twitter`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/user/{username}", get(user_tweets))
}
