//! Scripted in-memory [`PlatformClient`] for tests.

use async_trait::async_trait;
use scrapper_common::{AppError, AppResult, Credentials};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::platform::{PlatformClient, SearchProduct, TimelineKind};

/// Platform client answering from canned data and counting calls.
#[derive(Default)]
pub struct ScriptedClient {
    login_calls: AtomicUsize,
    failing_logins: AtomicUsize,
    login_delay: Duration,
    last_login: Mutex<Option<(String, PathBuf)>>,
    search_results: Vec<Value>,
    search_error: Option<String>,
    searched: Mutex<Vec<(String, SearchProduct)>>,
    users: HashMap<String, Value>,
    timelines: HashMap<String, Vec<Value>>,
}

impl ScriptedClient {
    /// A client whose logins succeed and whose searches return nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` logins.
    #[must_use]
    pub fn fail_logins(self, count: usize) -> Self {
        self.failing_logins.store(count, Ordering::SeqCst);
        self
    }

    /// Hold every login for `millis` before answering.
    #[must_use]
    pub fn with_login_delay_ms(mut self, millis: u64) -> Self {
        self.login_delay = Duration::from_millis(millis);
        self
    }

    /// Items returned by every search.
    #[must_use]
    pub fn with_search_results(mut self, items: Vec<Value>) -> Self {
        self.search_results = items;
        self
    }

    /// Make every search fail with `message`.
    #[must_use]
    pub fn fail_search(mut self, message: &str) -> Self {
        self.search_error = Some(message.to_string());
        self
    }

    /// Register a user and the items of their `Tweets` timeline.
    #[must_use]
    pub fn with_user(mut self, screen_name: &str, user: Value, tweets: Vec<Value>) -> Self {
        if let Some(id) = user.get("id") {
            let id = id.as_str().map_or_else(|| id.to_string(), str::to_string);
            self.timelines.insert(id, tweets);
        }
        self.users.insert(screen_name.to_string(), user);
        self
    }

    /// Number of login attempts so far.
    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    /// Username and cookie file of the most recent login.
    pub fn last_login(&self) -> Option<(String, PathBuf)> {
        self.last_login
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Queries passed to search, in call order.
    pub fn searched(&self) -> Vec<(String, SearchProduct)> {
        self.searched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PlatformClient for ScriptedClient {
    async fn login(&self, credentials: &Credentials, cookies_file: &Path) -> AppResult<()> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_login.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((credentials.username.clone(), cookies_file.to_path_buf()));

        if !self.login_delay.is_zero() {
            tokio::time::sleep(self.login_delay).await;
        }

        let failed = self
            .failing_logins
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(AppError::Authentication(
                "scripted login failure".to_string(),
            ));
        }

        Ok(())
    }

    async fn search_tweet(&self, query: &str, product: SearchProduct) -> AppResult<Vec<Value>> {
        self.searched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((query.to_string(), product));

        match &self.search_error {
            Some(message) => Err(AppError::Upstream(message.clone())),
            None => Ok(self.search_results.clone()),
        }
    }

    async fn get_user_by_screen_name(&self, screen_name: &str) -> AppResult<Value> {
        self.users
            .get(screen_name)
            .cloned()
            .ok_or_else(|| AppError::UpstreamStatus {
                status: 404,
                body: format!("User {screen_name} not found"),
            })
    }

    async fn get_user_tweets(&self, user_id: &str, kind: TimelineKind) -> AppResult<Vec<Value>> {
        if kind != TimelineKind::Tweets {
            return Ok(Vec::new());
        }
        self.timelines
            .get(user_id)
            .cloned()
            .ok_or_else(|| AppError::Upstream(format!("no timeline for user {user_id}")))
    }
}
