//! reqwest-backed platform client.
//!
//! Session state lives in a cookie store shared with the reqwest client: the
//! login handshake fills it from `Set-Cookie` headers, expired cookies drop
//! out, and every request carries whatever is still live. The store is
//! persisted to the cookie file between runs.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, header};
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};
use scrapper_common::{AppError, AppResult, Credentials, TwitterConfig};
use serde_json::{Value, json};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::{PlatformClient, SearchProduct, TimelineKind};

/// Items requested per search page.
const SEARCH_PAGE_SIZE: u32 = 20;

/// Items requested per timeline page.
const TIMELINE_PAGE_SIZE: u32 = 40;

/// Platform client speaking JSON over HTTP.
pub struct HttpPlatformClient {
    client: Client,
    base_url: Url,
    language: String,
    user_agent: String,
    cookies: Arc<CookieStoreMutex>,
}

impl HttpPlatformClient {
    /// Create a client from the platform configuration.
    pub fn new(config: &TwitterConfig) -> AppResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            AppError::Config(format!("invalid twitter.base_url `{}`: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "twitter.base_url `{base_url}` cannot carry a path"
            )));
        }

        let cookies = Arc::new(CookieStoreMutex::new(CookieStore::default()));

        let client = Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            language: config.language.clone(),
            user_agent: format!("social-scrapper/{}", env!("CARGO_PKG_VERSION")),
            cookies,
        })
    }

    /// Append path segments to the base URL, escaping each one.
    fn endpoint<I>(&self, segments: I) -> Url
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        // base URLs that cannot carry a path are rejected in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Never held across an `.await`.
    fn store(&self) -> MutexGuard<'_, CookieStore> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn has_live_cookies(&self) -> bool {
        self.store().iter_unexpired().next().is_some()
    }

    /// Attach the common headers. Cookies are added by the client's store.
    fn prepare(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(header::USER_AGENT, &self.user_agent)
            .header(header::ACCEPT_LANGUAGE, &self.language)
            .header(header::ACCEPT, "application/json")
    }

    async fn get_json(&self, url: Url, query: &[(&str, String)]) -> AppResult<Value> {
        debug!(url = %url, "Calling platform");

        let response = self
            .prepare(self.client.get(url.clone()).query(query))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("request to {url} failed: {e}")))?;

        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("invalid JSON from {url}: {e}")))
    }

    /// Post credentials; the reply's `Set-Cookie` headers land in the store.
    async fn handshake(&self, credentials: &Credentials) -> AppResult<()> {
        let url = self.endpoint(["auth", "login"]);
        let body = json!({
            "auth_info_1": credentials.username,
            "auth_info_2": credentials.email,
            "password": credentials.password,
        });

        self.store().clear();

        let response = self
            .prepare(self.client.post(url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Authentication(format!("login request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Authentication(format!(
                "login rejected with {status}: {body}"
            )));
        }

        if !self.has_live_cookies() {
            return Err(AppError::Authentication(
                "login response carried no session cookies".to_string(),
            ));
        }

        Ok(())
    }

    /// Serialize the live, persistent cookies.
    fn encode_cookies(&self) -> Option<Vec<u8>> {
        let mut raw = Vec::new();
        match cookie_store::serde::json::save(&self.store(), &mut raw) {
            Ok(()) => Some(raw),
            Err(e) => {
                warn!(error = %e, "Failed to encode session cookies");
                None
            }
        }
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn login(&self, credentials: &Credentials, cookies_file: &Path) -> AppResult<()> {
        if let Some(saved) = load_cookies(cookies_file).await {
            info!(path = %cookies_file.display(), "Reusing saved session cookies");
            *self.store() = saved;
            return Ok(());
        }

        info!(username = %credentials.username, "Logging in to platform");
        self.handshake(credentials).await?;

        if let Some(raw) = self.encode_cookies() {
            save_cookies(cookies_file, raw).await;
        }

        Ok(())
    }

    async fn search_tweet(&self, query: &str, product: SearchProduct) -> AppResult<Vec<Value>> {
        let url = self.endpoint(["search", "tweets"]);
        let page = self
            .get_json(
                url,
                &[
                    ("q", query.to_string()),
                    ("product", product.as_str().to_string()),
                    ("count", SEARCH_PAGE_SIZE.to_string()),
                ],
            )
            .await?;

        items_from_page(page, "tweets")
    }

    async fn get_user_by_screen_name(&self, screen_name: &str) -> AppResult<Value> {
        let url = self.endpoint(["users", "by", "screen_name", screen_name]);
        let body = self.get_json(url, &[]).await?;

        // Some deployments wrap the user object, some return it bare
        if let Some(user) = body.get("user").filter(|u| u.is_object()) {
            return Ok(user.clone());
        }
        Ok(body)
    }

    async fn get_user_tweets(&self, user_id: &str, kind: TimelineKind) -> AppResult<Vec<Value>> {
        let url = self.endpoint(["users", user_id, "tweets"]);
        let page = self
            .get_json(
                url,
                &[
                    ("type", kind.as_str().to_string()),
                    ("count", TIMELINE_PAGE_SIZE.to_string()),
                ],
            )
            .await?;

        items_from_page(page, "tweets")
    }
}

async fn check_status(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(status = %status, body = %body, "Platform request failed");
    Err(AppError::UpstreamStatus {
        status: status.as_u16(),
        body,
    })
}

/// Accepts a bare array or an object holding the array under `key`.
fn items_from_page(page: Value, key: &str) -> AppResult<Vec<Value>> {
    match page {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(AppError::Upstream(format!(
                "page field `{key}` is not an array"
            ))),
            None => Err(AppError::Upstream(format!("page has no `{key}` field"))),
        },
        _ => Err(AppError::Upstream(
            "page is neither an array nor an object".to_string(),
        )),
    }
}

/// A store with at least one unexpired cookie, or `None`.
async fn load_cookies(path: &Path) -> Option<CookieStore> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No saved session cookies");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read cookie file");
            return None;
        }
    };

    match cookie_store::serde::json::load(raw.as_slice()) {
        Ok(store) if store.iter_unexpired().next().is_some() => Some(store),
        Ok(_) => {
            debug!(path = %path.display(), "Saved session cookies have expired");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable cookie file");
            None
        }
    }
}

async fn save_cookies(path: &Path, raw: Vec<u8>) {
    if let Err(e) = tokio::fs::write(path, raw).await {
        warn!(path = %path.display(), error = %e, "Failed to persist session cookies");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use wiremock::matchers::{body_json, header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> TwitterConfig {
        TwitterConfig {
            base_url: base_url.to_string(),
            username: "scraper".to_string(),
            email: "scraper@example.com".to_string(),
            password: "hunter2".to_string(),
            cookies_file: PathBuf::from("cookies.json"),
            language: "en-US".to_string(),
            timeout_secs: 5,
        }
    }

    fn credentials() -> Credentials {
        test_config("http://localhost").credentials()
    }

    async fn mount_login(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({
                "auth_info_1": "scraper",
                "auth_info_2": "scraper@example.com",
                "password": "hunter2",
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header(
                        "set-cookie",
                        "auth_token=abc; Path=/; Max-Age=3600; HttpOnly",
                    )
                    .append_header("set-cookie", "ct0=xyz; Path=/; Max-Age=3600")
                    .append_header("set-cookie", "guest_id=; Path=/; Max-Age=0")
                    .append_header(
                        "set-cookie",
                        "att=old; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
                    ),
            )
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    async fn mount_timeline(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/users/42/tweets"))
            .and(query_param("type", "Tweets"))
            .and(query_param("count", "40"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "1", "text": "a"},
                {"id": "2", "text": "b"}
            ])))
            .mount(server)
            .await;
    }

    /// Cookie names sent with the last request to `path`.
    async fn sent_cookie_names(server: &MockServer, path: &str) -> Vec<String> {
        let requests = server.received_requests().await.unwrap();
        let request = requests
            .iter()
            .rev()
            .find(|r| r.url.path() == path)
            .unwrap();

        let mut names: Vec<String> = request
            .headers
            .get_all(header::COOKIE)
            .iter()
            .flat_map(|value| value.to_str().unwrap().split("; "))
            .filter_map(|pair| pair.split_once('=').map(|(name, _)| name.to_string()))
            .collect();
        names.sort();
        names
    }

    fn saved_cookie_names(cookies_file: &Path) -> Vec<String> {
        let raw = std::fs::read(cookies_file).unwrap();
        let store = cookie_store::serde::json::load(raw.as_slice()).unwrap();
        let mut names: Vec<String> = store
            .iter_unexpired()
            .map(|cookie| cookie.name().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_login_persists_cookies_and_sends_them() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let cookies_file = dir.path().join("cookies.json");
        mount_login(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/search/tweets"))
            .and(query_param("q", "rust lang:en"))
            .and(query_param("product", "Latest"))
            .and(query_param("count", "20"))
            .and(header_eq("accept-language", "en-US"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tweets": [{"id": "1", "text": "hi"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpPlatformClient::new(&test_config(&server.uri())).unwrap();
        client.login(&credentials(), &cookies_file).await.unwrap();

        assert_eq!(saved_cookie_names(&cookies_file), ["auth_token", "ct0"]);

        let items = client
            .search_tweet("rust lang:en", SearchProduct::Latest)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            sent_cookie_names(&server, "/search/tweets").await,
            ["auth_token", "ct0"]
        );
    }

    #[tokio::test]
    async fn test_deleted_and_expired_cookies_are_not_replayed() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let cookies_file = dir.path().join("cookies.json");
        mount_login(&server, 1).await;
        mount_timeline(&server).await;

        let client = HttpPlatformClient::new(&test_config(&server.uri())).unwrap();
        client.login(&credentials(), &cookies_file).await.unwrap();
        client
            .get_user_tweets("42", TimelineKind::Tweets)
            .await
            .unwrap();

        let sent = sent_cookie_names(&server, "/users/42/tweets").await;
        assert!(!sent.iter().any(|name| name == "guest_id" || name == "att"));

        let saved = saved_cookie_names(&cookies_file);
        assert!(!saved.iter().any(|name| name == "guest_id" || name == "att"));
    }

    #[tokio::test]
    async fn test_saved_cookies_skip_the_handshake() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let cookies_file = dir.path().join("cookies.json");
        mount_login(&server, 1).await;
        mount_timeline(&server).await;

        let first = HttpPlatformClient::new(&test_config(&server.uri())).unwrap();
        first.login(&credentials(), &cookies_file).await.unwrap();

        // A fresh process picks the session up from the file alone.
        let second = HttpPlatformClient::new(&test_config(&server.uri())).unwrap();
        second.login(&credentials(), &cookies_file).await.unwrap();

        let items = second
            .get_user_tweets("42", TimelineKind::Tweets)
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            sent_cookie_names(&server, "/users/42/tweets").await,
            ["auth_token", "ct0"]
        );
    }

    #[tokio::test]
    async fn test_unreadable_cookie_file_falls_back_to_handshake() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let cookies_file = dir.path().join("cookies.json");
        std::fs::write(&cookies_file, "not json").unwrap();
        mount_login(&server, 1).await;

        let client = HttpPlatformClient::new(&test_config(&server.uri())).unwrap();
        client.login(&credentials(), &cookies_file).await.unwrap();

        assert_eq!(saved_cookie_names(&cookies_file), ["auth_token", "ct0"]);
    }

    #[tokio::test]
    async fn test_login_without_cookies_is_authentication_error() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let cookies_file = dir.path().join("cookies.json");

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200).append_header("set-cookie", "guest_id=; Max-Age=0"),
            )
            .mount(&server)
            .await;

        let client = HttpPlatformClient::new(&test_config(&server.uri())).unwrap();
        let err = client.login(&credentials(), &cookies_file).await.unwrap_err();

        assert!(matches!(err, AppError::Authentication(_)));
        assert!(!cookies_file.exists());
    }

    #[tokio::test]
    async fn test_rejected_login_is_authentication_error() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let cookies_file = dir.path().join("cookies.json");

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(403).set_body_string("bad password"))
            .mount(&server)
            .await;

        let client = HttpPlatformClient::new(&test_config(&server.uri())).unwrap();
        let err = client.login(&credentials(), &cookies_file).await.unwrap_err();

        assert!(matches!(err, AppError::Authentication(_)));
        assert!(err.to_string().contains("bad password"));
        assert!(!cookies_file.exists());
    }

    #[tokio::test]
    async fn test_unknown_user_surfaces_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/by/screen_name/nobody"))
            .respond_with(ResponseTemplate::new(404).set_body_string("User not found"))
            .mount(&server)
            .await;

        let client = HttpPlatformClient::new(&test_config(&server.uri())).unwrap();
        let err = client.get_user_by_screen_name("nobody").await.unwrap_err();

        match err {
            AppError::UpstreamStatus { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "User not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_wrapped_user_is_unwrapped() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/i/api/users/by/screen_name/jack"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"id": "12", "screen_name": "jack"}
            })))
            .mount(&server)
            .await;

        let base = format!("{}/i/api", server.uri());
        let client = HttpPlatformClient::new(&test_config(&base)).unwrap();
        let user = client.get_user_by_screen_name("jack").await.unwrap();

        assert_eq!(user["id"], "12");
    }

    #[test]
    fn test_endpoint_escapes_segments() {
        let client = HttpPlatformClient::new(&test_config("https://example.com/i/api/")).unwrap();
        let url = client.endpoint(["users", "by", "screen_name", "a/b c"]);
        assert_eq!(
            url.as_str(),
            "https://example.com/i/api/users/by/screen_name/a%2Fb%20c"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        assert!(matches!(
            HttpPlatformClient::new(&test_config("not a url")),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_items_from_page_shapes() {
        assert_eq!(items_from_page(json!([1, 2]), "tweets").unwrap().len(), 2);
        assert_eq!(
            items_from_page(json!({"tweets": [1]}), "tweets").unwrap().len(),
            1
        );
        assert!(items_from_page(json!({"tweets": 1}), "tweets").is_err());
        assert!(items_from_page(json!({}), "tweets").is_err());
        assert!(items_from_page(json!("x"), "tweets").is_err());
    }
}
