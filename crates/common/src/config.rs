//! Application configuration.

use config::{ConfigBuilder, ConfigError, builder::DefaultState};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable prefix shared by every setting.
const ENV_PREFIX: &str = "SCRAPPER";

/// Plain listen-port variable set by most hosting platforms.
const PORT_VAR: &str = "PORT";

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream platform configuration.
    pub twitter: TwitterConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Upstream platform configuration.
///
/// Credentials are injected through config files or `SCRAPPER__TWITTER__*`
/// environment variables.
#[derive(Clone, Deserialize)]
pub struct TwitterConfig {
    /// Base URL of the platform API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Account handle used for the handshake.
    pub username: String,
    /// Account email used for the handshake.
    pub email: String,
    /// Account password.
    pub password: String,
    /// File used to persist session cookies across restarts.
    #[serde(default = "default_cookies_file")]
    pub cookies_file: PathBuf,
    /// Client locale sent as `Accept-Language`.
    #[serde(default = "default_language")]
    pub language: String,
    /// Per-request timeout against the platform, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl TwitterConfig {
    /// Credentials for the authentication handshake.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }
}

impl fmt::Debug for TwitterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitterConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("cookies_file", &self.cookies_file)
            .field("language", &self.language)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Login credentials for the upstream platform.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Primary identifier (account handle).
    pub username: String,
    /// Secondary identifier (email), used when the platform asks for it.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3001
}

fn default_base_url() -> String {
    "https://x.com/i/api".to_string()
}

fn default_cookies_file() -> PathBuf {
    PathBuf::from("cookies.json")
}

fn default_language() -> String {
    "en-US".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// A `.env` file is read first if present. Configuration is then loaded
    /// in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `SCRAPPER_ENV`)
    /// 3. Environment variables with `SCRAPPER__` prefix
    /// 4. `PORT`, which overrides `server.port`
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(error = %e, "No .env file loaded");
        }

        let env = std::env::var("SCRAPPER_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false));

        Self::build(builder, std::env::var(PORT_VAR).ok())
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let builder = config::Config::builder().add_source(config::File::from(path.as_ref()));

        Self::build(builder, std::env::var(PORT_VAR).ok())
    }

    /// Layer the environment and the `PORT` override on top of `builder`.
    fn build(
        builder: ConfigBuilder<DefaultState>,
        port: Option<String>,
    ) -> Result<Self, ConfigError> {
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", port)?
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn builder_for(file: &tempfile::NamedTempFile) -> ConfigBuilder<DefaultState> {
        config::Config::builder().add_source(config::File::from(file.path()))
    }

    const CREDENTIALS: &str = r#"
        [twitter]
        username = "scraper"
        email = "scraper@example.com"
        password = "hunter2"
    "#;

    #[test]
    fn test_defaults_fill_optional_fields() {
        let file = write_config(
            r#"
            [twitter]
            username = "scraper"
            email = "scraper@example.com"
            password = "hunter2"
            "#,
        );

        let config = Config::build(builder_for(&file), None).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.twitter.cookies_file, PathBuf::from("cookies.json"));
        assert_eq!(config.twitter.language, "en-US");
        assert_eq!(config.twitter.timeout_secs, 30);
    }

    #[test]
    fn test_missing_credentials_is_an_error() {
        let file = write_config(
            r#"
            [server]
            port = 8080
            "#,
        );

        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_port_variable_overrides_file() {
        let file = write_config(&format!("[server]\nport = 9000\n{CREDENTIALS}"));

        let config = Config::build(builder_for(&file), Some("8080".to_string())).unwrap();
        assert_eq!(config.server.port, 8080);

        let config = Config::build(builder_for(&file), None).unwrap();
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_port_variable_overrides_default() {
        let file = write_config(CREDENTIALS);

        let config = Config::build(builder_for(&file), Some("8080".to_string())).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_invalid_port_variable_is_an_error() {
        let file = write_config(CREDENTIALS);

        assert!(Config::build(builder_for(&file), Some("http".to_string())).is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let credentials = Credentials {
            username: "scraper".to_string(),
            email: "scraper@example.com".to_string(),
            password: "hunter2".to_string(),
        };

        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("scraper@example.com"));
        assert!(!rendered.contains("hunter2"));
    }
}
