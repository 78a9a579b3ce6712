//! Platform session management.
//!
//! One process-wide session wraps the shared platform client and a "ready"
//! flag. The flag and every handshake sit behind a single async mutex, so
//! concurrent first requests perform exactly one handshake.

use scrapper_common::{AppResult, Credentials};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::platform::PlatformClient;

/// Shared, lazily authenticated platform session.
pub struct SessionManager {
    client: Arc<dyn PlatformClient>,
    credentials: Credentials,
    cookies_file: PathBuf,
    ready: Mutex<bool>,
}

impl SessionManager {
    /// Create an unauthenticated session.
    #[must_use]
    pub fn new(
        client: Arc<dyn PlatformClient>,
        credentials: Credentials,
        cookies_file: PathBuf,
    ) -> Self {
        Self {
            client,
            credentials,
            cookies_file,
            ready: Mutex::new(false),
        }
    }

    /// The shared platform client.
    #[must_use]
    pub fn client(&self) -> &dyn PlatformClient {
        self.client.as_ref()
    }

    /// Whether a handshake has succeeded through [`Self::ensure_session_ready`].
    pub async fn is_ready(&self) -> bool {
        *self.ready.lock().await
    }

    /// Authenticate once; later calls return immediately.
    ///
    /// A failed handshake leaves the session unready, so the next call
    /// tries again.
    pub async fn ensure_session_ready(&self) -> AppResult<()> {
        let mut ready = self.ready.lock().await;
        if *ready {
            return Ok(());
        }

        self.handshake().await?;
        *ready = true;
        info!("Platform session ready");

        Ok(())
    }

    /// Authenticate unconditionally, ignoring and leaving the ready flag as is.
    ///
    /// Used by the user timeline path, which re-authenticates on every call.
    pub async fn authenticate(&self) -> AppResult<()> {
        let _guard = self.ready.lock().await;
        self.handshake().await
    }

    async fn handshake(&self) -> AppResult<()> {
        self.client
            .login(&self.credentials, &self.cookies_file)
            .await
            .inspect_err(|e| error!(error = %e, "Platform login failed"))
    }
}
