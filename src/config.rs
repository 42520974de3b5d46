//! Configuration for the evaluation client.
//!
//! Configuration comes from environment variables (with a `.env` file loaded
//! first if present), or is built directly in code for embedding and tests.
//! Environment variables:
//!
//! - `EVAL_APP_ID`, `EVAL_API_KEY`, `EVAL_API_SECRET`: vendor credentials
//! - `EVAL_HOST`, `EVAL_PATH`: evaluation endpoint (defaults provided)

use std::env;
use std::time::Duration;

use crate::errors::{EvalError, EvalResult};

/// Default vendor evaluation host.
pub const DEFAULT_HOST: &str = "ise-api.xfyun.cn";

/// Default vendor evaluation path.
pub const DEFAULT_PATH: &str = "/v2/open-ise";

/// Raw PCM bytes per audio frame. Chosen so the base64 expansion stays under
/// the vendor's per-message size limit.
pub const DEFAULT_CHUNK_SIZE: usize = 12_000;

/// Delay between chunk sends; the vendor's decoder expects real-time-like
/// pacing rather than a burst.
pub const DEFAULT_CHUNK_INTERVAL: Duration = Duration::from_millis(20);

/// Hard bound on one evaluation session, measured from session start.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Vendor API credentials.
///
/// Opaque secrets; validated non-empty before any network call.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub app_id: String,
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(
        app_id: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Fail fast on missing credentials, before opening a socket.
    pub fn validate(&self) -> EvalResult<()> {
        if self.app_id.trim().is_empty() {
            return Err(EvalError::AuthFailure("app id is required".to_string()));
        }
        if self.api_key.trim().is_empty() {
            return Err(EvalError::AuthFailure("api key is required".to_string()));
        }
        if self.api_secret.trim().is_empty() {
            return Err(EvalError::AuthFailure("api secret is required".to_string()));
        }
        Ok(())
    }
}

/// Vendor evaluation endpoint location.
///
/// The scheme is separate from the host so tests can point the client at a
/// plaintext local server.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub scheme: String,
    pub host: String,
    pub path: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            scheme: "wss".to_string(),
            host: DEFAULT_HOST.to_string(),
            path: DEFAULT_PATH.to_string(),
        }
    }
}

impl Endpoint {
    /// Base WebSocket URL without authentication parameters.
    pub fn url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.path)
    }
}

/// Client configuration: credentials, endpoint, and streaming tunables.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub credentials: Credentials,
    pub endpoint: Endpoint,
    /// Raw PCM bytes per audio frame.
    pub chunk_size: usize,
    /// Delay between chunk sends.
    pub chunk_interval: Duration,
    /// Hard bound on one evaluation session.
    pub session_timeout: Duration,
}

impl EvalConfig {
    /// Build a configuration with default endpoint and streaming tunables.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            endpoint: Endpoint::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_interval: DEFAULT_CHUNK_INTERVAL,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Loads a `.env` file first if one exists. Credentials are required;
    /// endpoint and tunables fall back to defaults.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let _ = dotenvy::dotenv();

        let credentials = Credentials {
            app_id: env::var("EVAL_APP_ID").unwrap_or_default(),
            api_key: env::var("EVAL_API_KEY").unwrap_or_default(),
            api_secret: env::var("EVAL_API_SECRET").unwrap_or_default(),
        };
        credentials.validate()?;

        let endpoint = Endpoint {
            scheme: "wss".to_string(),
            host: env::var("EVAL_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            path: env::var("EVAL_PATH").unwrap_or_else(|_| DEFAULT_PATH.to_string()),
        };

        Ok(Self {
            endpoint,
            ..Self::new(credentials)
        })
    }
}
