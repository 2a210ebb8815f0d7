//! Configuration loading.
//!
//! Loads bridge configuration from `./wxbridge.toml` (or `$WXBRIDGE_CONFIG_PATH`).
//! Environment variables override file values; file values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::credentials::load_credentials;

/// Status string the backend reports once the account is logged in.
pub const DEFAULT_LOGGED_IN_STATUS: &str = "已登录";

/// Identifier substring that marks a multi-party chat.
pub const DEFAULT_GROUP_MARKER: &str = "@chatroom";

// ── Top-level config ────────────────────────────────────────────

/// Top-level bridge configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// How to reach the backend.
    pub backend: BackendConfig,
    /// Session and retry behaviour.
    pub bridge: SessionConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// If the file does not exist, returns defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_from_file() -> Result<Self> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve the config path using a custom env resolver.
    pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("WXBRIDGE_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("wxbridge.toml"))
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver function so tests never touch the process environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("WXBRIDGE_BASE_URL") {
            self.backend.base_url = v;
        }
        if let Some(v) = env("WXBRIDGE_WS_URL") {
            self.backend.ws_url = Some(v);
        }
        if let Some(v) = env("WXBRIDGE_TOKEN") {
            self.backend.token = Some(v);
        }
        if let Some(v) = env("WXBRIDGE_CREDENTIALS") {
            self.backend.credentials_file = Some(PathBuf::from(v));
        }
        if let Some(v) = env("WXBRIDGE_SESSION_ID") {
            self.bridge.session_id = v;
        }
        override_u64(
            &env,
            "WXBRIDGE_RECONNECT_MS",
            &mut self.bridge.reconnect_interval_ms,
        );
        override_u64(
            &env,
            "WXBRIDGE_LOGIN_POLL_MS",
            &mut self.bridge.login_poll_interval_ms,
        );
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }
}

fn override_u64(env: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut u64) {
    if let Some(v) = env(key) {
        match v.parse() {
            Ok(n) => *slot = n,
            Err(_) => tracing::warn!(var = key, value = %v, "ignoring invalid env override"),
        }
    }
}

// ── Backend config ──────────────────────────────────────────────

/// Backend REST/WebSocket endpoint settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL for the REST API.
    pub base_url: String,
    /// Explicit streaming URL; derived from `base_url` when unset.
    pub ws_url: Option<String>,
    /// Bearer token. Takes priority over `token_env`.
    pub token: Option<String>,
    /// Name of the credential holding the token.
    pub token_env: String,
    /// Private `.env` file searched for `token_env`.
    pub credentials_file: Option<PathBuf>,
    /// The authenticated status sentinel.
    pub logged_in_status: String,
    /// Per-request timeout for REST calls, in seconds.
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("ws_url", &self.ws_url)
            .field("token", &self.token.as_ref().map(|_| "__REDACTED__"))
            .field("token_env", &self.token_env)
            .field("credentials_file", &self.credentials_file)
            .field("logged_in_status", &self.logged_in_status)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8899".to_owned(),
            ws_url: None,
            token: None,
            token_env: "WXBRIDGE_TOKEN".to_owned(),
            credentials_file: None,
            logged_in_status: DEFAULT_LOGGED_IN_STATUS.to_owned(),
            request_timeout_secs: 30,
        }
    }
}

impl BackendConfig {
    /// Streaming endpoint URL, token-qualified when a token is known.
    ///
    /// Without an explicit `ws_url`, the scheme of `base_url` is swapped
    /// (`http` → `ws`, `https` → `wss`) and `/ws` is appended. The token is
    /// form-encoded into the query string.
    pub fn stream_url(&self, token: Option<&str>) -> String {
        let raw = match &self.ws_url {
            Some(url) => url.clone(),
            None => format!("{}/ws", self.base_url.trim_end_matches('/')),
        };
        let mut url = match url::Url::parse(&raw) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(url = %raw, error = %e, "stream URL is not a valid URL");
                return raw;
            }
        };
        if self.ws_url.is_none() {
            let scheme = match url.scheme() {
                "https" => Some("wss"),
                "http" => Some("ws"),
                _ => None,
            };
            if let Some(scheme) = scheme {
                // http -> ws and https -> wss are both special schemes, so this cannot fail.
                let _ = url.set_scheme(scheme);
            }
        }
        if let Some(t) = token.filter(|t| !t.is_empty()) {
            url.query_pairs_mut().append_pair("token", t);
        }
        url.into()
    }

    /// Resolve the bearer token: inline value first, then the credentials file.
    ///
    /// # Errors
    ///
    /// Returns an error if a credentials file is configured but unreadable.
    pub fn resolve_token(&self) -> Result<Option<String>> {
        if let Some(token) = self.token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(Some(token.clone()));
        }
        let Some(path) = &self.credentials_file else {
            return Ok(None);
        };
        let credentials = load_credentials(path)?;
        Ok(credentials.get(&self.token_env).map(str::to_owned))
    }

    /// REST request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ── Session config ──────────────────────────────────────────────

/// Bridge session and retry settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Identifier the session registers under on the host bus.
    pub session_id: String,
    /// Fixed delay between a socket close and the next connect attempt.
    pub reconnect_interval_ms: u64,
    /// Fixed delay between login status polls.
    pub login_poll_interval_ms: u64,
    /// Substring that marks a group chat identifier.
    pub group_marker: String,
    /// Maximum nesting of forward nodes accepted by the composer.
    pub max_forward_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: "wechat".to_owned(),
            reconnect_interval_ms: 5_000,
            login_poll_interval_ms: 10_000,
            group_marker: DEFAULT_GROUP_MARKER.to_owned(),
            max_forward_depth: 8,
        }
    }
}

impl SessionConfig {
    /// Reconnect delay as a [`Duration`].
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    /// Login poll delay as a [`Duration`].
    pub fn login_poll_interval(&self) -> Duration {
        Duration::from_millis(self.login_poll_interval_ms)
    }
}

// ── Logging config ──────────────────────────────────────────────

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for rotated JSON log files.
    pub logs_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from("logs"),
        }
    }
}
