//! HTTP client for the backend REST API.
//!
//! Every call carries the configured bearer token. Remote image downloads
//! go through the same connection pool but without the token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Backend, BackendError, SendReceipt};
use crate::config::BackendConfig;

/// HTTP connect timeout for the reqwest client.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Client for the backend REST API.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "__REDACTED__"))
            .finish()
    }
}

/// `GET /status` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendStatus {
    /// Login state as reported by the backend.
    pub status: String,
    /// Backend version, if reported.
    pub version: Option<String>,
    /// Number of chats the backend is watching, if reported.
    pub listen_count: Option<usize>,
}

/// One entry of the `GET /contacts` list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactEntry {
    /// Account username.
    pub username: String,
    /// Stable account identifier, when it differs from `username`.
    pub wxid: Option<String>,
    /// Backend-resolved display name.
    pub display_name: Option<String>,
    /// Name the logged-in user assigned to this contact.
    #[serde(alias = "remark")]
    pub remark_name: Option<String>,
    /// The account's own nickname.
    pub nick_name: Option<String>,
    /// Custom account handle, if the user set one.
    pub alias: Option<String>,
}

#[derive(Deserialize)]
struct ContactsResponse {
    #[serde(default)]
    contacts: Option<Vec<ContactEntry>>,
    #[serde(default)]
    error: Option<String>,
}

impl BackendClient {
    /// Create a client for `base_url` with an optional bearer token.
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build HTTP client with timeouts, using default");
                reqwest::Client::default()
            });
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            client,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Create a client from backend configuration and a resolved token.
    pub fn from_config(config: &BackendConfig, token: Option<String>) -> Self {
        Self::new(config.base_url.clone(), token, config.request_timeout())
    }

    /// Returns the bearer token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn read_json<T: DeserializeOwned>(
        path: &str,
        resp: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = resp.status();
        let body = resp.bytes().await?;
        match serde_json::from_slice::<T>(&body) {
            Ok(value) => Ok(value),
            Err(_) if !status.is_success() => Err(BackendError::Status {
                endpoint: path.to_owned(),
                status: status.as_u16(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch the backend login status.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an undecodable body.
    pub async fn status(&self) -> Result<BackendStatus, BackendError> {
        let resp = self.request(Method::GET, "/status").send().await?;
        Self::read_json("/status", resp).await
    }

    /// Fetch the contact snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Rejected`] when the backend reports an error
    /// instead of a list, or a transport/decode error.
    pub async fn contacts(&self) -> Result<Vec<ContactEntry>, BackendError> {
        let resp = self.request(Method::GET, "/contacts").send().await?;
        let body: ContactsResponse = Self::read_json("/contacts", resp).await?;
        match (body.contacts, body.error) {
            (Some(contacts), _) => Ok(contacts),
            (None, Some(error)) => Err(BackendError::Rejected(error)),
            (None, None) => Ok(Vec::new()),
        }
    }

    async fn post_send(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<SendReceipt, BackendError> {
        let resp = self.request(Method::POST, path).json(&body).send().await?;
        Self::read_json(path, resp).await
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn send_text(&self, to: &str, text: &str) -> Result<SendReceipt, BackendError> {
        let body = serde_json::json!({ "to": to, "text": text });
        let receipt = self.post_send("/send", body).await?;
        debug!(to, sent = receipt.sent, "text send answered");
        Ok(receipt)
    }

    async fn send_image(
        &self,
        to: &str,
        file_base64: &str,
        name: &str,
    ) -> Result<SendReceipt, BackendError> {
        let body = serde_json::json!({ "to": to, "file": file_base64, "name": name });
        let receipt = self.post_send("/send_image", body).await?;
        debug!(to, name, sent = receipt.sent, "image send answered");
        Ok(receipt)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, BackendError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                endpoint: url.to_owned(),
                status: status.as_u16(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}
