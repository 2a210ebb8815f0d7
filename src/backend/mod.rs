//! Backend adapter: REST client, streaming frame types, and the send seam.
//!
//! The backend is a co-located chat-automation service exposing REST
//! endpoints plus a single WebSocket stream at `/ws`.

pub mod client;
pub mod frames;

use async_trait::async_trait;
use serde::Deserialize;

/// Errors from talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// HTTP request to the backend failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success HTTP status.
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// Endpoint path that was called.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },

    /// The backend reported an error in its response body.
    #[error("backend rejected request: {0}")]
    Rejected(String),

    /// A response or frame body could not be decoded.
    #[error("invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// Reading a local file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Body returned by `POST /send` and `POST /send_image`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SendReceipt {
    /// Whether the backend accepted and sent the message.
    pub sent: bool,
    /// Whether delivery was verified in the chat window.
    pub verified: bool,
    /// Human-readable outcome.
    pub message: Option<String>,
    /// Error description on failure.
    pub error: Option<String>,
}

impl SendReceipt {
    /// Backend-supplied explanation, preferring `message` over `error`.
    pub fn reason(&self) -> &str {
        self.message
            .as_deref()
            .filter(|m| !m.is_empty())
            .or(self.error.as_deref())
            .unwrap_or("no reason given")
    }
}

/// Backend-facing I/O used by the outbound composer.
///
/// [`client::BackendClient`] is the production implementation.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Send one text message.
    async fn send_text(&self, to: &str, text: &str) -> Result<SendReceipt, BackendError>;

    /// Send one image given as base64 with a file name.
    async fn send_image(
        &self,
        to: &str,
        file_base64: &str,
        name: &str,
    ) -> Result<SendReceipt, BackendError>;

    /// Download a remote resource referenced by an outbound image.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, BackendError>;
}
