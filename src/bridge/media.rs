//! Outbound image source resolution.
//!
//! Turns any accepted [`ImageSource`] into base64 plus a file name for
//! `POST /send_image`.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use crate::backend::{Backend, BackendError};

use super::segment::ImageSource;

/// File name used when the source carries none.
pub const DEFAULT_IMAGE_NAME: &str = "image.png";

/// A resolved image ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Base64-encoded image bytes.
    pub base64: String,
    /// File name reported to the backend.
    pub filename: String,
}

/// Resolve an image source.
///
/// Accepted forms, in priority order: raw bytes, `base64://` payloads,
/// `http(s)://` URLs (downloaded through `backend`), `file://` URLs, and
/// finally any other string read as a local path.
///
/// # Errors
///
/// Returns [`BackendError`] when a download or file read fails.
pub async fn resolve_image(
    source: &ImageSource,
    backend: &dyn Backend,
) -> Result<ResolvedImage, BackendError> {
    let reference = match source {
        ImageSource::Bytes(bytes) => return Ok(encode(bytes, DEFAULT_IMAGE_NAME.to_owned())),
        ImageSource::Reference(reference) => reference.as_str(),
    };

    if let Some(payload) = reference.strip_prefix("base64://") {
        return Ok(ResolvedImage {
            base64: payload.to_owned(),
            filename: DEFAULT_IMAGE_NAME.to_owned(),
        });
    }

    if reference.starts_with("http://") || reference.starts_with("https://") {
        debug!(url = reference, "downloading outbound image");
        let bytes = backend.fetch_bytes(reference).await?;
        return Ok(encode(&bytes, filename_from_url(reference)));
    }

    if reference.starts_with("file://") {
        let path = file_url_path(reference);
        return read_local(&path).await;
    }

    read_local(reference).await
}

/// Derive an upload name from a URL path's extension.
pub fn filename_from_url(url: &str) -> String {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_owned())
        .unwrap_or_default();
    Path::new(&path)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!("image.{}", ext.to_ascii_lowercase()))
        .unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_owned())
}

fn file_url_path(reference: &str) -> String {
    url::Url::parse(reference)
        .ok()
        .and_then(|u| u.to_file_path().ok())
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| {
            reference
                .strip_prefix("file://")
                .unwrap_or(reference)
                .to_owned()
        })
}

async fn read_local(path: &str) -> Result<ResolvedImage, BackendError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| BackendError::Io {
        path: path.to_owned(),
        source,
    })?;
    let filename = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_owned());
    Ok(encode(&bytes, filename))
}

fn encode(bytes: &[u8], filename: String) -> ResolvedImage {
    ResolvedImage {
        base64: STANDARD.encode(bytes),
        filename,
    }
}
