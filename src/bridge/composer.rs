//! Outbound message decomposition.
//!
//! Flattens any [`OutboundMessage`] into an ordered series of backend send
//! calls: one text send carrying every text-like segment, then each image in
//! order. Forward bundles are expanded into independent sends as they are
//! encountered. Every call is awaited before the next is issued.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::backend::Backend;

use super::contacts::ContactDirectory;
use super::media::resolve_image;
use super::segment::{ImageSource, OutboundMessage, Segment};
use super::BridgeError;

/// Separator the backend renders after an @-mention.
pub const MENTION_SEPARATOR: char = '\u{2005}';

/// Placeholder text for a built-in emoticon.
pub const FACE_PLACEHOLDER: &str = "[face]";

/// Outcome counts of one `compose` call, including nested forwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposeReport {
    /// Sends the backend confirmed.
    pub delivered: usize,
    /// Sends rejected, failed in transport, or skipped on a bad image source.
    pub failed: usize,
}

impl ComposeReport {
    fn record(&mut self, ok: bool) {
        if ok {
            self.delivered = self.delivered.saturating_add(1);
        } else {
            self.failed = self.failed.saturating_add(1);
        }
    }
}

type ComposeFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BridgeError>> + Send + 'a>>;

/// Sends host messages through the backend.
pub struct OutboundComposer {
    backend: Arc<dyn Backend>,
    directory: Arc<RwLock<ContactDirectory>>,
    max_forward_depth: usize,
}

impl std::fmt::Debug for OutboundComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundComposer")
            .field("max_forward_depth", &self.max_forward_depth)
            .finish_non_exhaustive()
    }
}

impl OutboundComposer {
    /// Create a composer sending through `backend`.
    pub fn new(
        backend: Arc<dyn Backend>,
        directory: Arc<RwLock<ContactDirectory>>,
        max_forward_depth: usize,
    ) -> Self {
        Self {
            backend,
            directory,
            max_forward_depth,
        }
    }

    /// Send `message` to `to`.
    ///
    /// Backend rejections and unreadable images are logged and counted in
    /// the report; they never fail the call.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ForwardTooDeep`] when forward bundles nest
    /// deeper than the configured limit. Sends issued before that point are
    /// not undone.
    pub async fn compose(
        &self,
        to: &str,
        message: &OutboundMessage,
    ) -> Result<ComposeReport, BridgeError> {
        let mut report = ComposeReport::default();
        self.compose_at(to, message, 0, &mut report).await?;
        Ok(report)
    }

    fn compose_at<'a>(
        &'a self,
        to: &'a str,
        message: &'a OutboundMessage,
        depth: usize,
        report: &'a mut ComposeReport,
    ) -> ComposeFuture<'a> {
        Box::pin(async move {
            let segments = message.segments();
            let mut text = String::new();
            let mut images: Vec<&ImageSource> = Vec::new();

            for segment in segments.iter() {
                match segment {
                    Segment::Text { text: part } => text.push_str(part),
                    Segment::Mention { user_id } => {
                        text.push_str(&self.render_mention(user_id).await);
                    }
                    Segment::Image { file } => images.push(file),
                    Segment::UnsupportedMedia { kind } => text.push_str(kind.placeholder()),
                    Segment::Face { .. } => text.push_str(FACE_PLACEHOLDER),
                    Segment::Reply { .. } | Segment::Button { .. } => {}
                    Segment::ForwardNode { nodes } => {
                        let next = depth.saturating_add(1);
                        if next > self.max_forward_depth {
                            return Err(BridgeError::ForwardTooDeep {
                                max: self.max_forward_depth,
                            });
                        }
                        for node in nodes {
                            self.compose_at(to, &node.message, next, report).await?;
                        }
                    }
                }
            }

            let text = text.trim();
            if !text.is_empty() {
                let ok = self.send_text(to, text).await;
                report.record(ok);
            }

            for source in images {
                match resolve_image(source, self.backend.as_ref()).await {
                    Ok(image) => {
                        let ok = self.send_image(to, &image.base64, &image.filename).await;
                        report.record(ok);
                    }
                    Err(e) => {
                        warn!(to, error = %e, "skipping image that could not be resolved");
                        report.record(false);
                    }
                }
            }

            Ok(())
        })
    }

    async fn render_mention(&self, user_id: &str) -> String {
        let name = self.directory.read().await.display_name(user_id);
        format!("@{name}{MENTION_SEPARATOR}")
    }

    /// Send one text message. Returns whether the backend confirmed it.
    pub async fn send_text(&self, to: &str, text: &str) -> bool {
        match self.backend.send_text(to, text).await {
            Ok(receipt) if receipt.sent => {
                debug!(to, verified = receipt.verified, "text sent");
                true
            }
            Ok(receipt) => {
                warn!(to, reason = receipt.reason(), "backend refused text send");
                false
            }
            Err(e) => {
                warn!(to, error = %e, "text send failed");
                false
            }
        }
    }

    /// Send one base64 image. Returns whether the backend confirmed it.
    pub async fn send_image(&self, to: &str, file_base64: &str, name: &str) -> bool {
        match self.backend.send_image(to, file_base64, name).await {
            Ok(receipt) if receipt.sent => {
                debug!(to, name, "image sent");
                true
            }
            Ok(receipt) => {
                warn!(to, name, reason = receipt.reason(), "backend refused image send");
                false
            }
            Err(e) => {
                warn!(to, name, error = %e, "image send failed");
                false
            }
        }
    }
}
