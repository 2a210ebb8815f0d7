//! Host bus seam: the events the bridge emits and the sink that receives them.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};

use super::composer::{ComposeReport, OutboundComposer};
use super::segment::{OutboundMessage, Segment};
use super::session::BridgeSession;
use super::BridgeError;

/// Whether a message arrived in a one-to-one or a group chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    /// One-to-one chat.
    Private,
    /// Multi-party chat.
    Group,
}

/// Events emitted to the host.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// The session finished logging in and is registered.
    Connect {
        /// Session that became ready.
        session_id: String,
    },
    /// A normalized inbound message.
    Message(Box<MessageEvent>),
}

impl HostEvent {
    /// Bus event name: `connect.<session>`, `message.private`, or `message.group`.
    pub fn name(&self) -> String {
        match self {
            Self::Connect { session_id } => format!("connect.{session_id}"),
            Self::Message(event) => match event.kind {
                ChatKind::Private => "message.private".to_owned(),
                ChatKind::Group => "message.group".to_owned(),
            },
        }
    }
}

/// Envelope of one inbound message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageEvent {
    /// Session that received the message.
    pub session_id: String,
    /// Private or group.
    pub kind: ChatKind,
    /// Synthesized message identifier.
    pub message_id: String,
    /// Author identifier.
    pub sender_id: String,
    /// Author display name (backend-supplied, else the identifier).
    pub sender_name: String,
    /// Group identifier for group messages.
    pub group_id: Option<String>,
    /// Group display name for group messages.
    pub group_name: Option<String>,
    /// Canonical content.
    pub segments: Vec<Segment>,
    /// Human-readable content.
    pub display: String,
    /// Seconds since the epoch.
    pub time: i64,
    /// Replies go back to the originating chat.
    #[serde(skip)]
    pub reply: ReplyHandle,
}

/// Reply callback bound to an inbound message's chat.
#[derive(Clone)]
pub struct ReplyHandle {
    composer: Arc<OutboundComposer>,
    target: String,
}

impl std::fmt::Debug for ReplyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyHandle")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl ReplyHandle {
    /// Bind a reply callback to `target`.
    pub fn new(composer: Arc<OutboundComposer>, target: impl Into<String>) -> Self {
        Self {
            composer,
            target: target.into(),
        }
    }

    /// Chat the reply will be sent to.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Send a reply into the originating chat.
    ///
    /// # Errors
    ///
    /// Propagates [`OutboundComposer::compose`] errors.
    pub async fn reply(
        &self,
        message: impl Into<OutboundMessage>,
    ) -> Result<ComposeReport, BridgeError> {
        self.composer.compose(&self.target, &message.into()).await
    }
}

/// Sink for bridge events. The host provides the concrete implementation.
#[async_trait]
pub trait HostBus: Send + Sync {
    /// Register (or re-register) the session handle once it is ready.
    async fn register(&self, session: Arc<BridgeSession>);

    /// Deliver an event.
    async fn emit(&self, event: HostEvent);
}

/// [`HostBus`] that forwards events into an unbounded channel.
pub struct ChannelBus {
    tx: mpsc::UnboundedSender<HostEvent>,
    session: Mutex<Option<Arc<BridgeSession>>>,
}

impl ChannelBus {
    /// Create a bus and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                session: Mutex::new(None),
            },
            rx,
        )
    }

    /// The registered session, if the bridge has become ready.
    pub async fn session(&self) -> Option<Arc<BridgeSession>> {
        self.session.lock().await.clone()
    }
}

#[async_trait]
impl HostBus for ChannelBus {
    async fn register(&self, session: Arc<BridgeSession>) {
        *self.session.lock().await = Some(session);
    }

    async fn emit(&self, event: HostEvent) {
        // Receiver dropped means the host is shutting down.
        let _ = self.tx.send(event);
    }
}
