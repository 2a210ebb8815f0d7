//! Backend stream lifecycle.
//!
//! One background task owns the WebSocket. It walks
//! `Connecting → Open → LoginPolling → Ready`, drops back to
//! `Disconnected` whenever the socket closes or cannot be opened, waits a
//! fixed interval, and tries again. There is no retry cap. A new socket is
//! only opened after the previous one has been fully torn down.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::backend::client::BackendClient;
use crate::backend::frames::{decode_frame, DbMessage, Frame, ListenMessage};
use crate::config::BridgeConfig;

use super::composer::OutboundComposer;
use super::contacts::ContactDirectory;
use super::host::{ChatKind, HostBus, HostEvent, MessageEvent, ReplyHandle};
use super::normalize::normalize;
use super::session::BridgeSession;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Where the connection loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No socket; waiting out the reconnect interval.
    Disconnected,
    /// Socket handshake in flight.
    Connecting,
    /// Socket open, login not yet checked.
    Open,
    /// Polling `/status` until the backend reports a login.
    LoginPolling,
    /// Logged in, contacts loaded, session registered.
    Ready,
}

/// Owns the stream, the reconnect timer, and the login poll.
pub struct ConnectionManager {
    ws_url: String,
    ws_url_display: String,
    logged_in_status: String,
    reconnect_interval: Duration,
    login_poll_interval: Duration,
    session: Arc<BridgeSession>,
    directory: Arc<RwLock<ContactDirectory>>,
    bus: Arc<dyn HostBus>,
    state: watch::Sender<ConnectionState>,
}

/// Caller-owned handle to a running bridge.
#[derive(Debug)]
pub struct BridgeHandle {
    session: Arc<BridgeSession>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl BridgeHandle {
    /// Session used for sends and contact lookups.
    pub fn session(&self) -> Arc<BridgeSession> {
        Arc::clone(&self.session)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Stop the connection loop and drop the socket.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Build a bridge from configuration and start its connection loop.
///
/// Must be called inside a Tokio runtime.
pub fn connect(config: &BridgeConfig, token: Option<String>, bus: Arc<dyn HostBus>) -> BridgeHandle {
    ConnectionManager::new(config, token, bus).spawn()
}

impl ConnectionManager {
    /// Wire a client, directory, composer, and session from configuration.
    pub fn new(config: &BridgeConfig, token: Option<String>, bus: Arc<dyn HostBus>) -> Self {
        let client = BackendClient::from_config(&config.backend, token);
        let directory = Arc::new(RwLock::new(ContactDirectory::new(
            config.bridge.group_marker.clone(),
        )));
        let composer = Arc::new(OutboundComposer::new(
            Arc::new(client.clone()),
            Arc::clone(&directory),
            config.bridge.max_forward_depth,
        ));
        let session = Arc::new(BridgeSession::new(
            config.bridge.session_id.clone(),
            client.clone(),
            Arc::clone(&directory),
            composer,
        ));
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            ws_url: config.backend.stream_url(client.token()),
            ws_url_display: config.backend.stream_url(None),
            logged_in_status: config.backend.logged_in_status.clone(),
            reconnect_interval: config.bridge.reconnect_interval(),
            login_poll_interval: config.bridge.login_poll_interval(),
            session,
            directory,
            bus,
            state,
        }
    }

    /// Start the connection loop as a background task.
    pub fn spawn(self) -> BridgeHandle {
        let session = Arc::clone(&self.session);
        let state = self.state.subscribe();
        let task = tokio::spawn(self.run());
        BridgeHandle {
            session,
            state,
            task,
        }
    }

    fn set_state(&self, next: ConnectionState) {
        debug!(state = ?next, "connection state");
        self.state.send_replace(next);
    }

    async fn run(self) {
        loop {
            self.set_state(ConnectionState::Connecting);
            info!(url = %self.ws_url_display, "connecting to backend stream");

            match connect_async(self.ws_url.as_str()).await {
                Ok((socket, _response)) => {
                    self.set_state(ConnectionState::Open);
                    info!("backend stream open");
                    self.serve(socket).await;
                    info!("backend stream closed");
                }
                Err(e) => {
                    warn!(error = %e, "backend stream connection failed");
                }
            }

            self.set_state(ConnectionState::Disconnected);
            info!(
                delay_ms = self.reconnect_interval.as_millis(),
                "reconnecting after delay"
            );
            tokio::time::sleep(self.reconnect_interval).await;
        }
    }

    /// Read frames until the socket closes, running the login poll alongside.
    async fn serve(&self, socket: Socket) {
        let (mut sink, mut reader) = socket.split();

        self.set_state(ConnectionState::LoginPolling);
        let login = self.wait_for_login();
        tokio::pin!(login);
        let mut ready = false;

        loop {
            tokio::select! {
                () = &mut login, if !ready => {
                    ready = true;
                    self.on_ready().await;
                }
                msg = reader.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()).await,
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sink.send(Message::Pong(data)).await {
                            warn!(error = %e, "failed to answer ping");
                            return;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "backend stream error");
                        return;
                    }
                },
            }
        }
    }

    /// Poll `/status` until the backend reports the logged-in sentinel.
    ///
    /// Transport failures count as "not logged in".
    async fn wait_for_login(&self) {
        loop {
            match self.session.client().status().await {
                Ok(status) if status.status == self.logged_in_status => {
                    info!(version = ?status.version, "backend logged in");
                    return;
                }
                Ok(status) => {
                    info!(status = %status.status, "backend not logged in yet");
                }
                Err(e) => {
                    warn!(error = %e, "status poll failed");
                }
            }
            tokio::time::sleep(self.login_poll_interval).await;
        }
    }

    async fn on_ready(&self) {
        self.set_state(ConnectionState::Ready);
        if let Err(e) = self.session.load().await {
            warn!(error = %e, "contact snapshot unavailable, continuing with known contacts");
        }
        self.bus.register(Arc::clone(&self.session)).await;
        self.bus
            .emit(HostEvent::Connect {
                session_id: self.session.id().to_owned(),
            })
            .await;
        info!(session = %self.session.id(), "bridge ready");
    }

    async fn handle_text(&self, text: &str) {
        let frame = match decode_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "discarding undecodable frame");
                return;
            }
        };

        match &frame {
            Frame::Sent(ack) => {
                info!(to = %ack.to, verified = ack.verified, "backend confirmed send");
            }
            Frame::DbMessage(msg) if msg.is_self => {
                debug!(chat = %msg.chat, local_id = msg.local_id, "ignoring self-authored message");
            }
            Frame::DbMessage(msg) => {
                let event = {
                    let mut directory = self.directory.write().await;
                    directory.upsert_from_frame(&frame);
                    self.db_event(&directory, msg)
                };
                self.bus.emit(HostEvent::Message(Box::new(event))).await;
            }
            Frame::ListenMessage(msg) => {
                let event = {
                    let mut directory = self.directory.write().await;
                    directory.upsert_from_frame(&frame);
                    self.listen_event(&directory, msg)
                };
                self.bus.emit(HostEvent::Message(Box::new(event))).await;
            }
        }
    }

    fn db_event(&self, directory: &ContactDirectory, msg: &DbMessage) -> MessageEvent {
        let is_group = directory.is_group(&msg.chat);
        let talker = if msg.talker.is_empty() && !is_group {
            msg.chat.clone()
        } else {
            msg.talker.clone()
        };
        let sender_name = non_empty(msg.talker_display_name.as_deref())
            .map(str::to_owned)
            .unwrap_or_else(|| talker.clone());
        let normalized = normalize(msg.parsed.as_ref(), Some(&msg.content));
        let message_id = if msg.local_id > 0 {
            format!("{}:{}", msg.chat, msg.local_id)
        } else {
            uuid::Uuid::new_v4().to_string()
        };
        let time = if msg.create_time > 0 {
            msg.create_time
        } else {
            Utc::now().timestamp()
        };

        self.envelope(EnvelopeParts {
            chat: &msg.chat,
            chat_name: non_empty(msg.chat_display_name.as_deref()),
            is_group,
            message_id,
            sender_id: talker,
            sender_name,
            segments: normalized.segments,
            display: normalized.display,
            time,
        })
    }

    fn listen_event(&self, directory: &ContactDirectory, msg: &ListenMessage) -> MessageEvent {
        let is_group = directory.is_group(&msg.from);
        let sender = non_empty(msg.sender.as_deref())
            .map(str::to_owned)
            .unwrap_or_else(|| msg.from.clone());
        let normalized = normalize(None, Some(&msg.content));

        self.envelope(EnvelopeParts {
            chat: &msg.from,
            chat_name: None,
            is_group,
            message_id: uuid::Uuid::new_v4().to_string(),
            sender_id: sender.clone(),
            sender_name: sender,
            segments: normalized.segments,
            display: normalized.display,
            time: Utc::now().timestamp(),
        })
    }

    fn envelope(&self, parts: EnvelopeParts<'_>) -> MessageEvent {
        let (kind, group_id, group_name) = if parts.is_group {
            (
                ChatKind::Group,
                Some(parts.chat.to_owned()),
                Some(parts.chat_name.unwrap_or(parts.chat).to_owned()),
            )
        } else {
            (ChatKind::Private, None, None)
        };
        MessageEvent {
            session_id: self.session.id().to_owned(),
            kind,
            message_id: parts.message_id,
            sender_id: parts.sender_id,
            sender_name: parts.sender_name,
            group_id,
            group_name,
            segments: parts.segments,
            display: parts.display,
            time: parts.time,
            reply: ReplyHandle::new(self.session.composer(), parts.chat),
        }
    }
}

struct EnvelopeParts<'a> {
    chat: &'a str,
    chat_name: Option<&'a str>,
    is_group: bool,
    message_id: String,
    sender_id: String,
    sender_name: String,
    segments: Vec<super::segment::Segment>,
    display: String,
    time: i64,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
