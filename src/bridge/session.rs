//! The session handle registered with the host.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::backend::client::BackendClient;

use super::composer::{ComposeReport, OutboundComposer};
use super::contacts::{Contact, ContactDirectory};
use super::segment::OutboundMessage;
use super::BridgeError;

/// Host-facing handle for one bridge session.
#[derive(Debug)]
pub struct BridgeSession {
    id: String,
    client: BackendClient,
    directory: Arc<RwLock<ContactDirectory>>,
    composer: Arc<OutboundComposer>,
}

/// A picked contact that messages can be sent to.
#[derive(Debug, Clone)]
pub struct ContactTarget {
    /// The resolved (or fallback) contact.
    pub contact: Contact,
    composer: Arc<OutboundComposer>,
}

impl ContactTarget {
    /// Send `message` to this contact.
    ///
    /// # Errors
    ///
    /// Propagates [`OutboundComposer::compose`] errors.
    pub async fn send_msg(
        &self,
        message: impl Into<OutboundMessage>,
    ) -> Result<ComposeReport, BridgeError> {
        self.composer
            .compose(&self.contact.id, &message.into())
            .await
    }
}

impl BridgeSession {
    /// Create a session over an existing client, directory, and composer.
    pub fn new(
        id: impl Into<String>,
        client: BackendClient,
        directory: Arc<RwLock<ContactDirectory>>,
        composer: Arc<OutboundComposer>,
    ) -> Self {
        Self {
            id: id.into(),
            client,
            directory,
            composer,
        }
    }

    /// Session identifier on the host bus.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// REST client shared with the connection manager.
    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Composer used for every send from this session.
    pub fn composer(&self) -> Arc<OutboundComposer> {
        Arc::clone(&self.composer)
    }

    /// Fetch the contact snapshot and replace the directory with it.
    ///
    /// Returns the number of loaded entries.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Backend`] if the snapshot cannot be fetched.
    pub async fn load(&self) -> Result<usize, BridgeError> {
        let entries = self.client.contacts().await?;
        let (friends, groups) = self.directory.write().await.upsert_from_snapshot(&entries);
        info!(session = %self.id, friends, groups, "contacts loaded");
        Ok(friends.saturating_add(groups))
    }

    /// Resolve a friend, falling back to a record built from `id`.
    pub async fn pick_friend(&self, id: &str) -> ContactTarget {
        let contact = self.directory.read().await.friend(id);
        self.target(contact)
    }

    /// Resolve a group, falling back to a record built from `id`.
    pub async fn pick_group(&self, id: &str) -> ContactTarget {
        let contact = self.directory.read().await.group(id);
        self.target(contact)
    }

    fn target(&self, contact: Contact) -> ContactTarget {
        ContactTarget {
            contact,
            composer: self.composer(),
        }
    }

    /// All known friends.
    pub async fn friends(&self) -> Vec<Contact> {
        self.directory.read().await.friends()
    }

    /// All known groups.
    pub async fn groups(&self) -> Vec<Contact> {
        self.directory.read().await.groups()
    }

    /// Send `message` to any identifier.
    ///
    /// # Errors
    ///
    /// Propagates [`OutboundComposer::compose`] errors.
    pub async fn send(
        &self,
        to: &str,
        message: impl Into<OutboundMessage>,
    ) -> Result<ComposeReport, BridgeError> {
        self.composer.compose(to, &message.into()).await
    }

    /// Raw backend API passthrough. Not supported by this bridge.
    ///
    /// # Errors
    ///
    /// Always returns [`BridgeError::Unsupported`].
    pub fn call_api(
        &self,
        name: &str,
        _params: serde_json::Value,
    ) -> Result<serde_json::Value, BridgeError> {
        Err(BridgeError::Unsupported(name.to_owned()))
    }
}
