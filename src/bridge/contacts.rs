//! In-memory friend and group directory.
//!
//! Populated wholesale from the backend's contact snapshot once the session
//! is ready, then patched from every inbound message. Stale entries are
//! never removed between snapshots.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, trace};

use crate::backend::client::ContactEntry;
use crate::backend::frames::{DbMessage, Frame, ListenMessage};

/// Whether an identifier names a one-to-one contact or a group chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    /// One-to-one contact.
    Friend,
    /// Multi-party chat.
    Group,
}

/// A directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    /// Directory key.
    pub id: String,
    /// Derived from `id` via the group marker.
    pub kind: ContactKind,
    /// Name shown to the host.
    pub display_name: String,
    /// Username as reported by the backend.
    pub raw_username: String,
    /// Name the logged-in user assigned, if any.
    pub remark_name: Option<String>,
}

impl Contact {
    /// Record for an identifier the directory does not know.
    pub fn fallback(id: &str, kind: ContactKind) -> Self {
        Self {
            id: id.to_owned(),
            kind,
            display_name: id.to_owned(),
            raw_username: id.to_owned(),
            remark_name: None,
        }
    }
}

/// Friend and group maps keyed by identifier.
#[derive(Debug, Clone)]
pub struct ContactDirectory {
    group_marker: String,
    friends: HashMap<String, Contact>,
    groups: HashMap<String, Contact>,
}

impl ContactDirectory {
    /// Create an empty directory using `group_marker` for classification.
    pub fn new(group_marker: impl Into<String>) -> Self {
        Self {
            group_marker: group_marker.into(),
            friends: HashMap::new(),
            groups: HashMap::new(),
        }
    }

    /// Classify an identifier by the group-marker substring rule.
    pub fn classify(&self, id: &str) -> ContactKind {
        if !self.group_marker.is_empty() && id.contains(self.group_marker.as_str()) {
            ContactKind::Group
        } else {
            ContactKind::Friend
        }
    }

    /// Whether `id` names a group chat.
    pub fn is_group(&self, id: &str) -> bool {
        self.classify(id) == ContactKind::Group
    }

    fn map_mut(&mut self, kind: ContactKind) -> &mut HashMap<String, Contact> {
        match kind {
            ContactKind::Friend => &mut self.friends,
            ContactKind::Group => &mut self.groups,
        }
    }

    /// Replace both maps from a contact snapshot.
    ///
    /// Entries with neither a `wxid` nor a `username` are skipped. The
    /// display name is the first non-empty of `display_name`, the remark,
    /// the nickname, and the identifier.
    /// Returns `(friends, groups)` counts after the load.
    pub fn upsert_from_snapshot(&mut self, entries: &[ContactEntry]) -> (usize, usize) {
        let mut friends = HashMap::new();
        let mut groups = HashMap::new();

        for entry in entries {
            let Some(id) = snapshot_id(entry) else {
                trace!(?entry, "skipping contact without identifier");
                continue;
            };
            let remark_name = non_empty(entry.remark_name.as_deref()).map(str::to_owned);
            let display_name = non_empty(entry.display_name.as_deref())
                .or(remark_name.as_deref())
                .or_else(|| non_empty(entry.nick_name.as_deref()))
                .map_or_else(|| id.clone(), str::to_owned);
            let kind = self.classify(&id);
            let contact = Contact {
                id: id.clone(),
                kind,
                display_name,
                raw_username: entry.username.clone(),
                remark_name,
            };
            match kind {
                ContactKind::Friend => friends.insert(id, contact),
                ContactKind::Group => groups.insert(id, contact),
            };
        }

        self.friends = friends;
        self.groups = groups;
        debug!(
            friends = self.friends.len(),
            groups = self.groups.len(),
            "contact snapshot loaded"
        );
        (self.friends.len(), self.groups.len())
    }

    /// Record an identifier seen on the wire.
    ///
    /// A supplied display name always wins. Without one, an unknown
    /// identifier is inserted under its own id and a known one is left alone.
    pub fn upsert(&mut self, id: &str, display_name: Option<&str>) {
        if id.is_empty() {
            return;
        }
        let kind = self.classify(id);
        let display_name = non_empty(display_name);
        let map = self.map_mut(kind);
        match map.get_mut(id) {
            Some(existing) => {
                if let Some(name) = display_name {
                    existing.display_name = name.to_owned();
                }
            }
            None => {
                let mut contact = Contact::fallback(id, kind);
                if let Some(name) = display_name {
                    contact.display_name = name.to_owned();
                }
                map.insert(id.to_owned(), contact);
            }
        }
    }

    /// Patch the directory from an inbound frame's identity fields.
    pub fn upsert_from_frame(&mut self, frame: &Frame) {
        match frame {
            Frame::DbMessage(msg) => self.upsert_from_db_message(msg),
            Frame::ListenMessage(msg) => self.upsert_from_listen_message(msg),
            Frame::Sent(_) => {}
        }
    }

    /// Patch from a persisted message: the chat and, when distinct, the talker.
    pub fn upsert_from_db_message(&mut self, msg: &DbMessage) {
        self.upsert(&msg.chat, msg.chat_display_name.as_deref());
        if !msg.talker.is_empty() && msg.talker != msg.chat {
            self.upsert(&msg.talker, msg.talker_display_name.as_deref());
        }
    }

    /// Patch from an ephemeral message. Only the chat is known.
    pub fn upsert_from_listen_message(&mut self, msg: &ListenMessage) {
        self.upsert(&msg.from, None);
    }

    /// Look an identifier up in either map.
    pub fn get(&self, id: &str) -> Option<&Contact> {
        self.friends.get(id).or_else(|| self.groups.get(id))
    }

    /// Friend record for `id`, or a fallback built from `id`.
    pub fn friend(&self, id: &str) -> Contact {
        self.friends
            .get(id)
            .cloned()
            .unwrap_or_else(|| Contact::fallback(id, ContactKind::Friend))
    }

    /// Group record for `id`, or a fallback built from `id`.
    pub fn group(&self, id: &str) -> Contact {
        self.groups
            .get(id)
            .cloned()
            .unwrap_or_else(|| Contact::fallback(id, ContactKind::Group))
    }

    /// Display name for `id`, falling back to `id` itself.
    pub fn display_name(&self, id: &str) -> String {
        self.get(id)
            .map(|c| c.display_name.clone())
            .unwrap_or_else(|| id.to_owned())
    }

    /// All friends, sorted by identifier.
    pub fn friends(&self) -> Vec<Contact> {
        sorted(&self.friends)
    }

    /// All groups, sorted by identifier.
    pub fn groups(&self) -> Vec<Contact> {
        sorted(&self.groups)
    }
}

impl Default for ContactDirectory {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_GROUP_MARKER)
    }
}

fn snapshot_id(entry: &ContactEntry) -> Option<String> {
    non_empty(entry.wxid.as_deref())
        .or_else(|| non_empty(Some(entry.username.as_str())))
        .map(str::to_owned)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn sorted(map: &HashMap<String, Contact>) -> Vec<Contact> {
    let mut contacts: Vec<Contact> = map.values().cloned().collect();
    contacts.sort_by(|a, b| a.id.cmp(&b.id));
    contacts
}
