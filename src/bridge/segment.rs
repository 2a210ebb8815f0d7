//! Canonical message segments shared by inbound events and outbound sends.
//!
//! Segments serialise as `{"type": "...", "data": {...}}` objects.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// One unit of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Segment {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// An @-mention of a contact.
    Mention {
        /// Identifier of the mentioned contact.
        user_id: String,
    },
    /// A picture.
    Image {
        /// Where to read the picture from.
        file: ImageSource,
    },
    /// Media the backend cannot send; rendered as a placeholder.
    UnsupportedMedia {
        /// What kind of media it was.
        kind: MediaKind,
    },
    /// A built-in emoticon; rendered as a placeholder.
    Face {
        /// Host-side emoticon identifier.
        #[serde(default)]
        id: String,
    },
    /// Quote of an earlier message. Not representable; dropped on send.
    Reply {
        /// Quoted message identifier.
        #[serde(default)]
        id: String,
    },
    /// Interactive button. Not representable; dropped on send.
    Button {
        /// Host-specific button payload.
        #[serde(default)]
        payload: serde_json::Value,
    },
    /// A bundle of messages delivered one after another.
    ForwardNode {
        /// Bundled messages, in delivery order.
        nodes: Vec<ForwardNode>,
    },
}

impl Segment {
    /// Build a text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Build a mention segment.
    pub fn mention(user_id: impl Into<String>) -> Self {
        Self::Mention {
            user_id: user_id.into(),
        }
    }

    /// Build an image segment.
    pub fn image(file: impl Into<ImageSource>) -> Self {
        Self::Image { file: file.into() }
    }

    /// Build a forward bundle from messages.
    pub fn forward<I, M>(messages: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<OutboundMessage>,
    {
        Self::ForwardNode {
            nodes: messages.into_iter().map(ForwardNode::new).collect(),
        }
    }
}

/// Source of an outbound image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageSource {
    /// Raw image bytes.
    Bytes(Vec<u8>),
    /// `base64://…`, `http(s)://…`, `file://…`, or a bare local path.
    Reference(String),
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&str> for ImageSource {
    fn from(reference: &str) -> Self {
        Self::Reference(reference.to_owned())
    }
}

impl From<String> for ImageSource {
    fn from(reference: String) -> Self {
        Self::Reference(reference)
    }
}

/// Media kinds the backend has no send endpoint for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Voice recording.
    Record,
    /// Video clip.
    Video,
    /// Arbitrary file.
    File,
}

impl MediaKind {
    /// Inline text that stands in for the media.
    pub fn placeholder(self) -> &'static str {
        match self {
            Self::Record => "[voice]",
            Self::Video => "[video]",
            Self::File => "[file]",
        }
    }
}

/// One message inside a forward bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardNode {
    /// Original author, informational only.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Original author name, informational only.
    #[serde(default)]
    pub nickname: Option<String>,
    /// The bundled message.
    pub message: OutboundMessage,
}

impl ForwardNode {
    /// Wrap a message without author metadata.
    pub fn new(message: impl Into<OutboundMessage>) -> Self {
        Self {
            user_id: None,
            nickname: None,
            message: message.into(),
        }
    }
}

/// Anything the host may hand to a send call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    /// A bare string.
    Text(String),
    /// An ordered list of segments.
    Segments(Vec<Segment>),
    /// A single segment.
    Segment(Segment),
}

impl OutboundMessage {
    /// View the message as a segment list.
    pub fn segments(&self) -> Cow<'_, [Segment]> {
        match self {
            Self::Text(text) => Cow::Owned(vec![Segment::text(text.clone())]),
            Self::Segments(segments) => Cow::Borrowed(segments.as_slice()),
            Self::Segment(segment) => Cow::Borrowed(std::slice::from_ref(segment)),
        }
    }
}

impl From<&str> for OutboundMessage {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for OutboundMessage {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Segment> for OutboundMessage {
    fn from(segment: Segment) -> Self {
        Self::Segment(segment)
    }
}

impl From<Vec<Segment>> for OutboundMessage {
    fn from(segments: Vec<Segment>) -> Self {
        Self::Segments(segments)
    }
}
