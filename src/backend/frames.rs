//! Frames pushed by the backend over the `/ws` stream.
//!
//! Every frame is a JSON object with a `type` discriminator. Unknown
//! discriminators and malformed JSON are reported as [`FrameError`] so the
//! connection loop can log and skip them.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// A decoded stream frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A message persisted in the backend's message store.
    DbMessage(DbMessage),
    /// An ephemeral message scraped from a watched chat window.
    ListenMessage(ListenMessage),
    /// Delivery acknowledgement for a send issued through the REST API.
    Sent(SentAck),
}

/// Why a frame could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame was not valid JSON or did not match its variant's shape.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The frame was JSON but carried an unknown or missing `type`.
    #[error("unknown frame type: {0:?}")]
    UnknownType(Option<String>),
}

/// Decode a text frame.
///
/// # Errors
///
/// Returns [`FrameError`] for invalid JSON, a shape mismatch, or an
/// unrecognised `type`.
pub fn decode_frame(text: &str) -> Result<Frame, FrameError> {
    let value: Value = serde_json::from_str(text)?;
    let kind = value.get("type").and_then(Value::as_str).map(str::to_owned);
    match kind.as_deref() {
        Some("db_message") => Ok(Frame::DbMessage(serde_json::from_value(value)?)),
        Some("listen_message") => Ok(Frame::ListenMessage(serde_json::from_value(value)?)),
        Some("sent") => Ok(Frame::Sent(serde_json::from_value(value)?)),
        _ => Err(FrameError::UnknownType(kind)),
    }
}

/// `db_message` frame body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DbMessage {
    /// Conversation identifier (a contact id or a group id).
    #[serde(deserialize_with = "null_as_empty")]
    pub chat: String,
    /// Conversation display name, if the backend resolved one.
    pub chat_display_name: Option<String>,
    /// Identifier of the author. Empty in one-to-one chats.
    #[serde(deserialize_with = "null_as_empty")]
    pub talker: String,
    /// Author display name, if the backend resolved one.
    pub talker_display_name: Option<String>,
    /// Raw message body as stored by the backend.
    #[serde(deserialize_with = "null_as_empty")]
    pub content: String,
    /// Typed interpretation of `content`.
    #[serde(deserialize_with = "lenient_parsed")]
    pub parsed: Option<ParsedContent>,
    /// Creation time in seconds since the epoch.
    pub create_time: i64,
    /// Backend-local row identifier.
    pub local_id: i64,
    /// Backend message type code.
    pub msg_type: Option<i64>,
    /// Whether the logged-in account authored the message.
    #[serde(alias = "is_sender")]
    pub is_self: bool,
}

/// `listen_message` frame body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ListenMessage {
    /// Watched chat the message appeared in.
    #[serde(deserialize_with = "null_as_empty")]
    pub from: String,
    /// Author as displayed in the chat window, if distinguishable.
    pub sender: Option<String>,
    /// Free-form classification label.
    pub msg_type: Option<String>,
    /// Message text.
    #[serde(deserialize_with = "null_as_empty")]
    pub content: String,
}

/// `sent` frame body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SentAck {
    /// Recipient of the acknowledged send.
    pub to: String,
    /// Text that was sent, when echoed back.
    pub text: Option<String>,
    /// Whether the backend verified the message appeared in the chat.
    pub verified: bool,
}

/// Typed interpretation of a persisted message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawParsed")]
pub enum ParsedContent {
    /// Plain text.
    Text {
        /// Extracted text, if any.
        text: Option<String>,
    },
    /// A picture.
    Image,
    /// A voice note.
    Voice {
        /// Length of the recording in milliseconds.
        duration_ms: Option<i64>,
    },
    /// A video clip.
    Video,
    /// A sticker.
    Emoji,
    /// A shared link or mini-program card.
    App {
        /// Card title.
        title: Option<String>,
        /// Card description.
        desc: Option<String>,
        /// Link target.
        url: Option<String>,
    },
    /// A system notice (joins, recalls, ...).
    System {
        /// Notice text, if any.
        text: Option<String>,
    },
    /// Any other or missing `type`.
    Unrecognized {
        /// The unrecognised `type` value.
        kind: Option<String>,
    },
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Objects decode through [`RawParsed`]; any other non-null shape is
/// [`ParsedContent::Unrecognized`] so the raw content still gets through.
fn lenient_parsed<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ParsedContent>, D::Error> {
    let parsed = match Value::deserialize(deserializer)? {
        Value::Null => None,
        value @ Value::Object(_) => Some(
            serde_json::from_value::<RawParsed>(value)
                .map(ParsedContent::from)
                .unwrap_or(ParsedContent::Unrecognized { kind: None }),
        ),
        _ => Some(ParsedContent::Unrecognized { kind: None }),
    };
    Ok(parsed)
}

#[derive(Deserialize)]
struct RawParsed {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(flatten)]
    data: Map<String, Value>,
}

impl RawParsed {
    /// Look a field up at the top level, then under a nested `data` object.
    fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key).or_else(|| {
            self.data
                .get("data")
                .and_then(Value::as_object)
                .and_then(|nested| nested.get(key))
        })
    }

    fn text(&self, key: &str) -> Option<String> {
        self.field(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    }

    fn millis(&self) -> Option<i64> {
        ["duration_ms", "duration"]
            .iter()
            .filter_map(|key| self.field(key))
            .find_map(|v| {
                v.as_i64()
                    .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
            })
    }
}

impl From<RawParsed> for ParsedContent {
    fn from(raw: RawParsed) -> Self {
        let kind = raw.kind.as_deref().map(str::to_ascii_lowercase);
        match kind.as_deref() {
            Some("text") => Self::Text {
                text: raw.text("text"),
            },
            Some("image") => Self::Image,
            Some("voice") => Self::Voice {
                duration_ms: raw.millis(),
            },
            Some("video") => Self::Video,
            Some("emoji") => Self::Emoji,
            Some("app") => Self::App {
                title: raw.text("title"),
                desc: raw.text("desc"),
                url: raw.text("url"),
            },
            Some("system") => Self::System {
                text: raw.text("text"),
            },
            _ => Self::Unrecognized { kind: raw.kind },
        }
    }
}
