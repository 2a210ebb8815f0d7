//! Inbound message normalization.
//!
//! Maps the backend's typed payload to canonical segments plus a
//! human-readable display string.

use crate::backend::frames::ParsedContent;

use super::segment::Segment;

/// Result of normalizing one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// Canonical segments. Empty when the display string is empty.
    pub segments: Vec<Segment>,
    /// Human-readable rendering.
    pub display: String,
}

impl Normalized {
    fn from_display(display: String) -> Self {
        let segments = if display.is_empty() {
            Vec::new()
        } else {
            vec![Segment::text(display.clone())]
        };
        Self { segments, display }
    }
}

/// Normalize a parsed payload, falling back to the raw content.
pub fn normalize(parsed: Option<&ParsedContent>, raw_fallback: Option<&str>) -> Normalized {
    let fallback = || raw_fallback.unwrap_or_default().to_owned();
    let display = match parsed {
        Some(ParsedContent::Text { text }) | Some(ParsedContent::System { text }) => {
            text.clone().unwrap_or_else(fallback)
        }
        Some(ParsedContent::Image) => "[image]".to_owned(),
        Some(ParsedContent::Voice { duration_ms }) => voice_label(*duration_ms),
        Some(ParsedContent::Video) => "[video]".to_owned(),
        Some(ParsedContent::Emoji) => "[emoji]".to_owned(),
        Some(ParsedContent::App { title, desc, .. }) => {
            let label = title
                .as_deref()
                .or(desc.as_deref())
                .unwrap_or("link");
            format!("[link] {label}")
        }
        Some(ParsedContent::Unrecognized { .. }) | None => fallback(),
    };
    Normalized::from_display(display)
}

/// Render a voice note's duration.
///
/// Whole seconds (floored) from one second up, raw milliseconds below that,
/// and a bare label when the duration is unknown or not positive.
pub fn voice_label(duration_ms: Option<i64>) -> String {
    match duration_ms {
        Some(ms) if ms >= 1_000 => format!("[voice {}s]", ms.saturating_div(1_000)),
        Some(ms) if ms > 0 => format!("[voice {ms}ms]"),
        _ => "[voice]".to_owned(),
    }
}
