//! Tests for inbound payload normalization.

use wxbridge::backend::frames::ParsedContent;
use wxbridge::bridge::normalize::normalize;
use wxbridge::bridge::segment::Segment;

fn parsed(json: &str) -> ParsedContent {
    match serde_json::from_str(json) {
        Ok(p) => p,
        Err(e) => panic!("parsed payload should decode: {e}"),
    }
}

fn display(json: &str, raw: &str) -> String {
    normalize(Some(&parsed(json)), Some(raw)).display
}

#[test]
fn text_uses_parsed_text() {
    let out = normalize(Some(&parsed(r#"{"type":"text","text":"hello"}"#)), Some("raw"));
    assert_eq!(out.display, "hello");
    assert_eq!(out.segments, vec![Segment::text("hello")]);
}

#[test]
fn text_without_text_falls_back_to_raw() {
    assert_eq!(display(r#"{"type":"text"}"#, "raw body"), "raw body");
}

#[test]
fn media_kinds_render_labels() {
    assert_eq!(display(r#"{"type":"image"}"#, "<xml/>"), "[image]");
    assert_eq!(display(r#"{"type":"video"}"#, "<xml/>"), "[video]");
    assert_eq!(display(r#"{"type":"emoji"}"#, "<xml/>"), "[emoji]");
}

#[test]
fn voice_renders_duration() {
    assert_eq!(display(r#"{"type":"voice","duration_ms":4200}"#, ""), "[voice 4s]");
    assert_eq!(display(r#"{"type":"voice","duration_ms":350}"#, ""), "[voice 350ms]");
    assert_eq!(display(r#"{"type":"voice"}"#, ""), "[voice]");
}

#[test]
fn app_prefers_title_then_description() {
    assert_eq!(
        display(r#"{"type":"app","title":"News","desc":"Daily"}"#, ""),
        "[link] News"
    );
    assert_eq!(display(r#"{"type":"app","desc":"Daily"}"#, ""), "[link] Daily");
    assert_eq!(display(r#"{"type":"app"}"#, ""), "[link] link");
}

#[test]
fn system_notice_uses_text_or_raw() {
    assert_eq!(
        display(r#"{"type":"system","text":"Eve joined"}"#, "raw"),
        "Eve joined"
    );
    assert_eq!(display(r#"{"type":"system"}"#, "raw notice"), "raw notice");
}

#[test]
fn unknown_or_missing_payload_uses_raw() {
    assert_eq!(display(r#"{"type":"location"}"#, "somewhere"), "somewhere");
    assert_eq!(normalize(None, Some("plain")).display, "plain");
}

#[test]
fn empty_display_has_no_segments() {
    let out = normalize(Some(&parsed(r#"{"type":"text"}"#)), Some(""));
    assert_eq!(out.display, "");
    assert!(out.segments.is_empty());
}
