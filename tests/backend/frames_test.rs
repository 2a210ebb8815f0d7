//! Tests for stream frame decoding.

use wxbridge::backend::frames::{decode_frame, Frame, FrameError, ParsedContent};

fn decode(json: &str) -> Frame {
    match decode_frame(json) {
        Ok(frame) => frame,
        Err(e) => panic!("frame should decode: {e}"),
    }
}

#[test]
fn db_message_fields() {
    let Frame::DbMessage(msg) = decode(
        r#"{"type":"db_message","chat":"g@chatroom","talker":"wxid_a",
            "talker_display_name":"Ann","content":"hi",
            "parsed":{"type":"text","text":"hi"},
            "create_time":1700000000,"local_id":5,"msg_type":1,"is_sender":true}"#,
    ) else {
        panic!("expected db_message");
    };
    assert_eq!(msg.chat, "g@chatroom");
    assert_eq!(msg.talker_display_name.as_deref(), Some("Ann"));
    assert_eq!(msg.local_id, 5);
    assert_eq!(msg.msg_type, Some(1));
    assert!(msg.is_self, "is_sender is accepted as the self flag");
    assert_eq!(
        msg.parsed,
        Some(ParsedContent::Text {
            text: Some("hi".to_owned())
        })
    );
}

#[test]
fn voice_duration_accepts_string_field() {
    let Frame::DbMessage(msg) = decode(
        r#"{"type":"db_message","chat":"a","parsed":{"type":"voice","duration":"2500"}}"#,
    ) else {
        panic!("expected db_message");
    };
    assert_eq!(
        msg.parsed,
        Some(ParsedContent::Voice {
            duration_ms: Some(2500)
        })
    );
}

#[test]
fn listen_message_fields() {
    let Frame::ListenMessage(msg) = decode(
        r#"{"type":"listen_message","from":"wxid_b","msg_type":"text","sender":"Bo","content":"yo"}"#,
    ) else {
        panic!("expected listen_message");
    };
    assert_eq!(msg.from, "wxid_b");
    assert_eq!(msg.sender.as_deref(), Some("Bo"));
    assert_eq!(msg.content, "yo");
}

#[test]
fn sent_ack_fields() {
    let Frame::Sent(ack) = decode(r#"{"type":"sent","to":"wxid_c","text":"ok","verified":true}"#)
    else {
        panic!("expected sent");
    };
    assert_eq!(ack.to, "wxid_c");
    assert!(ack.verified);
}

#[test]
fn missing_type_is_unknown() {
    assert!(matches!(
        decode_frame(r#"{"chat":"a"}"#),
        Err(FrameError::UnknownType(None))
    ));
}

#[test]
fn non_object_json_is_rejected() {
    assert!(decode_frame("[1,2,3]").is_err());
    assert!(matches!(decode_frame("{"), Err(FrameError::Malformed(_))));
}

#[test]
fn odd_parsed_shapes_fall_back_to_raw_content() {
    let Frame::DbMessage(msg) = decode(
        r#"{"type":"db_message","chat":"wxid_a","content":"hello","parsed":"text"}"#,
    ) else {
        panic!("expected db_message");
    };
    let out = wxbridge::bridge::normalize::normalize(msg.parsed.as_ref(), Some(&msg.content));
    assert_eq!(out.display, "hello");

    let Frame::DbMessage(msg) =
        decode(r#"{"type":"db_message","chat":"wxid_a","content":"hi","parsed":{"type":7}}"#)
    else {
        panic!("expected db_message");
    };
    assert_eq!(msg.parsed, Some(ParsedContent::Unrecognized { kind: None }));
}

#[test]
fn null_content_decodes_as_empty() {
    let Frame::DbMessage(msg) = decode(
        r#"{"type":"db_message","chat":"wxid_a","content":null,"parsed":{"type":"image"}}"#,
    ) else {
        panic!("expected db_message");
    };
    assert_eq!(msg.content, "");
    assert_eq!(msg.parsed, Some(ParsedContent::Image));

    let Frame::ListenMessage(msg) =
        decode(r#"{"type":"listen_message","from":"wxid_b","content":null}"#)
    else {
        panic!("expected listen_message");
    };
    assert_eq!(msg.content, "");
}
