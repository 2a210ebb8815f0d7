//! Tests for the friend/group directory.

use wxbridge::backend::client::ContactEntry;
use wxbridge::backend::frames::{decode_frame, Frame};
use wxbridge::bridge::contacts::{ContactDirectory, ContactKind};

fn entry(username: &str, wxid: Option<&str>, display: Option<&str>) -> ContactEntry {
    ContactEntry {
        username: username.to_owned(),
        wxid: wxid.map(str::to_owned),
        display_name: display.map(str::to_owned),
        ..ContactEntry::default()
    }
}

fn frame(json: &str) -> Frame {
    match decode_frame(json) {
        Ok(frame) => frame,
        Err(e) => panic!("frame should decode: {e}"),
    }
}

#[test]
fn classification_uses_group_marker() {
    let directory = ContactDirectory::default();
    assert_eq!(directory.classify("123456@chatroom"), ContactKind::Group);
    assert_eq!(directory.classify("wxid_abc"), ContactKind::Friend);
    assert!(directory.is_group("x@chatroom"));
}

#[test]
fn custom_marker_is_honoured() {
    let directory = ContactDirectory::new("@room");
    assert!(directory.is_group("42@room"));
    assert!(!directory.is_group("42@chatroom"));
}

#[test]
fn snapshot_splits_friends_and_groups() {
    let mut directory = ContactDirectory::default();
    let (friends, groups) = directory.upsert_from_snapshot(&[
        entry("alice", Some("wxid_alice"), Some("Alice")),
        entry("team@chatroom", None, Some("Team")),
        entry("bob", None, None),
    ]);

    assert_eq!((friends, groups), (2, 1));
    let ids: Vec<String> = directory.friends().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["bob".to_owned(), "wxid_alice".to_owned()]);
    assert_eq!(directory.display_name("wxid_alice"), "Alice");
    assert_eq!(directory.display_name("bob"), "bob");
    assert_eq!(directory.groups()[0].display_name, "Team");
}

#[test]
fn snapshot_prefers_remark_over_username() {
    let mut directory = ContactDirectory::default();
    directory.upsert_from_snapshot(&[ContactEntry {
        username: "carol".to_owned(),
        remark_name: Some("Aunt Carol".to_owned()),
        ..ContactEntry::default()
    }]);
    let carol = directory.friend("carol");
    assert_eq!(carol.display_name, "Aunt Carol");
    assert_eq!(carol.remark_name.as_deref(), Some("Aunt Carol"));
}

#[test]
fn snapshot_name_falls_back_to_nickname_then_id() {
    let mut directory = ContactDirectory::default();
    directory.upsert_from_snapshot(&[
        ContactEntry {
            username: "wxid_nick".to_owned(),
            display_name: Some(String::new()),
            remark_name: Some(String::new()),
            nick_name: Some("Nicky".to_owned()),
            alias: Some(String::new()),
            ..ContactEntry::default()
        },
        ContactEntry {
            username: "wxid_bare".to_owned(),
            ..ContactEntry::default()
        },
    ]);
    assert_eq!(directory.display_name("wxid_nick"), "Nicky");
    assert_eq!(directory.display_name("wxid_bare"), "wxid_bare");
}

#[test]
fn snapshot_skips_entries_without_identifier() {
    let mut directory = ContactDirectory::default();
    let counts = directory.upsert_from_snapshot(&[entry("", None, Some("Ghost"))]);
    assert_eq!(counts, (0, 0));
}

#[test]
fn snapshot_replaces_previous_contents() {
    let mut directory = ContactDirectory::default();
    directory.upsert_from_snapshot(&[entry("old", None, None)]);
    directory.upsert_from_snapshot(&[entry("new", None, None)]);
    assert!(directory.get("old").is_none());
    assert!(directory.get("new").is_some());
}

#[test]
fn upsert_supplied_name_wins() {
    let mut directory = ContactDirectory::default();
    directory.upsert("wxid_d", None);
    assert_eq!(directory.display_name("wxid_d"), "wxid_d");

    directory.upsert("wxid_d", Some("Dave"));
    assert_eq!(directory.display_name("wxid_d"), "Dave");

    directory.upsert("wxid_d", None);
    assert_eq!(directory.display_name("wxid_d"), "Dave");
}

#[test]
fn db_message_records_chat_and_talker() {
    let mut directory = ContactDirectory::default();
    directory.upsert_from_frame(&frame(
        r#"{"type":"db_message","chat":"g1@chatroom","chat_display_name":"Hikers",
            "talker":"wxid_e","talker_display_name":"Eve","content":"hi","local_id":3}"#,
    ));

    assert_eq!(directory.group("g1@chatroom").display_name, "Hikers");
    assert_eq!(directory.friend("wxid_e").display_name, "Eve");
    assert_eq!(directory.groups().len(), 1);
    assert_eq!(directory.friends().len(), 1);
}

#[test]
fn listen_message_records_chat_only() {
    let mut directory = ContactDirectory::default();
    directory.upsert_from_frame(&frame(
        r#"{"type":"listen_message","from":"g2@chatroom","sender":"Frank","content":"yo"}"#,
    ));
    assert!(directory.get("g2@chatroom").is_some());
    assert!(directory.get("Frank").is_none());
}

#[test]
fn unknown_ids_fall_back_to_themselves() {
    let directory = ContactDirectory::default();
    let friend = directory.friend("wxid_z");
    assert_eq!(friend.display_name, "wxid_z");
    assert_eq!(friend.kind, ContactKind::Friend);
    let group = directory.group("9@chatroom");
    assert_eq!(group.kind, ContactKind::Group);
    assert!(directory.get("wxid_z").is_none(), "fallback must not insert");
}
