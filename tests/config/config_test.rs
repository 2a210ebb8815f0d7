//! Coverage for config parsing, env overrides, and endpoint derivation.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use wxbridge::config::{BackendConfig, BridgeConfig, SessionConfig, DEFAULT_LOGGED_IN_STATUS};
use wxbridge::credentials::enforce_private_file_permissions;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

fn parse(toml_str: &str) -> BridgeConfig {
    match BridgeConfig::from_toml(toml_str) {
        Ok(config) => config,
        Err(err) => panic!("config should parse: {err}"),
    }
}

#[test]
fn default_session_values() {
    let session = SessionConfig::default();
    assert_eq!(session.session_id, "wechat");
    assert_eq!(session.reconnect_interval(), Duration::from_secs(5));
    assert_eq!(session.login_poll_interval(), Duration::from_secs(10));
    assert_eq!(session.group_marker, "@chatroom");
    assert_eq!(session.max_forward_depth, 8);
}

#[test]
fn default_backend_values() {
    let backend = BackendConfig::default();
    assert_eq!(backend.base_url, "http://127.0.0.1:8899");
    assert_eq!(backend.logged_in_status, DEFAULT_LOGGED_IN_STATUS);
    assert_eq!(backend.request_timeout(), Duration::from_secs(30));
}

#[test]
fn parse_minimal_config() {
    let config = parse(
        r#"
[backend]
base_url = "http://10.0.0.5:8899"

[bridge]
session_id = "wx-main"
"#,
    );
    assert_eq!(config.backend.base_url, "http://10.0.0.5:8899");
    assert_eq!(config.bridge.session_id, "wx-main");
    assert_eq!(config.bridge.reconnect_interval_ms, 5_000);
}

#[test]
fn parse_full_config() {
    let config = parse(
        r#"
[backend]
base_url = "https://wx.internal"
ws_url = "wss://wx.internal/stream"
token = "inline"
logged_in_status = "logged_in"
request_timeout_secs = 10

[bridge]
reconnect_interval_ms = 250
login_poll_interval_ms = 500
group_marker = "@room"
max_forward_depth = 3

[logging]
logs_dir = "/var/log/wxbridge"
"#,
    );
    assert_eq!(config.backend.ws_url.as_deref(), Some("wss://wx.internal/stream"));
    assert_eq!(config.backend.logged_in_status, "logged_in");
    assert_eq!(config.bridge.reconnect_interval(), Duration::from_millis(250));
    assert_eq!(config.bridge.group_marker, "@room");
    assert_eq!(config.bridge.max_forward_depth, 3);
    assert_eq!(config.logging.logs_dir, PathBuf::from("/var/log/wxbridge"));
}

#[test]
fn malformed_toml_is_an_error() {
    assert!(BridgeConfig::from_toml("[backend\nbase_url = 1").is_err());
}

#[test]
fn env_overrides_file_values() {
    let mut config = parse("[backend]\nbase_url = \"http://file:1\"\n");
    config.apply_overrides(env_from(&[
        ("WXBRIDGE_BASE_URL", "http://env:2"),
        ("WXBRIDGE_TOKEN", "env-token"),
        ("WXBRIDGE_SESSION_ID", "env-session"),
        ("WXBRIDGE_RECONNECT_MS", "1500"),
        ("WXBRIDGE_LOGIN_POLL_MS", "not-a-number"),
    ]));

    assert_eq!(config.backend.base_url, "http://env:2");
    assert_eq!(config.backend.token.as_deref(), Some("env-token"));
    assert_eq!(config.bridge.session_id, "env-session");
    assert_eq!(config.bridge.reconnect_interval_ms, 1_500);
    assert_eq!(config.bridge.login_poll_interval_ms, 10_000);
}

#[test]
fn config_path_honours_env() {
    let custom = BridgeConfig::config_path_with(env_from(&[(
        "WXBRIDGE_CONFIG_PATH",
        "/etc/wxbridge.toml",
    )]));
    assert_eq!(custom, PathBuf::from("/etc/wxbridge.toml"));

    let default = BridgeConfig::config_path_with(env_from(&[]));
    assert_eq!(default, PathBuf::from("wxbridge.toml"));
}

#[test]
fn stream_url_is_derived_from_base_url() {
    let mut backend = BackendConfig::default();
    assert_eq!(backend.stream_url(None), "ws://127.0.0.1:8899/ws");
    assert_eq!(
        backend.stream_url(Some("abc")),
        "ws://127.0.0.1:8899/ws?token=abc"
    );

    backend.base_url = "https://wx.example/".to_owned();
    assert_eq!(backend.stream_url(Some("")), "wss://wx.example/ws");
}

#[test]
fn explicit_stream_url_is_used_verbatim() {
    let backend = BackendConfig {
        ws_url: Some("ws://stream:9/ws?v=2".to_owned()),
        ..BackendConfig::default()
    };
    assert_eq!(backend.stream_url(Some("t")), "ws://stream:9/ws?v=2&token=t");
}

#[test]
fn stream_url_encodes_reserved_token_characters() {
    let backend = BackendConfig {
        base_url: "https://127.0.0.1:9".to_owned(),
        ..BackendConfig::default()
    };
    let url = backend.stream_url(Some("a&b=c#d+e"));
    assert_eq!(url, "wss://127.0.0.1:9/ws?token=a%26b%3Dc%23d%2Be");

    let parsed = url::Url::parse(&url).expect("stream url parses");
    let tokens: Vec<String> = parsed
        .query_pairs()
        .filter(|(k, _)| k == "token")
        .map(|(_, v)| v.into_owned())
        .collect();
    assert_eq!(tokens, vec!["a&b=c#d+e".to_owned()]);
}

#[test]
fn inline_token_wins_over_credentials_file() {
    let backend = BackendConfig {
        token: Some("inline".to_owned()),
        credentials_file: Some(PathBuf::from("/does/not/exist")),
        ..BackendConfig::default()
    };
    match backend.resolve_token() {
        Ok(token) => assert_eq!(token.as_deref(), Some("inline")),
        Err(err) => panic!("inline token should resolve: {err}"),
    }
}

#[test]
fn token_is_read_from_credentials_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(".env");
    fs::write(&path, "BRIDGE_SECRET=from-file\n").expect("write credentials");
    enforce_private_file_permissions(&path).expect("chmod credentials");

    let backend = BackendConfig {
        token_env: "BRIDGE_SECRET".to_owned(),
        credentials_file: Some(path),
        ..BackendConfig::default()
    };
    match backend.resolve_token() {
        Ok(token) => assert_eq!(token.as_deref(), Some("from-file")),
        Err(err) => panic!("token should resolve: {err}"),
    }
}

#[test]
fn no_token_source_resolves_to_none() {
    match BackendConfig::default().resolve_token() {
        Ok(token) => assert!(token.is_none()),
        Err(err) => panic!("absent token should not error: {err}"),
    }
}

#[test]
fn debug_output_redacts_token() {
    let backend = BackendConfig {
        token: Some("hunter2".to_owned()),
        ..BackendConfig::default()
    };
    let debug = format!("{backend:?}");
    assert!(!debug.contains("hunter2"));
    assert!(debug.contains("REDACTED"));
}
