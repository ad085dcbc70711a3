//! Shared fixtures for integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use plist::{Dictionary, Uid, Value};
use serde_json::json;

/// A typed stream holding one rich-text body, as stored in `attributedBody`.
pub fn typed_stream(text: &str) -> Vec<u8> {
    assert!(text.len() < 0x80, "fixture text is too long");
    let mut bytes = vec![0x04, 0x0b];
    bytes.extend_from_slice(b"streamtyped");
    bytes.extend_from_slice(&[0x81, 0xe8, 0x03, 0x84, 0x01, b'+', text.len() as u8]);
    bytes.extend_from_slice(text.as_bytes());
    bytes
}

/// A keyed archive whose object table holds the given strings after `$null`.
pub fn keyed_archive(strings: &[&str]) -> Vec<u8> {
    let mut objects = vec![Value::String("$null".into())];
    objects.extend(strings.iter().map(|s| Value::String(s.to_string())));

    let mut top = Dictionary::new();
    top.insert("root".into(), Value::Uid(Uid::new(1)));

    let mut root = Dictionary::new();
    root.insert("$archiver".into(), Value::String("NSKeyedArchiver".into()));
    root.insert("$version".into(), Value::Integer(100000i64.into()));
    root.insert("$top".into(), Value::Dictionary(top));
    root.insert("$objects".into(), Value::Array(objects));

    let mut bytes = Vec::new();
    Value::Dictionary(root)
        .to_writer_binary(&mut bytes)
        .expect("Failed to write fixture plist");
    bytes
}

/// Builder for one exported message row.
#[derive(Clone)]
pub struct Row {
    message_id: i64,
    correlation_id: Option<String>,
    handle_id: i64,
    is_from_me: bool,
    timestamp: i64,
    text: Option<String>,
    attributed_body: Option<Vec<u8>>,
    payload_data: Option<Vec<u8>>,
}

impl Row {
    pub fn new(message_id: i64, timestamp: i64) -> Self {
        Self {
            message_id,
            correlation_id: None,
            handle_id: 7,
            is_from_me: false,
            timestamp,
            text: None,
            attributed_body: None,
            payload_data: None,
        }
    }

    pub fn group(mut self, id: &str) -> Self {
        self.correlation_id = Some(id.to_string());
        self
    }

    pub fn from_me(mut self) -> Self {
        self.is_from_me = true;
        self
    }

    pub fn handle(mut self, handle_id: i64) -> Self {
        self.handle_id = handle_id;
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn body(mut self, bytes: Vec<u8>) -> Self {
        self.attributed_body = Some(bytes);
        self
    }

    pub fn payload(mut self, tokens: &[&str]) -> Self {
        self.payload_data = Some(keyed_archive(tokens));
        self
    }

    pub fn raw_payload(mut self, bytes: Vec<u8>) -> Self {
        self.payload_data = Some(bytes);
        self
    }

    pub fn to_json(&self) -> String {
        json!({
            "message_id": self.message_id,
            "correlation_id": self.correlation_id,
            "handle_id": self.handle_id,
            "is_from_me": if self.is_from_me { 1 } else { 0 },
            "timestamp": self.timestamp,
            "text": self.text,
            "attributed_body": self.attributed_body.as_ref().map(|b| STANDARD.encode(b)),
            "payload_data": self.payload_data.as_ref().map(|b| STANDARD.encode(b)),
        })
        .to_string()
    }

    pub fn to_event(&self) -> msgsift::RawMessageEvent {
        msgsift::RawMessageEvent {
            message_id: self.message_id,
            correlation_id: self.correlation_id.clone(),
            handle_id: self.handle_id,
            is_from_me: self.is_from_me,
            timestamp: self.timestamp,
            text: self.text.clone(),
            attributed_body: self.attributed_body.clone(),
            payload_data: self.payload_data.clone(),
        }
    }
}

/// Write rows as a JSON-lines export and return its path.
pub fn write_export(dir: &Path, rows: &[Row]) -> PathBuf {
    let path = dir.join("export.jsonl");
    let content: Vec<String> = rows.iter().map(Row::to_json).collect();
    fs::write(&path, content.join("\n") + "\n").expect("Failed to write export");
    path
}

/// A three-message checkers game won by the owner, 10 to 7.
pub fn checkers_game(group: &str, start: i64) -> Vec<Row> {
    vec![
        Row::new(start, start)
            .group(group)
            .from_me()
            .text("Let's play Checkers"),
        Row::new(start + 1, start + 60)
            .group(group)
            .payload(&["GamePigeon", "Checkers", "7 points"]),
        Row::new(start + 2, start + 120)
            .group(group)
            .from_me()
            .payload(&["GamePigeon", "I won!", "10 points"]),
    ]
}

/// The binary, isolated from the user's config and log settings.
pub fn msgsift(config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("msgsift").expect("msgsift binary not built");
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env("HOME", config_home)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}
