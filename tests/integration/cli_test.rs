//! Integration tests for the msgsift binary.

use std::fs;

use predicates::prelude::*;
use tempfile::TempDir;

use crate::helpers::{checkers_game, keyed_archive, msgsift, typed_stream, write_export, Row};

// ============================================================================
// Help and usage
// ============================================================================

#[test]
fn help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    msgsift(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sessions"))
        .stdout(predicate::str::contains("bodies"))
        .stdout(predicate::str::contains("decode"));
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    msgsift(home.path()).assert().code(2);
}

#[test]
fn sessions_without_input_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    msgsift(home.path())
        .arg("sessions")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("<INPUT>"));
}

#[test]
fn version_names_the_package() {
    let home = TempDir::new().unwrap();
    msgsift(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("msgsift 0.1.0"));
}

// ============================================================================
// sessions
// ============================================================================

#[test]
fn sessions_prints_records_as_json_lines() {
    let home = TempDir::new().unwrap();
    let export = write_export(home.path(), &checkers_game("g1", 1000));

    let output = msgsift(home.path())
        .arg("sessions")
        .arg(&export)
        .args(["--app-id", "Checkers"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    insta::assert_snapshot!(stdout, @r#"{"correlation_id":"g1","start_timestamp":1000,"end_timestamp":1120,"application_id":"Checkers","outcome":1,"opponent_handle_id":7,"own_score":10,"opponent_score":7}"#);
}

#[test]
fn sessions_reads_registry_file() {
    let home = TempDir::new().unwrap();
    let export = write_export(home.path(), &checkers_game("g1", 1000));
    let registry = home.path().join("apps.txt");
    fs::write(&registry, "# known games\nCheckers\n8 Ball\n").unwrap();

    msgsift(home.path())
        .arg("sessions")
        .arg(&export)
        .arg("--registry")
        .arg(&registry)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"application_id\":\"Checkers\""));
}

#[test]
fn sessions_uses_configured_registry() {
    let home = TempDir::new().unwrap();
    let export = write_export(home.path(), &checkers_game("g1", 1000));
    let config_dir = home.path().join("msgsift");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        "[registry]\napp_ids = [\"Checkers\"]\n",
    )
    .unwrap();

    msgsift(home.path())
        .arg("sessions")
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"correlation_id\":\"g1\""));
}

#[test]
fn sessions_without_registry_fails() {
    let home = TempDir::new().unwrap();
    let export = write_export(home.path(), &checkers_game("g1", 1000));

    msgsift(home.path())
        .arg("sessions")
        .arg(&export)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load application registry"));
}

#[test]
fn sessions_table_format() {
    let home = TempDir::new().unwrap();
    let export = write_export(home.path(), &checkers_game("g1", 1000));

    msgsift(home.path())
        .arg("sessions")
        .arg(&export)
        .args(["--app-id", "Checkers"])
        .args(["--format", "table", "--sequential"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OUTCOME"))
        .stdout(predicate::str::contains("1970-01-01 00:16"))
        .stdout(predicate::str::contains("won"));
}

#[test]
fn sessions_store_is_idempotent() {
    let home = TempDir::new().unwrap();
    let mut rows = checkers_game("a", 1000);
    rows.extend(checkers_game("b", 2000));
    let export = write_export(home.path(), &rows);
    let store = home.path().join("db/sessions.jsonl");

    for expected in ["Stored 2 new session(s)", "Stored 0 new session(s)"] {
        msgsift(home.path())
            .arg("sessions")
            .arg(&export)
            .args(["--app-id", "Checkers"])
            .arg("--store")
            .arg(&store)
            .assert()
            .success()
            .stderr(predicate::str::contains(expected));
    }

    let stored = fs::read_to_string(&store).unwrap();
    assert_eq!(stored.lines().count(), 2);
}

#[test]
fn sessions_abort_reports_failing_group() {
    let home = TempDir::new().unwrap();
    let mut rows = checkers_game("good", 1000);
    rows.push(Row::new(90, 90).group("bad").text("Let's play Chess"));
    let export = write_export(home.path(), &rows);

    msgsift(home.path())
        .arg("sessions")
        .arg(&export)
        .args(["--app-id", "Checkers"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Session bad"));
}

#[test]
fn sessions_skip_keeps_good_groups() {
    let home = TempDir::new().unwrap();
    let mut rows = checkers_game("good", 1000);
    rows.push(Row::new(90, 90).group("bad").text("Let's play Chess"));
    let export = write_export(home.path(), &rows);

    msgsift(home.path())
        .arg("sessions")
        .arg(&export)
        .args(["--app-id", "Checkers"])
        .args(["--policy", "skip"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"correlation_id\":\"good\""))
        .stderr(predicate::str::contains("Skipped 1 session(s)"));
}

#[test]
fn sessions_reports_bad_export_line() {
    let home = TempDir::new().unwrap();
    let export = home.path().join("export.jsonl");
    let first = checkers_game("g", 1)[0].to_json();
    fs::write(&export, format!("{first}\n{{oops\n")).unwrap();

    msgsift(home.path())
        .arg("sessions")
        .arg(&export)
        .args(["--app-id", "Checkers"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("line 2"));
}

// ============================================================================
// bodies and decode
// ============================================================================

#[test]
fn bodies_prints_decoded_text() {
    let home = TempDir::new().unwrap();
    let rows = vec![
        Row::new(1, 1).body(typed_stream("formatted hello")),
        Row::new(2, 2).text("plain only"),
    ];
    let export = write_export(home.path(), &rows);

    let output = msgsift(home.path())
        .arg("bodies")
        .arg(&export)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    insta::assert_snapshot!(stdout, @r#"{"message_id":1,"text":"formatted hello"}"#);
}

#[test]
fn bodies_abort_on_malformed_body() {
    let home = TempDir::new().unwrap();
    let rows = [Row::new(4, 1).body(vec![0x00, 0x01, 0x02])];
    let export = write_export(home.path(), &rows);

    msgsift(home.path())
        .arg("bodies")
        .arg(&export)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Message 4"));
}

#[test]
fn decode_detects_archive_kind() {
    let home = TempDir::new().unwrap();
    let body = home.path().join("body.bin");
    let payload = home.path().join("payload.bin");
    fs::write(&body, typed_stream("hello")).unwrap();
    fs::write(
        &payload,
        keyed_archive(&["GamePigeon", "appid", "Checkers", "You won!"]),
    )
    .unwrap();

    msgsift(home.path())
        .arg("decode")
        .arg(&body)
        .assert()
        .success()
        .stdout("hello\n");

    msgsift(home.path())
        .arg("decode")
        .arg(&payload)
        .assert()
        .success()
        .stdout("Checkers\nYou won!\n");
}

#[test]
fn decode_with_wrong_kind_fails() {
    let home = TempDir::new().unwrap();
    let body = home.path().join("body.bin");
    fs::write(&body, typed_stream("hello")).unwrap();

    msgsift(home.path())
        .arg("decode")
        .arg(&body)
        .args(["--kind", "keyed"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to decode keyed archive"));
}

// ============================================================================
// config and completions
// ============================================================================

#[test]
fn config_show_prints_defaults() {
    let home = TempDir::new().unwrap();
    msgsift(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[reconstruct]"))
        .stdout(predicate::str::contains("failure_policy = \"abort\""))
        .stdout(predicate::str::contains("batch_size = 10000"));
}

#[test]
fn config_migrate_creates_then_reports_up_to_date() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("msgsift/config.toml");

    msgsift(home.path())
        .args(["config", "migrate", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Will create with default settings"));
    assert!(config_path.exists());

    msgsift(home.path())
        .args(["config", "migrate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already up to date"));
}

#[test]
fn config_migrate_adds_missing_fields_only() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("msgsift/config.toml");
    fs::create_dir_all(config_path.parent().unwrap()).unwrap();
    fs::write(&config_path, "[reconstruct]\nparallel = false\n").unwrap();

    msgsift(home.path())
        .args(["config", "migrate", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("missing field(s)"));

    let migrated = fs::read_to_string(&config_path).unwrap();
    assert!(migrated.contains("parallel = false"));
    assert!(migrated.contains("invite_prefix"));
    assert!(migrated.contains("[store]"));
}

#[test]
fn completions_for_bash() {
    let home = TempDir::new().unwrap();
    msgsift(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("msgsift"));
}
