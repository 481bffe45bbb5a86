//! Spawns the compiled binary and drives it over stdin/stdout pipes,
//! exercising the literal transcripts a user would see at a terminal.
//!
//! Grounded on `original_source/test/test.c`'s fork/exec/pipe harness:
//! feed a whole script on stdin, collect all of stdout, assert on it.

use std::io::Write;
use std::process::{Command, Stdio};

fn run_transcript(db_path: &std::path::Path, script: &str) -> String {
    let mut child = Command::new(env!("CARGO_BIN_EXE_simpledb"))
        .arg(db_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn simpledb");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(script.as_bytes())
        .unwrap();

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "process exited non-zero: {:?}", output.status);
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn exit_only() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let out = run_transcript(tmp.path(), ".exit\n");
    assert_eq!(out, "simpledb > ");
}

#[test]
fn unknown_meta_command() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let out = run_transcript(tmp.path(), ".foo\n.exit\n");
    assert_eq!(out, "simpledb > Unrecognized command '.foo'\nsimpledb > ");
}

#[test]
fn insert_then_select() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let out = run_transcript(
        tmp.path(),
        "insert 1 user1 person1@example.com\nselect\n.exit\n",
    );
    assert_eq!(
        out,
        "simpledb > Executed.\nsimpledb > (1, user1, person1@example.com)\nExecuted.\nsimpledb > "
    );
}

#[test]
fn long_field_rejection() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let long_email = format!("{}@example.com", "a".repeat(281));
    let out = run_transcript(
        tmp.path(),
        &format!("insert 1 user1 {long_email}\n.exit\n"),
    );
    assert!(out.contains("String is too long.\n"));
}

#[test]
fn persistence_across_restarts() {
    let tmp = tempfile::NamedTempFile::new().unwrap();

    let out1 = run_transcript(tmp.path(), "insert 1 user1 person1@example.com\n.exit\n");
    assert_eq!(out1, "simpledb > Executed.\nsimpledb > ");

    let out2 = run_transcript(tmp.path(), "select\n.exit\n");
    assert!(out2.contains("(1, user1, person1@example.com)"));
}

#[test]
fn split_and_root_promotion_tree_dump() {
    let tmp = tempfile::NamedTempFile::new().unwrap();

    let mut script = String::new();
    for id in (1..=14).rev() {
        script.push_str(&format!("insert {id} user{id} person{id}@example.com\n"));
    }
    script.push_str(".btree\n.exit\n");

    let out = run_transcript(tmp.path(), &script);

    // The root's own header line sits one space deeper than its children's.
    let mut expected = String::new();
    for _ in 1..=14 {
        expected.push_str("simpledb > Executed.\n");
    }
    expected.push_str("simpledb > Tree:\n");
    expected.push_str(" - internal (size 1)\n");
    expected.push_str(" - leaf (size 7)\n");
    for id in 1..=7 {
        expected.push_str(&format!("  - {id}\n"));
    }
    expected.push_str(" - key 7\n");
    expected.push_str(" - leaf (size 7)\n");
    for id in 8..=14 {
        expected.push_str(&format!("  - {id}\n"));
    }
    expected.push_str("simpledb > ");

    assert_eq!(out, expected);
}

#[test]
fn duplicate_key_is_reported() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let out = run_transcript(
        tmp.path(),
        "insert 1 user1 person1@example.com\ninsert 1 user1 person1@example.com\n.exit\n",
    );
    assert!(out.contains("Error: Duplicate key.\n"));
}

#[test]
fn invalid_statement_keyword() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let out = run_transcript(tmp.path(), "delete 1\n.exit\n");
    assert!(out.contains("Unrecognized keyword at start of 'delete 1'.\n"));
}

#[test]
fn missing_required_field_is_syntax_error() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let out = run_transcript(tmp.path(), "insert 1 user1\n.exit\n");
    assert!(out.contains("Syntax error. Could not parse statement.\n"));
}
