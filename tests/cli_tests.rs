use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a shard command
fn shard_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("shard"))
}

#[test]
fn test_help() {
    shard_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("object shards"));
}

#[test]
fn test_version() {
    shard_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("shard"));
}

#[test]
fn test_create_and_info() {
    let temp_dir = TempDir::new().unwrap();
    let file_a = temp_dir.path().join("a.txt");
    let file_b = temp_dir.path().join("b.txt");
    let shard_path = temp_dir.path().join("test.shard");

    fs::write(&file_a, b"hello").unwrap();
    fs::write(&file_b, b"world").unwrap();

    shard_cmd()
        .arg("create")
        .arg(&shard_path)
        .arg(&file_a)
        .arg(&file_b)
        .assert()
        .success()
        .stdout(predicate::str::contains("Done"));

    assert!(shard_path.exists());

    shard_cmd()
        .arg("info")
        .arg(&shard_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("├─version:    1"))
        .stdout(predicate::str::contains("├─objects:    2"))
        .stdout(predicate::str::contains("└─hash"));
}

#[test]
fn test_create_deduplicates_identical_content() {
    let temp_dir = TempDir::new().unwrap();
    let file_a = temp_dir.path().join("a.txt");
    let file_b = temp_dir.path().join("b.txt");
    let shard_path = temp_dir.path().join("test.shard");

    fs::write(&file_a, b"same bytes").unwrap();
    fs::write(&file_b, b"same bytes").unwrap();

    shard_cmd()
        .arg("create")
        .arg(&shard_path)
        .arg(&file_a)
        .arg(&file_b)
        .assert()
        .success()
        .stdout(predicate::str::contains("There are 2 entries"))
        .stdout(predicate::str::contains("after deduplication: 1 entries"));

    shard_cmd()
        .arg("info")
        .arg(&shard_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("├─objects:    1"));
}

#[test]
fn test_ls_and_get() {
    let temp_dir = TempDir::new().unwrap();
    let file_a = temp_dir.path().join("a.txt");
    let shard_path = temp_dir.path().join("test.shard");

    fs::write(&file_a, b"payload").unwrap();

    shard_cmd()
        .arg("create")
        .arg(&shard_path)
        .arg(&file_a)
        .assert()
        .success();

    let digest = {
        use sha2::{Digest, Sha256};
        hex::encode(Sha256::digest(b"payload"))
    };

    shard_cmd()
        .arg("ls")
        .arg(&shard_path)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{digest}: 7 bytes")));

    shard_cmd()
        .arg("get")
        .arg(&shard_path)
        .arg(&digest)
        .assert()
        .success()
        .stdout(predicate::eq(&b"payload"[..]));
}

#[test]
fn test_get_unknown_key_fails() {
    let temp_dir = TempDir::new().unwrap();
    let file_a = temp_dir.path().join("a.txt");
    let shard_path = temp_dir.path().join("test.shard");

    fs::write(&file_a, b"payload").unwrap();
    shard_cmd()
        .arg("create")
        .arg(&shard_path)
        .arg(&file_a)
        .assert()
        .success();

    shard_cmd()
        .arg("get")
        .arg(&shard_path)
        .arg("00".repeat(32))
        .assert()
        .failure();
}

#[test]
fn test_info_on_missing_file() {
    shard_cmd()
        .arg("info")
        .arg("/nonexistent/path.shard")
        .assert()
        .failure();
}

#[test]
fn test_create_from_stdin_file_list() {
    let temp_dir = TempDir::new().unwrap();
    let file_a = temp_dir.path().join("a.txt");
    let shard_path = temp_dir.path().join("test.shard");
    fs::write(&file_a, b"stdin-driven").unwrap();

    shard_cmd()
        .arg("create")
        .arg(&shard_path)
        .arg("-")
        .write_stdin(format!("{}\n", file_a.display()))
        .assert()
        .success();

    assert!(shard_path.exists());
}
