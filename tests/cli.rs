// End-to-end tests for the `orph` binary's verb surface.
use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

mod common;
use common::{dir_with_jpeg, jpeg_bytes};

#[test]
fn test_hash_command_prints_digest_and_writes_store() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let photo = dir_with_jpeg(&temp_dir, "img.jpg");

    let mut cmd = Command::cargo_bin("orph").unwrap();
    cmd.arg("hash")
        .arg(photo.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("md5=").and(predicate::str::contains("full_md5=")));

    assert!(temp_dir.child(".orphdat").path().exists());
}

#[test]
fn test_hash_command_over_directory_is_recursive() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    dir_with_jpeg(&temp_dir, "a.jpg");
    let sub = temp_dir.child("sub");
    sub.create_dir_all().unwrap();
    dir_with_jpeg(&temp_dir, "sub/b.jpg");

    let mut cmd = Command::cargo_bin("orph").unwrap();
    cmd.arg("hash")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("a.jpg"))
        .stdout(predicate::str::contains("b.jpg"));
}

#[test]
fn test_verify_reports_ok_for_unchanged_file() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let photo = dir_with_jpeg(&temp_dir, "img.jpg");

    Command::cargo_bin("orph").unwrap().arg("hash").arg(photo.path()).assert().success();

    let mut cmd = Command::cargo_bin("orph").unwrap();
    cmd.arg("verify").arg(photo.path()).assert().success().stdout(predicate::str::contains("OK"));
}

#[test]
fn test_verify_metadata_only_edit_keeps_content_hash_stable() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let photo = temp_dir.child("img.jpg");
    std::fs::write(photo.path(), jpeg_bytes(b"exif one", b"same scan body")).unwrap();

    let first = Command::cargo_bin("orph")
        .unwrap()
        .arg("hash")
        .arg(photo.path())
        .output()
        .unwrap();
    let first_stdout = String::from_utf8(first.stdout).unwrap();

    std::thread::sleep(std::time::Duration::from_millis(1100));
    std::fs::write(photo.path(), jpeg_bytes(b"exif two, much longer now", b"same scan body")).unwrap();

    let second = Command::cargo_bin("orph")
        .unwrap()
        .arg("hash")
        .arg("--force")
        .arg(photo.path())
        .output()
        .unwrap();
    let second_stdout = String::from_utf8(second.stdout).unwrap();

    let md5_of = |line: &str| line.split("md5=").nth(1).unwrap().split_whitespace().next().unwrap().to_string();
    assert_eq!(md5_of(&first_stdout), md5_of(&second_stdout));
}

#[test]
fn test_move_command() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let photo = dir_with_jpeg(&temp_dir, "img.jpg");
    Command::cargo_bin("orph").unwrap().arg("hash").arg(photo.path()).assert().success();

    let dest_dir = temp_dir.child("dest");
    dest_dir.create_dir_all().unwrap();
    let dest = dest_dir.child("img.jpg");

    Command::cargo_bin("orph")
        .unwrap()
        .arg("move")
        .arg(photo.path())
        .arg(dest.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("moved"));

    assert!(!photo.path().exists());
    assert!(dest.path().exists());
    assert!(dest_dir.child(".orphdat").path().exists());
    assert!(!temp_dir.child(".orphdat").path().exists());
}

#[test]
fn test_trash_command_moves_under_orphtrash() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let photo = dir_with_jpeg(&temp_dir, "img.jpg");
    Command::cargo_bin("orph").unwrap().arg("hash").arg(photo.path()).assert().success();

    Command::cargo_bin("orph")
        .unwrap()
        .arg("trash")
        .arg(photo.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("trashed"));

    assert!(!photo.path().exists());
    assert!(temp_dir.child(".orphtrash/img.jpg").path().exists());
}

#[test]
fn test_find_hashes_command_lists_stored_records() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let photo = dir_with_jpeg(&temp_dir, "img.jpg");
    Command::cargo_bin("orph").unwrap().arg("hash").arg(photo.path()).assert().success();

    Command::cargo_bin("orph")
        .unwrap()
        .arg("find-hashes")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("img.jpg"))
        .stdout(predicate::str::contains("md5="));
}
