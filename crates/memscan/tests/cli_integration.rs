//! Integration tests for the memscan CLI.

use memscan_core as _;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tracing as _;
use tracing_subscriber as _;

fn binary_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.join("memscan")
}

fn create_image(dir: &std::path::Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn run(args: &[&str]) -> (bool, String, String) {
    let output = Command::new(binary_path())
        .args(args)
        .output()
        .expect("failed to run memscan");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

#[test]
fn peek_prints_typed_values() {
    let temp_dir = tempfile::tempdir().unwrap();
    let image = create_image(
        temp_dir.path(),
        "ram.bin",
        &[0x00, 0x00, 0xFE, 0xFF, 0x34, 0x12, 0x00, 0x00],
    );

    let (ok, stdout, _) = run(&[
        "peek",
        image.to_str().unwrap(),
        "2",
        "--view",
        "s16",
        "--count",
        "2",
    ]);

    assert!(ok);
    assert_eq!(stdout, "0x00000002: -2\n0x00000004: 4660\n");
}

#[test]
fn peek_out_of_range_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let image = create_image(temp_dir.path(), "ram.bin", &[0; 8]);

    let (ok, _, stderr) = run(&["peek", image.to_str().unwrap(), "7", "--view", "u16"]);

    assert!(!ok);
    assert!(stderr.contains("out of bounds"));
}

#[test]
fn poke_writes_masked_value_to_output() {
    let temp_dir = tempfile::tempdir().unwrap();
    let image = create_image(temp_dir.path(), "ram.bin", &[0; 8]);
    let output = temp_dir.path().join("patched.bin");

    let (ok, _, _) = run(&[
        "poke",
        image.to_str().unwrap(),
        "0x4",
        "0x12345",
        "--view",
        "u16",
        "-o",
        output.to_str().unwrap(),
    ]);

    assert!(ok);
    assert_eq!(fs::read(&output).unwrap(), vec![0, 0, 0, 0, 0x45, 0x23, 0, 0]);
    assert_eq!(fs::read(&image).unwrap(), vec![0; 8]);
}

#[test]
fn search_reports_explicit_byte_match() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut bytes = vec![0_u8; 16];
    bytes[5] = 0x2A;
    let image = create_image(temp_dir.path(), "ram.bin", &bytes);

    let (ok, stdout, _) = run(&["search", image.to_str().unwrap(), "42", "--kind", "int8"]);

    assert!(ok);
    assert_eq!(stdout, "0x00000005 seg=-1 int8 x1 = 42\n1 result(s)\n");
}

#[test]
fn track_narrows_across_snapshots() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut before = vec![0_u8; 16];
    before[3] = 100;
    before[9] = 100;
    let mut after = before.clone();
    after[3] = 96;
    let first = create_image(temp_dir.path(), "before.bin", &before);
    let second = create_image(temp_dir.path(), "after.bin", &after);

    let (ok, stdout, _) = run(&[
        "track",
        first.to_str().unwrap(),
        "100",
        second.to_str().unwrap(),
        "96",
        "--kind",
        "int8",
    ]);

    assert!(ok);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("2 candidate(s)"));
    assert!(lines[1].ends_with("1 candidate(s)"));
    assert_eq!(lines[2], "0x00000003 seg=-1 int8 x1 = 96");
}

#[test]
fn help_prints_usage() {
    let (ok, stdout, _) = run(&["--help"]);

    assert!(ok);
    assert!(stdout.starts_with("Usage: memscan"));
}

#[test]
fn unknown_command_fails() {
    let (ok, _, stderr) = run(&["scan"]);

    assert!(!ok);
    assert!(stderr.contains("unknown command"));
}
