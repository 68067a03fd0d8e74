// CLI integration tests for treelens

use std::process::Command;

#[test]
fn test_help_lists_subcommands() {
    let output = Command::new(env!("CARGO_BIN_EXE_treelens"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Help should exit with success");
    assert!(stdout.contains("treelens"), "Got: {}", stdout);
    assert!(stdout.contains("tokens"), "Got: {}", stdout);
    assert!(stdout.contains("check"), "Got: {}", stdout);
    assert!(stdout.contains("--log-level"), "Got: {}", stdout);
}

#[test]
fn test_tokens_requires_grammar_arguments() {
    let output = Command::new(env!("CARGO_BIN_EXE_treelens"))
        .args(["tokens", "main.rs"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--library"), "Got: {}", stderr);
}

#[test]
fn test_check_reports_unloadable_grammar() {
    let dir = tempfile::TempDir::new().expect("failed to create temp dir");
    let file = dir.path().join("main.rs");
    std::fs::write(&file, "fn main() {}\n").expect("failed to write source");

    let output = Command::new(env!("CARGO_BIN_EXE_treelens"))
        .current_dir(dir.path())
        .arg("check")
        .arg(&file)
        .args(["--library", "/nonexistent/libtree-sitter-rust.so", "--language", "rust"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load library"), "Got: {}", stderr);
}

#[test]
fn test_missing_source_file_is_an_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_treelens"))
        .args([
            "check",
            "/nonexistent/source.rs",
            "--library",
            "/nonexistent/lib.so",
            "--language",
            "rust",
        ])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("IO error"), "Got: {}", stderr);
}
