use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn tarot(dir: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_tarot"));
    for (key, _) in std::env::vars().filter(|(key, _)| key.starts_with("TAROT_")) {
        command.env_remove(key);
    }

    command
        .current_dir(dir)
        .args(["--history", "history.json", "--token-cache", "token.json", "--client-id", "client"])
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn logout_ignores_a_malformed_history() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("history.json"), "{ not json").unwrap();
    fs::write(dir.path().join("token.json"), "{}").unwrap();

    let output = tarot(dir.path(), &["logout"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(!dir.path().join("token.json").exists());
    assert_eq!(fs::read_to_string(dir.path().join("history.json")).unwrap(), "{ not json");
}

#[test]
fn history_reports_a_malformed_history() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("history.json"), "{ not json").unwrap();

    let output = tarot(dir.path(), &["history"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Malformed history file"));
}

#[test]
fn zero_tick_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let output = tarot(dir.path(), &["run", "--tick", "0"]);

    assert!(!output.status.success());
    assert!(!dir.path().join("history.json").exists());
}
