// domain-seeker/tests/cli_integration.rs
//
// Only offline paths: every run here fails or exits before the first RDAP query.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::{NamedTempFile, TempDir};

/// Helper to create a test domains file
fn create_test_domains_file(domains: &[&str]) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    let content = domains.join("\n");
    fs::write(file.path(), content).expect("Failed to write to temp file");
    file
}

/// A command isolated from the user's config files and DS_* variables.
fn seeker(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("domain-seeker").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("RUST_LOG");
    for var in [
        "DS_TLDS",
        "DS_DELAY",
        "DS_MAX_RETRIES",
        "DS_SOURCE",
        "DS_DOMAINS_FILE",
        "DS_GENERATOR",
        "DS_CONFIG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_flags() {
    let home = TempDir::new().unwrap();
    seeker(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--tld"))
        .stdout(predicate::str::contains("--delay"))
        .stdout(predicate::str::contains("--max-retries"))
        .stdout(predicate::str::contains("--generator-file"))
        .stdout(predicate::str::contains("--no-upload"))
        .stdout(predicate::str::contains("--notify"));
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    seeker(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_file_in_file_mode() {
    let home = TempDir::new().unwrap();
    seeker(&home)
        .args(["--source", "file", "-f", "does-not-exist.txt", "--no-output"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_unknown_tld_fails_before_querying() {
    let home = TempDir::new().unwrap();
    let file = create_test_domains_file(&["example"]);
    seeker(&home)
        .args(["-t", "zz", "--delay", "0", "--no-output", "--source", "file", "-f"])
        .arg(file.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no RDAP endpoint known for .zz"))
        .stderr(predicate::str::contains(
            "scan failed at configuration stage after 0 outcomes",
        ));
}

#[test]
fn test_invalid_delay_rejected() {
    let home = TempDir::new().unwrap();
    seeker(&home)
        .args(["--delay", "soon"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid delay 'soon'"));
}

#[test]
fn test_invalid_tld_rejected() {
    let home = TempDir::new().unwrap();
    seeker(&home)
        .args(["-t", "b@d"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_unknown_generator_rejected() {
    let home = TempDir::new().unwrap();
    seeker(&home)
        .args(["--source", "generator", "-g", "four-letter", "--no-output"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown generator 'four-letter'"));
}

#[test]
fn test_auto_mode_without_any_source() {
    let home = TempDir::new().unwrap();
    seeker(&home)
        .arg("--no-output")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no domain source available"));
}

#[test]
fn test_malformed_generator_file_fails_at_configuration() {
    let home = TempDir::new().unwrap();
    let generator = home.path().join("gen.toml");
    fs::write(&generator, "names = [42, \"alpha\"]\n").unwrap();

    seeker(&home)
        .args(["--source", "generator", "--no-output", "--generator-file"])
        .arg(&generator)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_explicit_config_file_is_validated() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("custom.toml");
    fs::write(&config, "[scan]\ndelay = -2.0\n").unwrap();

    seeker(&home)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid delay"));
}

#[test]
fn test_email_notification_needs_address() {
    let home = TempDir::new().unwrap();
    seeker(&home)
        .args(["--notify", "email"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("recipient address"));
}

#[test]
fn test_env_config_path_is_used() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("env.toml");
    fs::write(&config, "[source]\nmode = \"generator\"\ngenerator = \"nope\"\n").unwrap();

    seeker(&home)
        .env("DS_CONFIG", &config)
        .arg("--no-output")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown generator 'nope'"));
}

#[test]
fn test_output_conflicts_with_no_output() {
    let home = TempDir::new().unwrap();
    seeker(&home)
        .args(["-o", "found.txt", "--no-output"])
        .assert()
        .failure();
}
