//! Integration tests for the `zonetrack` CLI binary.
//!
//! These exercise argument parsing, the decoder probe, the tag directory
//! and config handling against temp files; nothing touches a real reader.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// A scratch home for one test: config and database live inside it.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn database(&self) -> PathBuf {
        self.dir.path().join("data").join("tags.db")
    }

    fn write_config(&self, body: &str) {
        std::fs::write(self.config(), body).unwrap();
    }

    /// Build a command with env isolation, pointed at this sandbox.
    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = zonetrack_cmd(self.dir.path());
        cmd.arg("--config")
            .arg(self.config())
            .arg("--database")
            .arg(self.database());
        cmd
    }
}

/// Clears all `ZONETRACK_*` env vars and points platform dirs at `home`
/// so tests never touch the user's real configuration.
fn zonetrack_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("zonetrack");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_DATA_HOME", home.join(".local/share"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("ZONETRACK_CONFIG")
        .env_remove("ZONETRACK_DATABASE")
        .env_remove("ZONETRACK_OUTPUT")
        .env_remove("ZONETRACK_COLOR");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn hex_of(text: &str) -> String {
    text.bytes()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let sandbox = Sandbox::new();
    let output = zonetrack_cmd(sandbox.dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let sandbox = Sandbox::new();
    zonetrack_cmd(sandbox.dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("monitor")
                .and(predicate::str::contains("tags"))
                .and(predicate::str::contains("history"))
                .and(predicate::str::contains("decode")),
        );
}

#[test]
fn test_version_flag() {
    let sandbox = Sandbox::new();
    zonetrack_cmd(sandbox.dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("zonetrack"));
}

#[test]
fn test_completions_zsh() {
    let sandbox = Sandbox::new();
    zonetrack_cmd(sandbox.dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_bash() {
    let sandbox = Sandbox::new();
    zonetrack_cmd(sandbox.dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Decoder probe ───────────────────────────────────────────────────

#[test]
fn test_decode_json_payload() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["decode", r#"{"tagId":"ABC123","epc":"ignored"}"#, "-o", "plain"])
        .assert()
        .success()
        .stdout("ABC123\n");
}

#[test]
fn test_decode_hex_dump_with_epc() {
    let sandbox = Sandbox::new();
    let dump = hex_of("xx E2801160600002084A7D1B23 yy");
    sandbox
        .cmd()
        .args(["decode", &dump, "-o", "json-compact"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""tag_id":"E2801160600002084A7D1B23""#))
        .stdout(predicate::str::contains(r#""kind":"hex""#));
}

#[test]
fn test_decode_raw_passthrough() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["decode", "TAG-0042", "-o", "plain"])
        .assert()
        .success()
        .stdout("TAG-0042\n");
}

#[test]
fn test_decode_hex_without_tag_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["decode", "41 42 43"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("No tag id"));
}

#[test]
fn test_decode_binary_flag_rejects_bad_hex() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["decode", "--hex", "ZZ"])
        .assert()
        .code(2);
}

// ── Zones & config ──────────────────────────────────────────────────

#[test]
fn test_zones_list_defaults_to_stock_site() {
    let sandbox = Sandbox::new();
    let output = sandbox
        .cmd()
        .args(["zones", "list", "-o", "plain"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 8);
    assert_eq!(lines[0], "1\tBathing");
    assert_eq!(lines[7], "8\tPickup Kennel");
}

#[test]
fn test_config_init_then_show() {
    let sandbox = Sandbox::new();
    sandbox.cmd().args(["config", "init"]).assert().success();
    assert!(sandbox.config().exists());

    sandbox
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Grooming Room 1"))
        .stdout(predicate::str::contains("failure_delay_ms = 5000"));

    // Existing file and no terminal: refuses without --yes
    sandbox.cmd().args(["config", "init"]).assert().code(2);
    sandbox
        .cmd()
        .args(["config", "init", "--yes"])
        .assert()
        .success();
}

#[test]
fn test_config_path_honors_flag() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_invalid_zone_table_is_a_usage_error() {
    let sandbox = Sandbox::new();
    sandbox.write_config(
        r##"
[[zones]]
name = "Front"
ordinal = 9
controller_id = "pi"
host = "127.0.0.1"
port = 5001
color = "#FFFFFF"
"##,
    );
    sandbox
        .cmd()
        .args(["zones", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("zones"));
}

// ── Tag directory ───────────────────────────────────────────────────

#[test]
fn test_tags_add_list_show_remove() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args([
            "tags", "add", "T-100", "--name", " Jane Doe ", "--dog", "Biscuit", "-o", "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""customer_name": "Jane Doe""#));

    sandbox
        .cmd()
        .args(["tags", "add", "T-100", "--name", "Someone Else"])
        .assert()
        .code(6);

    sandbox
        .cmd()
        .args(["tags", "list", "-o", "plain"])
        .assert()
        .success()
        .stdout("T-100\n");

    sandbox
        .cmd()
        .args(["tags", "show", "T-100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Biscuit"))
        .stdout(predicate::str::contains("No reads recorded."));

    sandbox.cmd().args(["tags", "remove", "T-100"]).assert().code(2);
    sandbox
        .cmd()
        .args(["tags", "remove", "T-100", "-y"])
        .assert()
        .success();

    sandbox.cmd().args(["tags", "show", "T-100"]).assert().code(4);
}

#[test]
fn test_history_empty_database() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["history", "--zone", "3", "-o", "json-compact"])
        .assert()
        .success()
        .stdout("[]\n");
}

#[test]
fn test_history_rejects_bad_dates() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["history", "--from", "last tuesday"])
        .assert()
        .code(2);
}

// ── Monitor ─────────────────────────────────────────────────────────

#[test]
fn test_monitor_exits_when_no_zone_connects() {
    let sandbox = Sandbox::new();
    // Port 1 on loopback refuses immediately.
    sandbox.write_config(
        r##"
[link]
connect_timeout_ms = 500

[[zones]]
name = "Nowhere"
ordinal = 1
controller_id = "pi"
host = "127.0.0.1"
port = 1
color = "#FFFFFF"
"##,
    );
    sandbox
        .cmd()
        .args(["monitor", "--ephemeral"])
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .code(7)
        .stderr(predicate::str::contains("No zone came online"));
}

#[test]
fn test_monitor_console_quits_on_command() {
    let sandbox = Sandbox::new();
    sandbox.write_config(
        r##"
[[zones]]
name = "Nowhere"
ordinal = 1
controller_id = "pi"
host = "127.0.0.1"
port = 1
color = "#FFFFFF"
"##,
    );
    sandbox
        .cmd()
        .args(["monitor", "--ephemeral", "--no-connect"])
        .write_stdin("status\nqueue\nquit\n")
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .success()
        .stdout(predicate::str::contains("0 customers waiting"))
        .stdout(predicate::str::contains("All Zones Offline"))
        .stdout(predicate::str::contains("queue is empty"));
}
