//! Integration tests for the `amsprobe` binary.
//!
//! Argument parsing, settings rendering, completions and startup failures
//! need no AMS router. The shutdown test runs against an in-process one.
#![allow(clippy::unwrap_used)]

use std::io::{BufRead, BufReader, Read, Write};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

const ISOLATED_HOME: &str = "/tmp/amsprobe-cli-test-nonexistent";

const CLEARED_VARS: [&str; 7] = [
    "HOST_AMS_NETID",
    "AMSPROBE_CONFIG",
    "AMSPROBE_ROUTER__NETID",
    "AMSPROBE_ROUTER__LOOPBACKIP",
    "AMSPROBE_ROUTER__LOOPBACKPORT",
    "AMSPROBE_SESSION__TIMEOUT",
    "RUST_LOG",
];

/// Build a [`Command`] for the `amsprobe` binary with env isolation.
fn amsprobe_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("amsprobe");
    cmd.env("HOME", ISOLATED_HOME)
        .env("XDG_CONFIG_HOME", ISOLATED_HOME);
    for var in CLEARED_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// Same isolation as [`amsprobe_cmd`], for runs that need a live child.
#[cfg(unix)]
fn amsprobe_process() -> std::process::Command {
    let mut cmd = std::process::Command::new(env!("CARGO_BIN_EXE_amsprobe"));
    cmd.env("HOME", ISOLATED_HOME)
        .env("XDG_CONFIG_HOME", ISOLATED_HOME);
    for var in CLEARED_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn settings_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

const ROUTER_TOML: &str = r#"
[router]
name = "AdsClient"
netId = "172.17.0.2.1.1"
loopbackIP = "172.17.0.1"
loopbackPort = 48898

[[router.mqtt]]
address = "broker.local"
port = 1883
topic = "VirtualAmsNetwork1"
"#;

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    amsprobe_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("HOST_AMS_NETID")
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("settings")),
    );
}

#[test]
fn test_version_flag() {
    amsprobe_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("amsprobe"));
}

#[test]
fn test_completions_bash() {
    amsprobe_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_unknown_log_format_is_usage_error() {
    amsprobe_cmd()
        .args(["--log-format", "xml", "watch"])
        .assert()
        .code(2);
}

// ── Startup failures ────────────────────────────────────────────────

#[test]
fn test_watch_without_net_id_fails_fast() {
    amsprobe_cmd()
        .arg("watch")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("HOST_AMS_NETID"));
}

#[test]
fn test_missing_net_id_is_logged_at_error_level() {
    amsprobe_cmd()
        .arg("watch")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("ERROR").and(predicate::str::contains(
            "HOST_AMS_NETID environment variable is not set!",
        )));
}

#[test]
fn test_rejected_settings_are_logged_at_error_level() {
    let file = settings_file("[router]\nnetId = \"bad\"\n");
    amsprobe_cmd()
        .env("HOST_AMS_NETID", "5.1.204.160.1.1")
        .arg("--config")
        .arg(file.path())
        .arg("watch")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(
            predicate::str::contains("ERROR")
                .and(predicate::str::contains("router settings rejected")),
        );
}

#[test]
fn test_unreadable_settings_file_is_logged_at_error_level() {
    let file = settings_file("[router\nnetId = ");
    amsprobe_cmd()
        .arg("--config")
        .arg(file.path())
        .arg("settings")
        .assert()
        .code(2)
        .stderr(
            predicate::str::contains("ERROR")
                .and(predicate::str::contains("failed to load router settings")),
        );
}

#[test]
fn test_default_command_is_watch() {
    amsprobe_cmd()
        .env("HOST_AMS_NETID", "")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("HOST_AMS_NETID"));
}

#[test]
fn test_malformed_net_id_fails_fast() {
    amsprobe_cmd()
        .env("HOST_AMS_NETID", "5.1.204.160")
        .arg("watch")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_unreachable_router_is_connection_error() {
    // Grab a free port, then release it so nothing listens there.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    amsprobe_cmd()
        .env("HOST_AMS_NETID", "5.1.204.160.1.1")
        .env("AMSPROBE_ROUTER__LOOPBACKPORT", port.to_string())
        .arg("watch")
        .assert()
        .code(7)
        .stdout(predicate::str::is_empty());
}

// ── Settings ────────────────────────────────────────────────────────

#[test]
fn test_settings_renders_file_as_toml() {
    let file = settings_file(ROUTER_TOML);
    amsprobe_cmd()
        .arg("--config")
        .arg(file.path())
        .arg("settings")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("netId = \"172.17.0.2.1.1\"")
                .and(predicate::str::contains("topic = \"VirtualAmsNetwork1\""))
                .and(predicate::str::contains("timeout = 5")),
        );
}

#[test]
fn test_settings_env_overrides_file() {
    let file = settings_file(ROUTER_TOML);
    let output = amsprobe_cmd()
        .arg("--config")
        .arg(file.path())
        .env("AMSPROBE_ROUTER__NETID", "10.0.0.5.1.1")
        .args(["settings", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["router"]["netId"], "10.0.0.5.1.1");
    assert_eq!(json["router"]["loopbackPort"], 48898);
    assert_eq!(json["router"]["mqtt"][0]["address"], "broker.local");
}

#[test]
fn test_settings_rejects_malformed_router_net_id() {
    let file = settings_file("[router]\nnetId = \"not-a-net-id\"\n");
    amsprobe_cmd()
        .arg("--config")
        .arg(file.path())
        .arg("settings")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("router.netId"));
}

#[test]
fn test_settings_without_file_prints_defaults() {
    amsprobe_cmd()
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("[session]"));
}

// ── Shutdown ────────────────────────────────────────────────────────

/// Encode a ReadState response answering `request` with state Run.
#[cfg(unix)]
fn respond_run(request: &[u8; 38]) -> Vec<u8> {
    // request = 6-byte prefix + 32-byte AMS header, no payload
    let mut out = Vec::with_capacity(46);
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&request[14..22]);
    out.extend_from_slice(&request[6..14]);
    out.extend_from_slice(&4u16.to_le_bytes()); // ReadState
    out.extend_from_slice(&5u16.to_le_bytes()); // ADS command | response
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&request[34..38]); // invoke id
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&5u16.to_le_bytes()); // Run
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

#[cfg(unix)]
#[test]
fn test_sigterm_stops_polling_and_exits_cleanly() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let router = std::thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        let mut request = [0u8; 38];
        let mut served = 0usize;
        while socket.read_exact(&mut request).is_ok() {
            if socket.write_all(&respond_run(&request)).is_err() {
                break;
            }
            served += 1;
        }
        served
    });

    let mut child = amsprobe_process()
        .env("HOST_AMS_NETID", "5.1.204.160.1.1")
        .env("AMSPROBE_ROUTER__LOOPBACKPORT", port.to_string())
        .arg("watch")
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .unwrap();

    // Two lines means the first poll interval has passed and the signal
    // handlers are installed.
    let mut stdout = BufReader::new(child.stdout.take().unwrap());
    for _ in 0..2 {
        let mut line = String::new();
        stdout.read_line(&mut line).unwrap();
        assert_eq!(
            line.trim_end(),
            "[AdsClient] State of host TwinCAT '5.1.204.160.1.1:851' is: Run"
        );
    }

    let kill = std::process::Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(kill.success());

    let mut rest = String::new();
    stdout.read_to_string(&mut rest).unwrap();
    let output = child.wait_with_output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(0), "stderr:\n{stderr}");
    assert!(stderr.contains("termination requested"), "stderr:\n{stderr}");
    assert!(stderr.contains("Client Service stopped!"), "stderr:\n{stderr}");
    assert!(!stderr.contains("ERROR"), "stderr:\n{stderr}");

    let served = router.join().unwrap();
    assert_eq!(served, 2 + rest.lines().count());
}
