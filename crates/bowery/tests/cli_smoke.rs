#![expect(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

//! CLI smoke tests. None of these need a running daemon.

use std::net::TcpListener;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// LSB exit code 3: program is not running
const EXIT_NOT_RUNNING: i32 = 3;
/// sysexits EX_UNAVAILABLE
const EXIT_UNAVAILABLE: i32 = 69;

struct NoDaemonTestEnv {
    temp_dir: TempDir,
    port: u16,
}

impl NoDaemonTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        Self { temp_dir, port }
    }

    fn cli_command(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bowery"));
        cmd.env("BOWERY_TMPDIR", self.temp_dir.path())
            .env("BOWERY_PORT", self.port.to_string())
            .env("BOWERY_HEALTH_INTERVAL_MS", "10")
            .env("NO_COLOR", "1")
            .env_remove("BOWERY_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.cli_command().args(args).assert()
    }
}

#[test]
fn smoke_help_lists_subcommands() {
    NoDaemonTestEnv::new()
        .run(&["--help"])
        .success()
        .stdout(predicate::str::contains("daemon"))
        .stdout(predicate::str::contains("health"))
        .stdout(predicate::str::contains("BOWERY_PORT"));
}

#[test]
fn smoke_version() {
    NoDaemonTestEnv::new()
        .run(&["--version"])
        .success()
        .stdout(predicate::str::starts_with("bowery "));
}

#[test]
fn smoke_completions_bash() {
    NoDaemonTestEnv::new()
        .run(&["completions", "bash"])
        .success()
        .stdout(predicate::str::contains("_bowery"));
}

#[test]
fn smoke_daemon_status_without_markers_is_not_running() {
    NoDaemonTestEnv::new()
        .run(&["daemon", "status"])
        .code(EXIT_NOT_RUNNING)
        .stdout(predicate::str::contains("Daemon is not running"));
}

#[test]
fn smoke_daemon_status_with_stale_pid() {
    let env = NoDaemonTestEnv::new();
    std::fs::write(env.temp_dir.path().join("bowery_client_pid"), "999999999").unwrap();

    env.run(&["daemon", "status"])
        .code(EXIT_NOT_RUNNING)
        .stdout(predicate::str::contains("stale PID 999999999"));
}

#[test]
fn smoke_daemon_stop_without_daemon() {
    NoDaemonTestEnv::new()
        .run(&["daemon", "stop"])
        .code(EXIT_NOT_RUNNING)
        .stderr(predicate::str::contains("Daemon is not running"))
        .stderr(predicate::str::contains("bowery daemon start"));
}

#[test]
fn smoke_health_against_closed_port() {
    let env = NoDaemonTestEnv::new();

    env.run(&["health", "--attempts", "1"])
        .code(EXIT_UNAVAILABLE)
        .stdout(predicate::str::contains("did not answer after 1 checks"));
}

#[test]
fn smoke_sync_pause_against_closed_port() {
    NoDaemonTestEnv::new()
        .run(&["sync", "--pause"])
        .code(EXIT_UNAVAILABLE)
        .stderr(predicate::str::contains("Suggestion:"));
}

#[test]
fn smoke_sync_flags_conflict() {
    NoDaemonTestEnv::new()
        .run(&["sync", "--pause", "--resume"])
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
