#![cfg(unix)]
#![expect(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

//! `bowery run` against a stand-in daemon script. The client must never leave the
//! daemon running behind it.

use std::fs;
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::Child;
use std::process::ExitStatus;
use std::process::Stdio;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const EXIT_USAGE: i32 = 64;
const PID_MARKER: &str = "bowery_client_pid";

struct FakeDaemonEnv {
    temp_dir: TempDir,
    port: u16,
}

impl FakeDaemonEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let bin_dir = temp_dir.path().join("bin");
        fs::create_dir_all(&bin_dir).unwrap();
        let client = bin_dir.join("client");
        fs::write(&client, "#!/bin/sh\nexec sleep 30\n").unwrap();
        fs::set_permissions(&client, fs::Permissions::from_mode(0o755)).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        Self { temp_dir, port }
    }

    fn marker(&self) -> PathBuf {
        self.temp_dir.path().join(PID_MARKER)
    }

    fn envs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("BOWERY_TMPDIR", self.temp_dir.path().display().to_string()),
            (
                "BOWERY_BIN_DIR",
                self.temp_dir.path().join("bin").display().to_string(),
            ),
            ("BOWERY_USE_UPDATER", "0".to_string()),
            ("BOWERY_PORT", self.port.to_string()),
            (
                "BOWERY_PUSHER_URL",
                format!("ws://127.0.0.1:{}/app/test", self.port),
            ),
            ("NO_COLOR", "1".to_string()),
        ]
    }

    fn cli_command(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bowery"));
        cmd.envs(self.envs())
            .env_remove("BOWERY_LOG")
            .env_remove("BOWERY_DAEMON_LOG");
        cmd
    }

    fn spawn_run(&self, extra_env: &[(&str, &str)]) -> Child {
        std::process::Command::new(assert_cmd::cargo::cargo_bin!("bowery"))
            .arg("run")
            .envs(self.envs())
            .envs(extra_env.iter().copied())
            .env_remove("BOWERY_LOG")
            .env_remove("BOWERY_DAEMON_LOG")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to spawn bowery run")
    }
}

fn pid_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn wait_with_deadline(child: &mut Child, limit: Duration) -> Option<ExitStatus> {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait().unwrap() {
            return Some(status);
        }
        thread::sleep(Duration::from_millis(20));
    }
    let _ = child.kill();
    None
}

fn wait_for_pid(marker: &PathBuf, limit: Duration) -> Option<u32> {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if let Some(pid) = fs::read_to_string(marker)
            .ok()
            .and_then(|text| text.trim().parse().ok())
        {
            return Some(pid);
        }
        thread::sleep(Duration::from_millis(20));
    }
    None
}

#[test]
fn run_with_invalid_pusher_url_fails_before_spawning_daemon() {
    let env = FakeDaemonEnv::new();

    env.cli_command()
        .arg("run")
        .env("BOWERY_PUSHER_URL", "not a url")
        .env("BOWERY_HEALTH_ATTEMPTS", "1")
        .write_stdin("")
        .timeout(Duration::from_secs(20))
        .assert()
        .code(EXIT_USAGE)
        .stderr(predicate::str::contains("Invalid pub/sub URL"));

    assert!(
        !env.marker().exists(),
        "no daemon may be recorded when start-up fails"
    );
}

#[test]
fn sigint_during_health_wait_stops_client_and_daemon() {
    let env = FakeDaemonEnv::new();
    let mut child = env.spawn_run(&[
        ("BOWERY_HEALTH_ATTEMPTS", "8"),
        ("BOWERY_HEALTH_INTERVAL_MS", "1500"),
    ]);

    let Some(daemon_pid) = wait_for_pid(&env.marker(), Duration::from_secs(10)) else {
        let _ = child.kill();
        panic!("daemon pid was never recorded");
    };
    thread::sleep(Duration::from_millis(300));

    let interrupted = Instant::now();
    let sent = std::process::Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(sent.success());
    let status = wait_with_deadline(&mut child, Duration::from_secs(20))
        .expect("client did not exit after SIGINT");

    assert!(
        interrupted.elapsed() < Duration::from_secs(5),
        "client kept waiting for the daemon after SIGINT: {:?}",
        interrupted.elapsed()
    );
    assert_eq!(status.code(), Some(0));
    assert!(!pid_alive(daemon_pid), "daemon {daemon_pid} outlived the client");
    assert!(!env.marker().exists());
}
