//! Spawns, watches and stops the local daemon.

use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::markers::MarkerFiles;
use super::process::ProcessController;
use super::process::ProcessStatus;
use super::process::Signal;
use crate::common::mutex_lock_or_recover;
use crate::common::telemetry::open_log_file;
use crate::infra::config::ClientConfig;
use crate::infra::sleeper::RealSleeper;
use crate::usecases::ports::Sleeper;

const EXIT_POLL: Duration = Duration::from_millis(100);
const STOP_POLL: Duration = Duration::from_millis(100);
const STOP_ATTEMPTS: u32 = 50;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Failed to start {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Daemon is not running")]
    NotRunning,

    #[error("Failed to signal daemon (PID {pid}): {message}")]
    Signal { pid: u32, message: String },

    #[error("Daemon (PID {pid}) did not shut down")]
    StillRunning { pid: u32 },

    #[error("Failed to install signal handlers: {0}")]
    SignalSetup(String),
}

impl SupervisorError {
    pub fn suggestion(&self) -> String {
        match self {
            SupervisorError::Spawn { program, .. } => format!(
                "Check that {} exists and is executable, or set BOWERY_BIN_DIR.",
                program.display()
            ),
            SupervisorError::NotRunning => "Start it with 'bowery daemon start'.".to_string(),
            SupervisorError::Signal { .. } => {
                "Check that the daemon belongs to the current user.".to_string()
            }
            SupervisorError::StillRunning { pid } => {
                format!("Stop it manually with 'kill -9 {pid}'.")
            }
            SupervisorError::SignalSetup(_) => {
                "Run 'bowery daemon stop' after quitting to make sure no daemon is left.".to_string()
            }
        }
    }
}

/// Recorded state of the daemon, as seen through the marker files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonStatus {
    NotRecorded,
    Running {
        pid: u32,
        working_dir: Option<PathBuf>,
    },
    /// A pid is recorded but nothing answers to it.
    Stale { pid: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopOutcome {
    pub pid: u32,
    pub forced: bool,
    pub warnings: Vec<String>,
}

/// A daemon spawned by this client. A watcher thread reports its exit.
#[derive(Debug)]
pub struct DaemonHandle {
    pid: u32,
    child: Arc<Mutex<Child>>,
    exited: Arc<Mutex<Option<Option<i32>>>>,
}

impl DaemonHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// `Some(code)` once the process is gone; the inner `None` means killed by a signal.
    pub fn exit_code(&self) -> Option<Option<i32>> {
        *mutex_lock_or_recover(&self.exited)
    }

    pub fn has_exited(&self) -> bool {
        self.exit_code().is_some()
    }

    fn kill(&self) -> Result<(), io::Error> {
        mutex_lock_or_recover(&self.child).kill()
    }
}

pub struct Supervisor<P: ProcessController> {
    config: ClientConfig,
    markers: MarkerFiles,
    controller: P,
    sleeper: Box<dyn Sleeper>,
}

impl<P: ProcessController> Supervisor<P> {
    pub fn new(config: ClientConfig, controller: P) -> Self {
        let markers = MarkerFiles::new(config.temp_dir());
        Self {
            config,
            markers,
            controller,
            sleeper: Box::new(RealSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn markers(&self) -> &MarkerFiles {
        &self.markers
    }

    /// Program and arguments that launch the daemon, through the updater when enabled.
    pub fn daemon_command(&self) -> (PathBuf, Vec<String>) {
        let client = self.config.client_path();
        if !self.config.use_updater() {
            return (client, Vec::new());
        }
        (
            self.config.updater_path(),
            vec![
                "-d".to_string(),
                self.config.install_dir().to_string_lossy().into_owned(),
                self.config.version_url().to_string(),
                String::new(),
                client.to_string_lossy().into_owned(),
            ],
        )
    }

    /// Interrupts a daemon left behind by a previous client. Returns the pid signalled.
    pub fn recover_stale(&self) -> Option<u32> {
        let pid = self.markers.read_pid()?;
        match self.controller.send_signal(pid, Signal::Interrupt) {
            Ok(()) => {
                info!(pid, "Interrupted stale daemon");
                Some(pid)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(pid, "Recorded daemon already gone");
                None
            }
            Err(err) => {
                warn!(pid, error = %err, "Failed to interrupt stale daemon");
                None
            }
        }
    }

    fn stdio(&self) -> (Stdio, Stdio) {
        let Some(path) = self.config.daemon_log() else {
            return (Stdio::inherit(), Stdio::inherit());
        };
        let opened = open_log_file(path).and_then(|file| Ok((file.try_clone()?, file)));
        match opened {
            Ok((stdout, stderr)) => (Stdio::from(stdout), Stdio::from(stderr)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Cannot open daemon log; inheriting output");
                (Stdio::inherit(), Stdio::inherit())
            }
        }
    }

    /// Spawns the daemon, records its markers and watches it. `on_exit` runs on the
    /// watcher thread with the exit code.
    pub fn start<F>(&self, working_dir: &Path, on_exit: F) -> Result<DaemonHandle, SupervisorError>
    where
        F: FnOnce(Option<i32>) + Send + 'static,
    {
        let (program, args) = self.daemon_command();
        let (stdout, stderr) = self.stdio();
        let child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                program: program.clone(),
                source,
            })?;
        let pid = child.id();
        info!(pid, program = %program.display(), "Daemon started");
        self.markers.write(pid, working_dir);

        let child = Arc::new(Mutex::new(child));
        let exited = Arc::new(Mutex::new(None));
        let watched = Arc::clone(&child);
        let exit_slot = Arc::clone(&exited);
        thread::Builder::new()
            .name("daemon-watcher".to_string())
            .spawn(move || {
                let code = watch_exit(&watched);
                *mutex_lock_or_recover(&exit_slot) = Some(code);
                on_exit(code);
            })
            .map_err(|source| SupervisorError::Spawn {
                program: program.clone(),
                source,
            })?;

        Ok(DaemonHandle { pid, child, exited })
    }

    /// Terminates a daemon this client spawned and clears the markers.
    pub fn shutdown(&self, handle: &DaemonHandle) -> StopOutcome {
        let mut outcome = StopOutcome {
            pid: handle.pid,
            forced: false,
            warnings: Vec::new(),
        };
        if !handle.has_exited() {
            match self.controller.send_signal(handle.pid, Signal::Term) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    debug!(pid = handle.pid, error = %err, "Signal failed; killing child");
                    if let Err(err) = handle.kill() {
                        outcome.warnings.push(format!("kill failed: {err}"));
                    }
                }
            }
            if !self.wait_until(|| handle.has_exited()) {
                outcome.forced = true;
                if let Err(err) = handle.kill() {
                    outcome.warnings.push(format!("kill failed: {err}"));
                }
            }
        }
        self.markers.clear();
        info!(pid = handle.pid, forced = outcome.forced, "Daemon stopped");
        outcome
    }

    /// Stops the daemon recorded in the markers.
    pub fn stop(&self) -> Result<StopOutcome, SupervisorError> {
        let Some(pid) = self.markers.read_pid() else {
            return Err(SupervisorError::NotRunning);
        };
        self.stop_pid(pid)
    }

    pub fn stop_pid(&self, pid: u32) -> Result<StopOutcome, SupervisorError> {
        match self.check(pid)? {
            ProcessStatus::NotFound => {
                self.markers.clear();
                return Err(SupervisorError::NotRunning);
            }
            ProcessStatus::NoPermission => {
                return Err(SupervisorError::Signal {
                    pid,
                    message: "Permission denied".to_string(),
                });
            }
            ProcessStatus::Running => {}
        }

        let mut outcome = StopOutcome {
            pid,
            forced: false,
            warnings: Vec::new(),
        };
        self.signal(pid, Signal::Term)?;
        if !self.wait_until(|| self.is_gone(pid)) {
            outcome.forced = true;
            self.signal(pid, Signal::Kill)?;
            if !self.wait_until(|| self.is_gone(pid)) {
                return Err(SupervisorError::StillRunning { pid });
            }
        }
        self.markers.clear();
        Ok(outcome)
    }

    pub fn status(&self) -> DaemonStatus {
        let Some(pid) = self.markers.read_pid() else {
            return DaemonStatus::NotRecorded;
        };
        match self.controller.check_process(pid) {
            Ok(ProcessStatus::Running | ProcessStatus::NoPermission) => DaemonStatus::Running {
                pid,
                working_dir: self.markers.read_dir(),
            },
            Ok(ProcessStatus::NotFound) => DaemonStatus::Stale { pid },
            Err(err) => {
                warn!(pid, error = %err, "Cannot check daemon process");
                DaemonStatus::Stale { pid }
            }
        }
    }

    fn check(&self, pid: u32) -> Result<ProcessStatus, SupervisorError> {
        self.controller
            .check_process(pid)
            .map_err(|err| SupervisorError::Signal {
                pid,
                message: err.to_string(),
            })
    }

    fn signal(&self, pid: u32, signal: Signal) -> Result<(), SupervisorError> {
        match self.controller.send_signal(pid, signal) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SupervisorError::Signal {
                pid,
                message: err.to_string(),
            }),
        }
    }

    fn is_gone(&self, pid: u32) -> bool {
        matches!(self.controller.check_process(pid), Ok(ProcessStatus::NotFound))
    }

    fn wait_until(&self, mut done: impl FnMut() -> bool) -> bool {
        for _ in 0..STOP_ATTEMPTS {
            if done() {
                return true;
            }
            self.sleeper.sleep(STOP_POLL);
        }
        done()
    }
}

fn watch_exit(child: &Mutex<Child>) -> Option<i32> {
    loop {
        let polled = mutex_lock_or_recover(child).try_wait();
        match polled {
            Ok(Some(status)) => {
                info!(code = ?status.code(), "Daemon exited");
                return status.code();
            }
            Ok(None) => thread::sleep(EXIT_POLL),
            Err(err) => {
                warn!(error = %err, "Lost track of daemon process");
                return None;
            }
        }
    }
}
