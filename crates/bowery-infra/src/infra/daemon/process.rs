//! Signals and liveness checks against OS processes by pid.

use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Polite shutdown request; also what a stale daemon from a crashed client gets.
    Interrupt,
    Term,
    Kill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    NotFound,
    NoPermission,
}

pub trait ProcessController: Send + Sync {
    fn check_process(&self, pid: u32) -> Result<ProcessStatus, io::Error>;

    /// `ErrorKind::NotFound` when the process is already gone.
    fn send_signal(&self, pid: u32, signal: Signal) -> Result<(), io::Error>;
}

#[cfg(unix)]
fn to_pid(pid: u32) -> Result<libc::pid_t, io::Error> {
    pid.try_into()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "PID out of range"))
}

#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcessController;

#[cfg(unix)]
impl ProcessController for OsProcessController {
    fn check_process(&self, pid: u32) -> Result<ProcessStatus, io::Error> {
        let pid = to_pid(pid)?;

        // SAFETY: signal 0 only performs the existence and permission check.
        let result = unsafe { libc::kill(pid, 0) };
        if result == 0 {
            return Ok(ProcessStatus::Running);
        }

        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::ESRCH) => Ok(ProcessStatus::NotFound),
            Some(libc::EPERM) => Ok(ProcessStatus::NoPermission),
            _ => Err(err),
        }
    }

    fn send_signal(&self, pid: u32, signal: Signal) -> Result<(), io::Error> {
        let pid = to_pid(pid)?;
        let sig = match signal {
            Signal::Interrupt => libc::SIGINT,
            Signal::Term => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        };

        // SAFETY: plain kill(2) on a pid we recorded; no memory is shared.
        let result = unsafe { libc::kill(pid, sig) };
        if result == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::ESRCH) => Err(io::Error::new(io::ErrorKind::NotFound, err)),
            _ => Err(err),
        }
    }
}

/// Pid signalling is unavailable; the supervisor falls back to the child handle.
#[cfg(not(unix))]
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcessController;

#[cfg(not(unix))]
impl ProcessController for OsProcessController {
    fn check_process(&self, _pid: u32) -> Result<ProcessStatus, io::Error> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "process checks need a unix host",
        ))
    }

    fn send_signal(&self, _pid: u32, _signal: Signal) -> Result<(), io::Error> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "signals need a unix host",
        ))
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub struct MockProcessController {
        process_states: Mutex<HashMap<u32, ProcessStatus>>,
        signals_sent: Mutex<Vec<(u32, Signal)>>,
        check_error: Mutex<Option<io::Error>>,
        signal_error: Mutex<Option<io::Error>>,
        exits_on_signal: bool,
    }

    impl Default for MockProcessController {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockProcessController {
        pub fn new() -> Self {
            Self {
                process_states: Mutex::new(HashMap::new()),
                signals_sent: Mutex::new(Vec::new()),
                check_error: Mutex::new(None),
                signal_error: Mutex::new(None),
                exits_on_signal: false,
            }
        }

        pub fn with_process(self, pid: u32, status: ProcessStatus) -> Self {
            self.process_states.lock().unwrap().insert(pid, status);
            self
        }

        pub fn with_check_error(self, error: io::Error) -> Self {
            *self.check_error.lock().unwrap() = Some(error);
            self
        }

        pub fn with_signal_error(self, error: io::Error) -> Self {
            *self.signal_error.lock().unwrap() = Some(error);
            self
        }

        /// Processes disappear as soon as they are signalled.
        pub fn exiting_on_signal(mut self) -> Self {
            self.exits_on_signal = true;
            self
        }

        pub fn signals_sent(&self) -> Vec<(u32, Signal)> {
            self.signals_sent.lock().unwrap().clone()
        }
    }

    impl ProcessController for MockProcessController {
        fn check_process(&self, pid: u32) -> Result<ProcessStatus, io::Error> {
            if let Some(err) = self.check_error.lock().unwrap().take() {
                return Err(err);
            }
            Ok(self
                .process_states
                .lock()
                .unwrap()
                .get(&pid)
                .copied()
                .unwrap_or(ProcessStatus::NotFound))
        }

        fn send_signal(&self, pid: u32, signal: Signal) -> Result<(), io::Error> {
            if let Some(err) = self.signal_error.lock().unwrap().take() {
                return Err(err);
            }
            let mut states = self.process_states.lock().unwrap();
            if !states.contains_key(&pid) {
                return Err(io::Error::from(io::ErrorKind::NotFound));
            }
            if self.exits_on_signal {
                states.remove(&pid);
            }
            self.signals_sent.lock().unwrap().push((pid, signal));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock::MockProcessController;

    #[test]
    fn test_mock_unknown_pid_is_not_found() {
        let mock = MockProcessController::new();

        assert_eq!(mock.check_process(1234).unwrap(), ProcessStatus::NotFound);
        let err = mock.send_signal(1234, Signal::Interrupt).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_mock_exiting_on_signal() {
        let mock = MockProcessController::new()
            .with_process(1234, ProcessStatus::Running)
            .exiting_on_signal();

        mock.send_signal(1234, Signal::Term).unwrap();

        assert_eq!(mock.signals_sent(), vec![(1234, Signal::Term)]);
        assert_eq!(mock.check_process(1234).unwrap(), ProcessStatus::NotFound);
    }

    #[test]
    fn test_mock_signal_error() {
        let mock = MockProcessController::new()
            .with_process(1234, ProcessStatus::Running)
            .with_signal_error(io::Error::other("test error"));

        assert!(mock.send_signal(1234, Signal::Term).is_err());
        assert!(mock.signals_sent().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unix_controller_sees_current_process() {
        let controller = OsProcessController;

        assert_eq!(
            controller.check_process(std::process::id()).unwrap(),
            ProcessStatus::Running
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unix_controller_reports_dead_child() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();

        assert_eq!(
            OsProcessController.check_process(pid).unwrap(),
            ProcessStatus::NotFound
        );
        let err = OsProcessController
            .send_signal(pid, Signal::Interrupt)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
