//! Forwards SIGINT, SIGTERM and SIGHUP so the daemon is never orphaned.

use std::thread::JoinHandle;

use super::supervisor::SupervisorError;

pub struct SignalHandler {
    _handle: Option<JoinHandle<()>>,
}

#[cfg(unix)]
impl SignalHandler {
    /// Calls `on_signal` for every termination signal. The first one asks for a
    /// graceful shutdown; the callback decides what repeats mean.
    pub fn setup<F>(on_signal: F) -> Result<Self, SupervisorError>
    where
        F: Fn(i32) + Send + 'static,
    {
        use signal_hook::consts::SIGHUP;
        use signal_hook::consts::SIGINT;
        use signal_hook::consts::SIGTERM;
        use signal_hook::iterator::Signals;
        use tracing::info;

        let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])
            .map_err(|e| SupervisorError::SignalSetup(e.to_string()))?;

        let handle = std::thread::Builder::new()
            .name("signal-handler".to_string())
            .spawn(move || {
                let mut received = 0u32;
                for sig in signals.forever() {
                    received += 1;
                    if received == 1 {
                        info!(signal = sig, "Received signal, shutting down");
                    } else {
                        info!(signal = sig, received, "Received repeated signal");
                    }
                    on_signal(sig);
                }
            })
            .map_err(|e| {
                SupervisorError::SignalSetup(format!("failed to spawn signal handler: {e}"))
            })?;

        Ok(Self {
            _handle: Some(handle),
        })
    }
}

#[cfg(not(unix))]
impl SignalHandler {
    /// Console control events are not hooked here; the daemon is stopped on exit.
    pub fn setup<F>(_on_signal: F) -> Result<Self, SupervisorError>
    where
        F: Fn(i32) + Send + 'static,
    {
        Ok(Self { _handle: None })
    }
}
