//! Small port mocks: clipboard, sleeper, clock and health probe.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use crate::usecases::ports::Clipboard;
use crate::usecases::ports::Clock;
use crate::usecases::ports::HealthProbe;
use crate::usecases::ports::RemoteError;
use crate::usecases::ports::Sleeper;

#[derive(Default)]
pub struct MockClipboard {
    contents: Mutex<Option<String>>,
}

impl MockClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().unwrap().clone()
    }
}

impl Clipboard for MockClipboard {
    fn write_text(&self, text: &str) {
        *self.contents.lock().unwrap() = Some(text.to_string());
    }
}

/// Records requested sleeps instead of blocking.
#[derive(Default)]
pub struct MockSleeper {
    sleeps: Mutex<Vec<Duration>>,
    interrupt_after: Option<usize>,
}

impl MockSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports an interruption once `sleeps` sleeps have been requested.
    pub fn interrupted_after(sleeps: usize) -> Self {
        Self {
            interrupt_after: Some(sleeps),
            ..Self::default()
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Sleeper for MockSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }

    fn is_interrupted(&self) -> bool {
        self.interrupt_after
            .is_some_and(|limit| self.sleeps.lock().unwrap().len() >= limit)
    }
}

/// Manually advanced clock.
pub struct MockClock {
    now: Mutex<Instant>,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

/// Answers probes from a script; once it runs out every probe fails.
#[derive(Default)]
pub struct MockHealthProbe {
    script: Mutex<VecDeque<Result<(), RemoteError>>>,
    calls: AtomicUsize,
}

impl MockHealthProbe {
    /// Fails `failures` times with HTTP 503, then answers 200.
    pub fn healthy_after(failures: usize) -> Self {
        let mut script: VecDeque<_> = (0..failures)
            .map(|_| {
                Err(RemoteError::Status {
                    method: "GET",
                    path: "/healthz".into(),
                    status: 503,
                })
            })
            .collect();
        script.push_back(Ok(()));
        Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn never_healthy() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HealthProbe for MockHealthProbe {
    fn probe(&self) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(RemoteError::Transport {
                    url: "http://localhost:32055/healthz".into(),
                    reason: "connection refused".into(),
                })
            })
    }
}
