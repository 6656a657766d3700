//! Daemon readiness polling.

use std::time::Duration;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::usecases::ports::HealthProbe;
use crate::usecases::ports::Sleeper;

pub const DEFAULT_HEALTH_ATTEMPTS: u32 = 15;
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_HEALTH_ATTEMPTS,
            interval: DEFAULT_HEALTH_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthOutcome {
    Ready { attempts: u32 },
    /// The budget ran out. Startup continues anyway.
    TimedOut { attempts: u32 },
    /// A shutdown request arrived while waiting between attempts.
    Interrupted { attempts: u32 },
}

impl HealthOutcome {
    pub fn is_ready(self) -> bool {
        matches!(self, HealthOutcome::Ready { .. })
    }
}

/// Polls until the daemon answers 200 or `policy.max_attempts` probes have failed.
///
/// Never returns an error: exhaustion is reported as `TimedOut` and the caller
/// proceeds. No sleep follows the final attempt. An interrupted sleep ends the
/// wait at once.
pub fn await_healthy(
    probe: &dyn HealthProbe,
    sleeper: &dyn Sleeper,
    policy: HealthPolicy,
) -> HealthOutcome {
    let mut attempts = 0;
    while attempts < policy.max_attempts {
        attempts += 1;
        debug!(attempt = attempts, "Checking daemon health");
        match probe.probe() {
            Ok(()) => {
                info!(attempts, "Daemon is healthy");
                return HealthOutcome::Ready { attempts };
            }
            Err(err) => debug!(attempt = attempts, error = %err, "Daemon not ready"),
        }
        if attempts < policy.max_attempts {
            sleeper.sleep(policy.interval);
            if sleeper.is_interrupted() {
                info!(attempts, "Health wait interrupted");
                return HealthOutcome::Interrupted { attempts };
            }
        }
    }
    warn!(attempts, "Daemon did not become healthy; continuing");
    HealthOutcome::TimedOut { attempts }
}
