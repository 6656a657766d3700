use std::time::Duration;

/// Blocking pause between retries.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);

    /// Set once a sleep was cut short by a shutdown request. Retry loops stop
    /// as soon as this turns true.
    fn is_interrupted(&self) -> bool {
        false
    }
}
