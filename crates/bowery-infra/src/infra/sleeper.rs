use std::thread;
use std::time::Duration;

use crate::usecases::ports::Sleeper;

#[derive(Debug, Clone, Copy, Default)]
pub struct RealSleeper;

impl Sleeper for RealSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
