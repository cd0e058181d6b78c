use std::time::Duration;

use chrono::{DateTime, Utc};

/// Wall-clock reads and blocking waits. Every delay a job takes goes through here.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        tokio::task::block_in_place(|| std::thread::sleep(duration));
    }
}

/// Time elapsed on `clock` since `started`; zero if the clock went backwards.
pub fn elapsed_since(clock: &impl Clock, started: DateTime<Utc>) -> Duration {
    (clock.now() - started).to_std().unwrap_or_default()
}
