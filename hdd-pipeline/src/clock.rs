use chrono::{DateTime, Utc};
use std::cell::Cell;
use std::time::Duration;

/// Source of the current time and of waiting, injected into the runner.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration);
}

/// Wall clock; sleeps block the thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when told to; sleeping advances it instantly.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
    sleeps: Cell<usize>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            now: Cell::new(start),
            sleeps: Cell::new(0),
        }
    }

    pub fn advance(&self, duration: chrono::Duration) {
        self.now.set(self.now.get() + duration);
    }

    /// Number of `sleep` calls so far.
    pub fn sleeps(&self) -> usize {
        self.sleeps.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        let step = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
        self.advance(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_advances_on_sleep() {
        let start = Utc.with_ymd_and_hms(2025, 1, 12, 6, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.sleep(Duration::from_secs(300));
        assert_eq!(clock.now(), start + chrono::Duration::minutes(5));
        assert_eq!(clock.sleeps(), 1);
    }
}
