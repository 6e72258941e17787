use crate::clock::Clock;
use crate::logging::LogContext;
use crate::orchestrator::Orchestrator;
use chrono::{DateTime, NaiveTime, Utc};
use hdd_core::record::Source;
use log::{debug, error, info};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Hours (UTC) when new runs are usually published.
pub const DEFAULT_RELEASE_WINDOWS: [&str; 2] = ["06:00-10:00", "18:00-22:00"];

/// Inclusive UTC time-of-day range, `HH:MM-HH:MM`. A range whose end is
/// before its start wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ReleaseWindow {
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= time && time <= self.end
        } else {
            time >= self.start || time <= self.end
        }
    }
}

impl FromStr for ReleaseWindow {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| anyhow::anyhow!("release window must be HH:MM-HH:MM, got {s:?}"))?;
        Ok(ReleaseWindow {
            start: NaiveTime::parse_from_str(start.trim(), "%H:%M")?,
            end: NaiveTime::parse_from_str(end.trim(), "%H:%M")?,
        })
    }
}

/// Set of release windows; an empty gate is always open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseGate {
    windows: Vec<ReleaseWindow>,
}

impl ReleaseGate {
    pub fn new(windows: Vec<ReleaseWindow>) -> Self {
        ReleaseGate { windows }
    }

    pub fn always_open() -> Self {
        ReleaseGate::default()
    }

    pub fn parse(windows: &[String]) -> anyhow::Result<Self> {
        Ok(ReleaseGate::new(
            windows.iter().map(|w| w.parse()).collect::<anyhow::Result<_>>()?,
        ))
    }

    pub fn is_open(&self, now: &DateTime<Utc>) -> bool {
        self.windows.is_empty() || self.windows.iter().any(|w| w.contains(now.time()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    Processed,
    Skipped,
    Failed(String),
    Panicked(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Outside every release window, nothing ran.
    Gated,
    Ran(Vec<(Source, PassOutcome)>),
}

/// The polling loop around a fixed list of orchestrators.
pub struct Runner {
    orchestrators: Vec<Orchestrator>,
    gate: ReleaseGate,
    poll_interval: Duration,
    clock: Rc<dyn Clock>,
    log: LogContext,
}

impl Runner {
    pub fn new(orchestrators: Vec<Orchestrator>, clock: Rc<dyn Clock>, log: LogContext) -> Self {
        Runner {
            orchestrators,
            gate: ReleaseGate::always_open(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            clock,
            log,
        }
    }

    pub fn with_gate(mut self, gate: ReleaseGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// One iteration: every orchestrator runs once, in order, each isolated
    /// from the failures and panics of the others.
    pub fn tick(&self) -> TickOutcome {
        let target = self.log.target();
        let now = self.clock.now();
        if !self.gate.is_open(&now) {
            debug!(target: target, "{} outside release windows", now.format("%H:%M"));
            return TickOutcome::Gated;
        }

        let outcomes = self
            .orchestrators
            .iter()
            .map(|orchestrator| {
                let source = orchestrator.source();
                let outcome = match catch_unwind(AssertUnwindSafe(|| orchestrator.run())) {
                    Ok(Ok(true)) => {
                        info!(target: target, "{source}: processed new data");
                        PassOutcome::Processed
                    }
                    Ok(Ok(false)) => {
                        info!(target: target, "{source}: nothing to process");
                        PassOutcome::Skipped
                    }
                    Ok(Err(err)) => {
                        error!(target: target, "{source}: pass failed: {err:#}");
                        PassOutcome::Failed(format!("{err:#}"))
                    }
                    Err(panic) => {
                        let message = panic
                            .downcast_ref::<&str>()
                            .map(|s| s.to_string())
                            .or_else(|| panic.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "unknown panic".to_string());
                        error!(target: target, "{source}: pass panicked: {message}");
                        PassOutcome::Panicked(message)
                    }
                };
                (source, outcome)
            })
            .collect();
        TickOutcome::Ran(outcomes)
    }

    pub fn run_forever(&self) -> ! {
        info!(
            target: self.log.target(),
            "polling {} sources every {}s",
            self.orchestrators.len(),
            self.poll_interval.as_secs()
        );
        loop {
            self.tick();
            self.clock.sleep(self.poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::orchestrator::tests::{run_at, FakeSource};
    use chrono::TimeZone;
    use hdd_db::Database;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 12, hour, minute, 0).unwrap()
    }

    fn orchestrator(source: FakeSource, db: &Database) -> Orchestrator {
        Orchestrator::new(Box::new(source), Rc::new(db.clone()), LogContext::default())
    }

    #[test]
    fn release_window_parsing() {
        let window: ReleaseWindow = "06:00-10:00".parse().unwrap();
        assert!(window.contains(NaiveTime::from_hms_opt(6, 0, 0).unwrap()));
        assert!(window.contains(NaiveTime::from_hms_opt(10, 0, 0).unwrap()));
        assert!(!window.contains(NaiveTime::from_hms_opt(10, 1, 0).unwrap()));
        assert!("0600-1000".parse::<ReleaseWindow>().is_err());
        assert!("25:00-26:00".parse::<ReleaseWindow>().is_err());

        let overnight: ReleaseWindow = "22:00-02:00".parse().unwrap();
        assert!(overnight.contains(NaiveTime::from_hms_opt(23, 30, 0).unwrap()));
        assert!(overnight.contains(NaiveTime::from_hms_opt(1, 0, 0).unwrap()));
        assert!(!overnight.contains(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
    }

    #[test]
    fn default_gate() {
        let windows: Vec<String> = DEFAULT_RELEASE_WINDOWS.iter().map(|w| w.to_string()).collect();
        let gate = ReleaseGate::parse(&windows).unwrap();
        assert!(gate.is_open(&at(7, 30)));
        assert!(gate.is_open(&at(22, 0)));
        assert!(!gate.is_open(&at(12, 0)));
        assert!(ReleaseGate::always_open().is_open(&at(12, 0)));
    }

    #[test]
    fn gated_tick_runs_nothing() {
        let db = Database::new().unwrap();
        let source = FakeSource::new(Some(run_at(12, 0)));
        let downloads = Rc::clone(&source.downloads);
        let clock = Rc::new(ManualClock::new(at(12, 0)));
        let runner = Runner::new(vec![orchestrator(source, &db)], clock, LogContext::default())
            .with_gate(ReleaseGate::new(vec!["06:00-10:00".parse().unwrap()]));
        assert_eq!(runner.tick(), TickOutcome::Gated);
        assert_eq!(downloads.get(), 0);
    }

    #[test]
    fn failure_and_panic_are_isolated() {
        let db = Database::new().unwrap();
        let mut exploding = FakeSource::new(Some(run_at(12, 0)));
        exploding.panic_on_check = true;
        let healthy = FakeSource::new(Some(run_at(12, 12)));
        let clock = Rc::new(ManualClock::new(at(7, 0)));
        let runner = Runner::new(
            vec![orchestrator(exploding, &db), orchestrator(healthy, &db)],
            clock,
            LogContext::default(),
        );

        match runner.tick() {
            TickOutcome::Ran(outcomes) => {
                assert_eq!(outcomes.len(), 2);
                assert!(matches!(outcomes[0].1, PassOutcome::Panicked(ref m) if m == "upstream exploded"));
                assert_eq!(outcomes[1].1, PassOutcome::Processed);
            }
            TickOutcome::Gated => panic!("gate should be open"),
        }
        // second tick: healthy source already stored
        match runner.tick() {
            TickOutcome::Ran(outcomes) => assert_eq!(outcomes[1].1, PassOutcome::Skipped),
            TickOutcome::Gated => panic!("gate should be open"),
        }
    }

    #[test]
    fn errors_are_reported_not_raised() {
        let db = Database::new().unwrap();
        let mut source = FakeSource::new(Some(run_at(12, 0)));
        source.fail_compute = true;
        let clock = Rc::new(ManualClock::new(at(7, 0)));
        let runner = Runner::new(vec![orchestrator(source, &db)], clock.clone(), LogContext::default());
        match runner.tick() {
            TickOutcome::Ran(outcomes) => {
                assert!(matches!(outcomes[0].1, PassOutcome::Failed(ref m) if m.contains("corrupt grid")));
            }
            TickOutcome::Gated => panic!("gate should be open"),
        }
        assert_eq!(db.count_records().unwrap(), 0);
        assert_eq!(clock.sleeps(), 0);
    }
}
