use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use hdd_utils::dates::{format_run_stamp, parse_run_stamp};
use std::fmt;

/// Number of daily means kept from a forecast grid.
pub const FORECAST_WINDOW_DAYS: i64 = 14;

/// Hours between two consecutive forecast runs.
pub const RUN_SPACING_HOURS: i64 = 12;

/// Identifies one model run (forecast initialization) or one observation day
/// by its issue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId {
    pub time: DateTime<Utc>,
}

impl RunId {
    pub fn new(time: DateTime<Utc>) -> Self {
        RunId { time }
    }

    /// Parse an archive stamp such as "2025011212".
    pub fn from_stamp(stamp: &str) -> anyhow::Result<Self> {
        Ok(RunId::new(parse_run_stamp(stamp)?))
    }

    pub fn stamp(&self) -> String {
        format_run_stamp(&self.time)
    }

    /// Calendar date the run was issued on.
    pub fn base_date(&self) -> NaiveDate {
        self.time.date_naive()
    }

    /// First complete forecast day: 00z and 12z runs both start the day after
    /// their base date so no run contributes a partial first day.
    pub fn first_valid_day(&self) -> NaiveDate {
        self.base_date() + Duration::days(1)
    }

    /// Inclusive valid-time window kept from a forecast grid, from 00:00 of the
    /// first valid day to 23:00 of the last.
    pub fn forecast_window(&self) -> (NaiveDateTime, NaiveDateTime) {
        let start = self.first_valid_day().and_time(chrono::NaiveTime::MIN);
        let end = (self.base_date() + Duration::days(FORECAST_WINDOW_DAYS))
            .and_hms_opt(23, 0, 0)
            .unwrap_or(start);
        (start, end)
    }

    /// Forecast window stretched back to the previous run's first valid day,
    /// so the previous run's horizons can be re-summed from this run's grid.
    /// A 00z run gains its base date, which it covers in full; for a 12z run
    /// this is the plain forecast window.
    pub fn comparison_window(&self) -> (NaiveDateTime, NaiveDateTime) {
        let (start, end) = self.forecast_window();
        let earliest = self
            .previous()
            .first_valid_day()
            .and_time(chrono::NaiveTime::MIN);
        (start.min(earliest), end)
    }

    /// The run issued `RUN_SPACING_HOURS` earlier.
    pub fn previous(&self) -> RunId {
        RunId::new(self.time - Duration::hours(RUN_SPACING_HOURS))
    }

    /// True when the run sits exactly on one of the given UTC issue hours.
    pub fn is_on_cadence(&self, hours: &[u32]) -> bool {
        self.time.minute() == 0
            && self.time.second() == 0
            && self.time.nanosecond() == 0
            && hours.contains(&self.time.hour())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}z", self.time.format("%Y-%m-%d %H"))
    }
}

#[cfg(test)]
mod tests {
    use super::RunId;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn test_forecast_window_for_00z_and_12z() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 12).unwrap();
        let expected_start = NaiveDate::from_ymd_opt(2025, 1, 13)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let expected_end = NaiveDate::from_ymd_opt(2025, 1, 26)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        for hour in [0, 12] {
            let run = RunId::new(day.and_hms_opt(hour, 0, 0).unwrap().and_utc());
            assert_eq!(run.forecast_window(), (expected_start, expected_end));
        }
    }

    #[test]
    fn test_comparison_window_reaches_previous_run() {
        let at = |day: u32, hour: u32| {
            RunId::new(Utc.with_ymd_and_hms(2025, 1, day, hour, 0, 0).unwrap())
        };
        let midnight = |day: u32| {
            NaiveDate::from_ymd_opt(2025, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        // 00z follows a 12z run whose first valid day is the 00z base date
        let run_00z = at(13, 0);
        assert_eq!(run_00z.comparison_window().0, midnight(13));
        assert_eq!(run_00z.comparison_window().1, run_00z.forecast_window().1);
        assert_eq!(run_00z.forecast_window().0, midnight(14));
        // 12z follows the 00z run of the same day: same first valid day
        let run_12z = at(13, 12);
        assert_eq!(run_12z.comparison_window(), run_12z.forecast_window());
    }

    #[test]
    fn test_previous_run_is_twelve_hours_back() {
        let run = RunId::new(Utc.with_ymd_and_hms(2025, 1, 12, 0, 0, 0).unwrap());
        assert_eq!(
            run.previous().time,
            Utc.with_ymd_and_hms(2025, 1, 11, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_cadence() {
        let on = RunId::new(Utc.with_ymd_and_hms(2025, 1, 12, 12, 0, 0).unwrap());
        let off_hour = RunId::new(Utc.with_ymd_and_hms(2025, 1, 12, 6, 0, 0).unwrap());
        let off_minute = RunId::new(Utc.with_ymd_and_hms(2025, 1, 12, 12, 30, 0).unwrap());
        assert!(on.is_on_cadence(&[0, 12]));
        assert!(!off_hour.is_on_cadence(&[0, 12]));
        assert!(!off_minute.is_on_cadence(&[0, 12]));
    }

    #[test]
    fn test_stamp() {
        let run = RunId::from_stamp("2025011200").unwrap();
        assert_eq!(run.stamp(), "2025011200");
        assert_eq!(run.to_string(), "2025-01-12 00z");
    }
}
