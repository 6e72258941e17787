//! Shared utility functions for HDD crates.

/// Date utility functions
pub mod dates {
    use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

    /// Run stamps name archived grid files, e.g. "2025011212" for the 12z run of 2025-01-12.
    pub const RUN_STAMP_FORMAT: &str = "%Y%m%d%H";

    /// Storage format for timestamps: always UTC, second precision.
    pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    /// Timestamp layouts accepted when reading grid files.
    const GRID_TIMESTAMP_FORMATS: [&str; 3] =
        ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s, "%Y-%m-%d")?)
    }

    /// Format a UTC instant in the storage layout.
    pub fn format_timestamp(time: &DateTime<Utc>) -> String {
        time.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Parse a UTC instant written by [`format_timestamp`].
    pub fn parse_stored_timestamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
        Ok(NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)?.and_utc())
    }

    /// Parse a timestamp as found in grid files. RFC 3339 strings are
    /// converted to UTC; naive strings are taken as UTC already.
    pub fn parse_grid_timestamp(s: &str) -> anyhow::Result<NaiveDateTime> {
        let s = s.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
            return Ok(parsed.naive_utc());
        }
        for format in GRID_TIMESTAMP_FORMATS {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(parsed);
            }
        }
        if let Ok(date) = parse_date(s) {
            return Ok(date.and_time(chrono::NaiveTime::MIN));
        }
        anyhow::bail!("unrecognized timestamp: {s}")
    }

    /// Format a run time as an archive stamp.
    pub fn format_run_stamp(time: &DateTime<Utc>) -> String {
        time.format(RUN_STAMP_FORMAT).to_string()
    }

    /// Parse an archive stamp ("YYYYMMDDHH") into a UTC run time.
    pub fn parse_run_stamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
        let s = s.trim();
        if s.len() != 10 || !s.bytes().all(|b| b.is_ascii_digit()) {
            anyhow::bail!("run stamp must be YYYYMMDDHH, got {s:?}");
        }
        let date = NaiveDate::parse_from_str(&s[..8], "%Y%m%d")?;
        let hour: u32 = s[8..].parse()?;
        date.and_hms_opt(hour, 0, 0)
            .map(|naive| naive.and_utc())
            .ok_or_else(|| anyhow::anyhow!("invalid hour in run stamp {s:?}"))
    }

    /// Get the winter year for a given date.
    /// A heating season runs June 1 to May 31 and is named for the year it starts in.
    /// e.g., Dec 15 2024 -> winter year 2024, Jan 10 2025 -> winter year 2024
    pub fn winter_year_for_date(date: &NaiveDate) -> i32 {
        let year = date.year();
        if date.month() <= 5 {
            year - 1
        } else {
            year
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::{NaiveDate, TimeZone, Utc};

        #[test]
        fn test_winter_year_for_date() {
            let dec = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();
            assert_eq!(winter_year_for_date(&dec), 2024);

            let jan = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
            assert_eq!(winter_year_for_date(&jan), 2024);

            let may31 = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
            assert_eq!(winter_year_for_date(&may31), 2024);

            let jun1 = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
            assert_eq!(winter_year_for_date(&jun1), 2025);
        }

        #[test]
        fn test_run_stamp_round_trip() {
            let run = Utc.with_ymd_and_hms(2025, 1, 12, 12, 0, 0).unwrap();
            assert_eq!(format_run_stamp(&run), "2025011212");
            assert_eq!(parse_run_stamp("2025011212").unwrap(), run);
        }

        #[test]
        fn test_parse_run_stamp_rejects_garbage() {
            assert!(parse_run_stamp("20250112").is_err());
            assert!(parse_run_stamp("2025011225").is_err());
            assert!(parse_run_stamp("2025-01-12").is_err());
        }

        #[test]
        fn test_parse_grid_timestamp_layouts() {
            let expected = NaiveDate::from_ymd_opt(2025, 1, 13)
                .unwrap()
                .and_hms_opt(6, 0, 0)
                .unwrap();
            assert_eq!(parse_grid_timestamp("2025-01-13 06:00:00").unwrap(), expected);
            assert_eq!(parse_grid_timestamp("2025-01-13T06:00:00").unwrap(), expected);
            assert_eq!(parse_grid_timestamp("2025-01-13T06:00:00Z").unwrap(), expected);
            assert_eq!(
                parse_grid_timestamp("2025-01-13T07:00:00+01:00").unwrap(),
                expected
            );
            assert!(parse_grid_timestamp("yesterday").is_err());
        }

        #[test]
        fn test_stored_timestamp_round_trip() {
            let time = Utc.with_ymd_and_hms(2024, 11, 30, 0, 0, 0).unwrap();
            let formatted = format_timestamp(&time);
            assert_eq!(formatted, "2024-11-30T00:00:00Z");
            assert_eq!(parse_stored_timestamp(&formatted).unwrap(), time);
        }
    }
}
