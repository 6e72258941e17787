use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Offsets (in days from the first valid day) and label of a forecast horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HorizonSpec {
    pub first_offset: i64,
    pub last_offset: i64,
    pub label: &'static str,
}

/// Lead-time windows reported for every forecast run.
pub const FORECAST_HORIZONS: [HorizonSpec; 3] = [
    HorizonSpec {
        first_offset: 0,
        last_offset: 2,
        label: "Day 1-3",
    },
    HorizonSpec {
        first_offset: 3,
        last_offset: 6,
        label: "Day 4-7",
    },
    HorizonSpec {
        first_offset: 7,
        last_offset: 13,
        label: "Day 8-14",
    },
];

/// A labeled, inclusive date range such as "Day 1-3".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Horizon {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Horizon {
    pub fn new(label: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Horizon {
            label: label.into(),
            start,
            end,
        }
    }

    /// Build the standard horizon set anchored at a run's first valid day.
    pub fn forecast_set(first_valid_day: NaiveDate) -> Vec<Horizon> {
        FORECAST_HORIZONS
            .iter()
            .map(|spec| {
                Horizon::new(
                    spec.label,
                    first_valid_day + Duration::days(spec.first_offset),
                    first_valid_day + Duration::days(spec.last_offset),
                )
            })
            .collect()
    }

    /// Number of calendar days in the range (0 if end precedes start).
    pub fn len_days(&self) -> usize {
        let days = (self.end - self.start).num_days() + 1;
        days.max(0) as usize
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.start <= *date && *date <= self.end
    }

    /// Every date of the horizon, start through end.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start
            .iter_days()
            .take_while(move |day| *day <= self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::Horizon;
    use chrono::NaiveDate;

    #[test]
    fn test_forecast_set_offsets() {
        let first = NaiveDate::from_ymd_opt(2025, 1, 13).unwrap();
        let horizons = Horizon::forecast_set(first);
        assert_eq!(horizons.len(), 3);
        assert_eq!(horizons[0].label, "Day 1-3");
        assert_eq!(horizons[0].start, first);
        assert_eq!(horizons[0].end, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(horizons[1].start, NaiveDate::from_ymd_opt(2025, 1, 16).unwrap());
        assert_eq!(horizons[1].end, NaiveDate::from_ymd_opt(2025, 1, 19).unwrap());
        assert_eq!(horizons[2].start, NaiveDate::from_ymd_opt(2025, 1, 20).unwrap());
        assert_eq!(horizons[2].end, NaiveDate::from_ymd_opt(2025, 1, 26).unwrap());
        let total: usize = horizons.iter().map(Horizon::len_days).sum();
        assert_eq!(total, 14);
    }

    #[test]
    fn test_days_across_year_end() {
        let horizon = Horizon::new(
            "Day 1-3",
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
        );
        let days: Vec<NaiveDate> = horizon.days().collect();
        assert_eq!(days.len(), 3);
        assert_eq!(horizon.len_days(), 3);
        assert!(horizon.contains(&NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        assert!(!horizon.contains(&NaiveDate::from_ymd_opt(2025, 1, 3).unwrap()));
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let horizon = Horizon::new(
            "empty",
            NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
        );
        assert_eq!(horizon.len_days(), 0);
        assert_eq!(horizon.days().count(), 0);
    }
}
