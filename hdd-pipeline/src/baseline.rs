use anyhow::Context;
use chrono::NaiveDate;
use hdd_compute::ClimatologyBuilder;
use hdd_db::Database;
use log::info;
use std::path::Path;

/// First and last day of a range of winter years (June 1 to May 31).
pub fn winter_year_bounds(start_year: i32, end_year: i32) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    if end_year < start_year {
        anyhow::bail!("end year {end_year} precedes start year {start_year}");
    }
    let start = NaiveDate::from_ymd_opt(start_year, 6, 1).context("start year out of range")?;
    let end = NaiveDate::from_ymd_opt(end_year + 1, 5, 31).context("end year out of range")?;
    Ok((start, end))
}

/// Average stored observations of the given winter years into a climatology CSV.
pub fn build_baseline(
    database: &Path,
    start_year: i32,
    end_year: i32,
    output: &Path,
) -> anyhow::Result<()> {
    let db = Database::open(database)
        .with_context(|| format!("opening {}", database.display()))?;
    let climatology = baseline_from(&db, start_year, end_year)?;
    climatology
        .write_csv(output)
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}

fn baseline_from(
    db: &Database,
    start_year: i32,
    end_year: i32,
) -> anyhow::Result<hdd_compute::Climatology> {
    let (start, end) = winter_year_bounds(start_year, end_year)?;
    let observations = db.observations_between(&start, &end)?;
    info!(
        "building baseline from {} observations, {start} to {end}",
        observations.len()
    );
    let mut builder = ClimatologyBuilder::new();
    for record in &observations {
        builder.add_record(record);
    }
    builder
        .build()
        .with_context(|| format!("winter years {start_year} to {end_year}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use hdd_core::record::{HddRecord, RunResults, Source};
    use hdd_core::repository::Repository;
    use hdd_core::US_MEAN;

    #[test]
    fn bounds_cover_whole_seasons() {
        let (start, end) = winter_year_bounds(1991, 2020).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(1991, 6, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2021, 5, 31).unwrap());
        assert!(winter_year_bounds(2020, 1991).is_err());
    }

    #[test]
    fn baseline_from_stored_observations() {
        let db = Database::new().unwrap();
        let (start, end) = winter_year_bounds(2022, 2023).unwrap();
        let records: Vec<HddRecord> = start
            .iter_days()
            .take_while(|day| *day <= end)
            .map(|day| {
                let midnight = day.and_hms_opt(0, 0, 0).unwrap();
                let value = if day.month0() < 6 { 30.0 } else { 2.0 };
                HddRecord::observation(midnight.and_utc(), US_MEAN, midnight, value, Source::Era5Land)
            })
            .collect();
        db.insert_results(&RunResults::new(records)).unwrap();

        let climatology = baseline_from(&db, 2022, 2023).unwrap();
        let january = NaiveDate::from_ymd_opt(2030, 1, 15).unwrap();
        assert_eq!(climatology.value(US_MEAN, &january), Some(30.0));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.csv");
        climatology.write_csv(&path).unwrap();
        assert!(path.exists());
    }
}
