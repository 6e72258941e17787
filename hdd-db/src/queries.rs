//! Typed reads from the HDD store.

use crate::Database;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use hdd_core::horizon::Horizon;
use hdd_core::record::{ComparisonRecord, DataType, HddRecord, RecordSpan, Source};
use hdd_utils::dates::{format_timestamp, parse_date, parse_stored_timestamp};
use rusqlite::{params, Row};

const RECORD_COLUMNS: &str = "run_time, region, horizon_label, horizon_start, horizon_end,
     valid_time, value, source, data_type, winter_year";

/// A `hdd_records` row as stored, before parsing its text columns.
struct RecordRow {
    run_time: String,
    region: String,
    horizon_label: Option<String>,
    horizon_start: Option<String>,
    horizon_end: Option<String>,
    valid_time: Option<String>,
    value: f64,
    source: String,
    data_type: String,
    winter_year: i32,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RecordRow {
            run_time: row.get(0)?,
            region: row.get(1)?,
            horizon_label: row.get(2)?,
            horizon_start: row.get(3)?,
            horizon_end: row.get(4)?,
            valid_time: row.get(5)?,
            value: row.get(6)?,
            source: row.get(7)?,
            data_type: row.get(8)?,
            winter_year: row.get(9)?,
        })
    }

    fn into_record(self) -> anyhow::Result<HddRecord> {
        let span = match (self.horizon_label, self.horizon_start, self.horizon_end, self.valid_time) {
            (Some(label), Some(start), Some(end), _) => {
                RecordSpan::Horizon(Horizon::new(label, parse_date(&start)?, parse_date(&end)?))
            }
            (_, _, _, Some(valid_time)) => {
                RecordSpan::ValidTime(parse_stored_timestamp(&valid_time)?.naive_utc())
            }
            _ => anyhow::bail!("record for {} has neither horizon nor valid time", self.region),
        };
        Ok(HddRecord {
            run_time: parse_stored_timestamp(&self.run_time)?,
            region: self.region,
            span,
            value: self.value,
            source: self.source.parse()?,
            data_type: self.data_type.parse()?,
            winter_year: self.winter_year,
        })
    }
}

impl Database {
    /// True if any record exists for the run time and source.
    pub fn has_records(&self, run_time: &DateTime<Utc>, source: Source) -> anyhow::Result<bool> {
        let conn = self.conn.borrow();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM hdd_records WHERE run_time = ?1 AND source = ?2)",
            params![format_timestamp(run_time), source.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Forecast records of one run, ordered by region then horizon start.
    pub fn forecast_records(&self, run_time: &DateTime<Utc>) -> anyhow::Result<Vec<HddRecord>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM hdd_records
             WHERE run_time = ?1 AND data_type = ?2
             ORDER BY region, horizon_start"
        ))?;
        let rows = stmt
            .query_map(
                params![format_timestamp(run_time), DataType::Forecast.as_str()],
                RecordRow::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        let records = rows
            .into_iter()
            .map(RecordRow::into_record)
            .collect::<anyhow::Result<Vec<_>>>()
            .with_context(|| format!("decoding forecast run {run_time}"))?;
        log::debug!("query: forecast_records returned {} records", records.len());
        Ok(records)
    }

    /// Observation records with a valid time on a day in `[start, end]`,
    /// ordered by valid time then region.
    pub fn observations_between(
        &self,
        start: &NaiveDate,
        end: &NaiveDate,
    ) -> anyhow::Result<Vec<HddRecord>> {
        let from = format_timestamp(&start.and_time(chrono::NaiveTime::MIN).and_utc());
        let until = format_timestamp(
            &end.and_hms_opt(23, 59, 59)
                .context("end of day")?
                .and_utc(),
        );
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM hdd_records
             WHERE data_type = ?1 AND valid_time >= ?2 AND valid_time <= ?3
             ORDER BY valid_time, region"
        ))?;
        let rows = stmt
            .query_map(
                params![DataType::Observation.as_str(), from, until],
                RecordRow::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        let records = rows
            .into_iter()
            .map(RecordRow::into_record)
            .collect::<anyhow::Result<Vec<_>>>()?;
        log::info!(
            "query: observations_between {start} and {end} returned {} records",
            records.len()
        );
        Ok(records)
    }

    /// Comparison rows of one forecast run.
    pub fn comparisons_for_run(
        &self,
        run_time: &DateTime<Utc>,
    ) -> anyhow::Result<Vec<ComparisonRecord>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(
            "SELECT forecast_run_time, region, horizon_label, horizon_start, horizon_end, kind, delta
             FROM comparisons
             WHERE forecast_run_time = ?1
             ORDER BY kind, region, horizon_start",
        )?;
        let rows = stmt
            .query_map(params![format_timestamp(run_time)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, f64>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(run, region, label, start, end, kind, delta)| -> anyhow::Result<ComparisonRecord> {
                Ok(ComparisonRecord {
                    forecast_run_time: parse_stored_timestamp(&run)?,
                    region,
                    horizon: Horizon::new(label, parse_date(&start)?, parse_date(&end)?),
                    kind: kind.parse()?,
                    delta,
                })
            })
            .collect()
    }

    pub fn count_records(&self) -> anyhow::Result<i64> {
        let conn = self.conn.borrow();
        Ok(conn.query_row("SELECT COUNT(*) FROM hdd_records", [], |row| row.get(0))?)
    }

    pub fn count_comparisons(&self) -> anyhow::Result<i64> {
        let conn = self.conn.borrow();
        Ok(conn.query_row("SELECT COUNT(*) FROM comparisons", [], |row| row.get(0))?)
    }
}
