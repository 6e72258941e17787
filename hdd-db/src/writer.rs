//! Writes one orchestrator pass in a single transaction.

use crate::Database;
use hdd_core::record::{RecordSpan, RunResults};
use hdd_utils::dates::{format_date, format_timestamp};
use rusqlite::params;

impl Database {
    /// Insert every record and comparison of a pass. Either all rows are
    /// committed or none are.
    pub(crate) fn write_results(&self, results: &RunResults) -> anyhow::Result<()> {
        let mut conn = self.conn.borrow_mut();
        let tx = conn.transaction()?;
        {
            let mut insert_record = tx.prepare(
                "INSERT INTO hdd_records (run_time, region, horizon_label, horizon_start,
                     horizon_end, valid_time, value, source, data_type, winter_year)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for record in &results.records {
                let (label, start, end, valid_time) = match &record.span {
                    RecordSpan::Horizon(horizon) => (
                        Some(horizon.label.as_str()),
                        Some(format_date(&horizon.start)),
                        Some(format_date(&horizon.end)),
                        None,
                    ),
                    RecordSpan::ValidTime(time) => {
                        (None, None, None, Some(format_timestamp(&time.and_utc())))
                    }
                };
                insert_record.execute(params![
                    format_timestamp(&record.run_time),
                    record.region,
                    label,
                    start,
                    end,
                    valid_time,
                    record.value,
                    record.source.as_str(),
                    record.data_type.as_str(),
                    record.winter_year,
                ])?;
            }

            let mut insert_comparison = tx.prepare(
                "INSERT INTO comparisons (forecast_run_time, region, horizon_label,
                     horizon_start, horizon_end, kind, delta)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for comparison in &results.comparisons {
                insert_comparison.execute(params![
                    format_timestamp(&comparison.forecast_run_time),
                    comparison.region,
                    comparison.horizon.label,
                    format_date(&comparison.horizon.start),
                    format_date(&comparison.horizon.end),
                    comparison.kind.as_str(),
                    comparison.delta,
                ])?;
            }
        }
        tx.commit()?;
        log::info!(
            "writer: stored {} records, {} comparisons",
            results.records.len(),
            results.comparisons.len()
        );
        Ok(())
    }
}
