//! SQL schema for the HDD store.
//!
//! Applied as a single batch every time a database is opened; every statement
//! is `IF NOT EXISTS`, there are no migrations.

/// Returns the full SQL schema as a single batch string.
///
/// - `hdd_records` - one population-weighted value per (run, region, span).
///   Forecast horizon rows fill the `horizon_*` columns; forecast day rows
///   and observation rows fill `valid_time`.
/// - `comparisons` - forecast deltas against the baseline and the previous run.
///
/// Timestamps are stored as `YYYY-MM-DDTHH:MM:SSZ`, dates as `YYYY-MM-DD`.
pub fn create_schema() -> &'static str {
    r#"
    CREATE TABLE IF NOT EXISTS hdd_records (
        run_time TEXT NOT NULL,
        region TEXT NOT NULL,
        horizon_label TEXT,
        horizon_start TEXT,
        horizon_end TEXT,
        valid_time TEXT,
        value REAL NOT NULL,
        source TEXT NOT NULL,
        data_type TEXT NOT NULL,
        winter_year INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_hdd_run_source ON hdd_records(run_time, source);
    CREATE INDEX IF NOT EXISTS idx_hdd_valid_time ON hdd_records(valid_time);

    CREATE TABLE IF NOT EXISTS comparisons (
        forecast_run_time TEXT NOT NULL,
        region TEXT NOT NULL,
        horizon_label TEXT NOT NULL,
        horizon_start TEXT NOT NULL,
        horizon_end TEXT NOT NULL,
        kind TEXT NOT NULL,
        delta REAL NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_cmp_run ON comparisons(forecast_run_time);
    "#
}
