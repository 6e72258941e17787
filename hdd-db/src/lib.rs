//! SQLite persistence for HDD records and forecast comparisons.
//!
//! # Architecture
//!
//! - `Rc<RefCell<Connection>>` wrapper, shared by every orchestrator of a
//!   single-threaded runner
//! - File-backed SQLite for the service, in-memory SQLite for tests
//! - Schema applied with `CREATE TABLE IF NOT EXISTS` on open
//!
//! # Usage
//!
//! ```rust
//! use hdd_db::Database;
//!
//! let db = Database::new().unwrap();
//! assert_eq!(db.count_records().unwrap(), 0);
//! ```
//!
//! # Tables
//!
//! See [`schema::create_schema`] for the full SQL schema.

pub mod schema;
mod queries;
mod writer;

use chrono::{DateTime, Utc};
use hdd_core::record::{HddRecord, RunResults, Source};
use hdd_core::repository::Repository;
use rusqlite::Connection;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// Handle on the HDD store. Clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: Rc<RefCell<Connection>>,
}

impl Database {
    /// Create a new in-memory database with the full schema applied.
    pub fn new() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    /// Open (creating if needed) a database file.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        log::info!("opened database {}", path.display());
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch(schema::create_schema())?;
        Ok(Self {
            conn: Rc::new(RefCell::new(conn)),
        })
    }
}

impl Repository for Database {
    fn exists_for_date(&self, run_time: DateTime<Utc>, source: Source) -> anyhow::Result<bool> {
        self.has_records(&run_time, source)
    }

    fn get_forecast(&self, run_time: DateTime<Utc>) -> anyhow::Result<Option<Vec<HddRecord>>> {
        let records = self.forecast_records(&run_time)?;
        Ok((!records.is_empty()).then_some(records))
    }

    fn insert_results(&self, results: &RunResults) -> anyhow::Result<()> {
        self.write_results(results)
    }
}
