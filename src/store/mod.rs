//! Read-only access to the Bareos job catalog.
//!
//! The collector only talks to the [`JobStore`] trait; [`SqlJobStore`] is the
//! implementation backed by the catalog database.

mod sql;

pub use sql::SqlJobStore;

use crate::error::{ExporterError, Result};
use crate::status::TerminationStatus;
use async_trait::async_trait;
use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use std::str::FromStr;

/// Days a job must have been scheduled within for its client to be listed.
pub const DISCOVERY_WINDOW_DAYS: i64 = 7;

/// Level code of a full backup.
pub const FULL_LEVEL: &str = "F";

/// Summary of a single terminated job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobSummary {
    pub level: String,
    pub bytes: u64,
    pub files: u64,
    pub errors: u64,
    /// Start time in seconds since the epoch
    pub start_time: i64,
}

/// The catalog queries the collector needs.
///
/// Time-filtered queries receive the reference timestamp of the scrape so
/// that every fact of one cycle uses the same notion of "now".
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Clients with a job scheduled within the last [`DISCOVERY_WINDOW_DAYS`].
    async fn list_clients(&self, now: NaiveDateTime) -> Result<Vec<String>>;

    /// Bytes saved by all successful jobs of a client.
    async fn total_bytes(&self, client: &str) -> Result<u64>;

    /// Files saved by all successful jobs of a client.
    async fn total_files(&self, client: &str) -> Result<u64>;

    /// Most recent successful job of a client.
    async fn last_job(&self, client: &str) -> Result<Option<JobSummary>>;

    /// Most recent successful full job of a client.
    async fn last_full_job(&self, client: &str) -> Result<Option<JobSummary>>;

    /// Status of the most recent job of a client, whatever its outcome.
    async fn last_job_status(&self, client: &str) -> Result<Option<TerminationStatus>>;

    /// Jobs of a client scheduled on the calendar day of `now`.
    async fn scheduled_jobs(&self, client: &str, now: NaiveDateTime) -> Result<u64>;
}

/// SQL flavour of the catalog database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Mysql,
    Sqlite,
}

impl FromStr for Dialect {
    type Err = ExporterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::Mysql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            _ => Err(ExporterError::UnknownDialect(s.to_string())),
        }
    }
}

/// Lower bound of the client discovery window.
pub fn discovery_since(now: NaiveDateTime) -> NaiveDateTime {
    now - TimeDelta::days(DISCOVERY_WINDOW_DAYS)
}

/// Start (inclusive) and end (exclusive) of the calendar day of `now`.
pub fn day_bounds(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let start = now.date().and_time(NaiveTime::MIN);
    (start, start + TimeDelta::days(1))
}
