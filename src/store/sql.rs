//! Catalog queries over a pooled SQL connection.
//!
//! The three supported dialects differ in placeholder syntax, column types
//! (MySQL keeps names in blobs) and date arithmetic. Each query casts its
//! columns to 64-bit integers and text so a single decoding path serves them
//! all through the `Any` driver.
//!
//! Catalog timestamps carry no zone. Every dialect converts them to epoch
//! seconds as if they were UTC, independent of the session time zone.

use super::{day_bounds, discovery_since, Dialect, JobStore, JobSummary, FULL_LEVEL};
use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::status::TerminationStatus;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::AnyPool;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Format timestamps are bound with; matches the catalog's DATETIME text.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stands in for the quoted codes of [`TerminationStatus::SUCCESSFUL`].
const SUCCESSFUL_PLACEHOLDER: &str = "{successful}";

type JobRow = (String, i64, i64, i64, Option<i64>);

/// One statement per store operation. The static tables hold templates,
/// a store holds them rendered.
struct Queries<S> {
    list_clients: S,
    total_bytes: S,
    total_files: S,
    last_job: S,
    last_full_job: S,
    last_job_status: S,
    scheduled_jobs: S,
}

static POSTGRES_QUERIES: Queries<&str> = Queries {
    list_clients: "SELECT DISTINCT CAST(Name AS TEXT) AS Name FROM Job \
                   WHERE SchedTime >= CAST($1 AS TIMESTAMP) ORDER BY Name",
    total_bytes: "SELECT CAST(COALESCE(SUM(JobBytes), 0) AS BIGINT) FROM Job \
                  WHERE Name = $1 AND JobStatus IN ({successful})",
    total_files: "SELECT CAST(COALESCE(SUM(JobFiles), 0) AS BIGINT) FROM Job \
                  WHERE Name = $1 AND JobStatus IN ({successful})",
    last_job: "SELECT CAST(Level AS TEXT), CAST(JobBytes AS BIGINT), CAST(JobFiles AS BIGINT), \
               CAST(JobErrors AS BIGINT), CAST(EXTRACT(EPOCH FROM StartTime) AS BIGINT) FROM Job \
               WHERE Name = $1 AND JobStatus IN ({successful}) AND StartTime IS NOT NULL \
               ORDER BY StartTime DESC LIMIT 1",
    last_full_job: "SELECT CAST(Level AS TEXT), CAST(JobBytes AS BIGINT), CAST(JobFiles AS BIGINT), \
                    CAST(JobErrors AS BIGINT), CAST(EXTRACT(EPOCH FROM StartTime) AS BIGINT) FROM Job \
                    WHERE Name = $1 AND Level = $2 AND JobStatus IN ({successful}) \
                    AND StartTime IS NOT NULL ORDER BY StartTime DESC LIMIT 1",
    last_job_status: "SELECT CAST(JobStatus AS TEXT) FROM Job WHERE Name = $1 \
                      ORDER BY JobId DESC LIMIT 1",
    scheduled_jobs: "SELECT CAST(COUNT(*) AS BIGINT) FROM Job WHERE Name = $1 \
                     AND SchedTime >= CAST($2 AS TIMESTAMP) AND SchedTime < CAST($3 AS TIMESTAMP)",
};

static MYSQL_QUERIES: Queries<&str> = Queries {
    list_clients: "SELECT DISTINCT CAST(Name AS CHAR) AS ClientName FROM Job \
                   WHERE SchedTime >= ? ORDER BY ClientName",
    total_bytes: "SELECT CAST(COALESCE(SUM(JobBytes), 0) AS SIGNED) FROM Job \
                  WHERE Name = ? AND JobStatus IN ({successful})",
    total_files: "SELECT CAST(COALESCE(SUM(JobFiles), 0) AS SIGNED) FROM Job \
                  WHERE Name = ? AND JobStatus IN ({successful})",
    last_job: "SELECT CAST(Level AS CHAR), CAST(JobBytes AS SIGNED), CAST(JobFiles AS SIGNED), \
               CAST(JobErrors AS SIGNED), TIMESTAMPDIFF(SECOND, '1970-01-01 00:00:00', StartTime) FROM Job \
               WHERE Name = ? AND JobStatus IN ({successful}) AND StartTime IS NOT NULL \
               ORDER BY StartTime DESC LIMIT 1",
    last_full_job: "SELECT CAST(Level AS CHAR), CAST(JobBytes AS SIGNED), CAST(JobFiles AS SIGNED), \
                    CAST(JobErrors AS SIGNED), TIMESTAMPDIFF(SECOND, '1970-01-01 00:00:00', StartTime) FROM Job \
                    WHERE Name = ? AND Level = ? AND JobStatus IN ({successful}) \
                    AND StartTime IS NOT NULL ORDER BY StartTime DESC LIMIT 1",
    last_job_status: "SELECT CAST(JobStatus AS CHAR) FROM Job WHERE Name = ? \
                      ORDER BY JobId DESC LIMIT 1",
    scheduled_jobs: "SELECT CAST(COUNT(*) AS SIGNED) FROM Job WHERE Name = ? \
                     AND SchedTime >= ? AND SchedTime < ?",
};

static SQLITE_QUERIES: Queries<&str> = Queries {
    list_clients: "SELECT DISTINCT Name FROM Job WHERE SchedTime >= ? ORDER BY Name",
    total_bytes: "SELECT CAST(COALESCE(SUM(JobBytes), 0) AS INTEGER) FROM Job \
                  WHERE Name = ? AND JobStatus IN ({successful})",
    total_files: "SELECT CAST(COALESCE(SUM(JobFiles), 0) AS INTEGER) FROM Job \
                  WHERE Name = ? AND JobStatus IN ({successful})",
    last_job: "SELECT Level, JobBytes, JobFiles, JobErrors, \
               CAST(strftime('%s', StartTime) AS INTEGER) FROM Job \
               WHERE Name = ? AND JobStatus IN ({successful}) AND StartTime IS NOT NULL \
               ORDER BY StartTime DESC LIMIT 1",
    last_full_job: "SELECT Level, JobBytes, JobFiles, JobErrors, \
                    CAST(strftime('%s', StartTime) AS INTEGER) FROM Job \
                    WHERE Name = ? AND Level = ? AND JobStatus IN ({successful}) \
                    AND StartTime IS NOT NULL ORDER BY StartTime DESC LIMIT 1",
    last_job_status: "SELECT JobStatus FROM Job WHERE Name = ? ORDER BY JobId DESC LIMIT 1",
    scheduled_jobs: "SELECT COUNT(*) FROM Job WHERE Name = ? AND SchedTime >= ? AND SchedTime < ?",
};

impl Queries<&'static str> {
    fn render(&self) -> Queries<String> {
        let successful = successful_codes();
        let render = |sql: &str| sql.replace(SUCCESSFUL_PLACEHOLDER, &successful);
        Queries {
            list_clients: render(self.list_clients),
            total_bytes: render(self.total_bytes),
            total_files: render(self.total_files),
            last_job: render(self.last_job),
            last_full_job: render(self.last_full_job),
            last_job_status: render(self.last_job_status),
            scheduled_jobs: render(self.scheduled_jobs),
        }
    }
}

/// Quoted codes of the successful statuses, as in `'T', 'W'`.
fn successful_codes() -> String {
    TerminationStatus::ALL
        .iter()
        .filter(|status| status.is_successful())
        .map(|status| format!("'{}'", status.code()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Dialect {
    fn templates(self) -> &'static Queries<&'static str> {
        match self {
            Dialect::Postgres => &POSTGRES_QUERIES,
            Dialect::Mysql => &MYSQL_QUERIES,
            Dialect::Sqlite => &SQLITE_QUERIES,
        }
    }
}

/// [`JobStore`] reading the Bareos catalog through a connection pool.
#[derive(Clone)]
pub struct SqlJobStore {
    pool: AnyPool,
    dialect: Dialect,
    queries: Arc<Queries<String>>,
}

impl SqlJobStore {
    /// Open a connection pool to the catalog.
    ///
    /// Fails on an unknown dialect or when the database cannot be reached.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let dialect = config.dialect()?;
        install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.query_timeout())
            .connect(&config.url)
            .await?;

        info!(?dialect, "Connected to catalog database");
        Ok(Self::from_pool(pool, dialect))
    }

    pub fn from_pool(pool: AnyPool, dialect: Dialect) -> Self {
        Self {
            pool,
            dialect,
            queries: Arc::new(dialect.templates().render()),
        }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn queries(&self) -> &Queries<String> {
        &self.queries
    }

    async fn fetch_count(&self, sql: &str, client: &str) -> Result<u64> {
        let value: i64 = sqlx::query_scalar(sql)
            .bind(client)
            .fetch_one(&self.pool)
            .await?;
        Ok(non_negative(value))
    }

    async fn fetch_job(
        &self,
        sql: &str,
        client: &str,
        level: Option<&str>,
    ) -> Result<Option<JobSummary>> {
        let mut query = sqlx::query_as::<_, JobRow>(sql).bind(client);
        if let Some(level) = level {
            query = query.bind(level);
        }

        let row = query.fetch_optional(&self.pool).await?;
        Ok(row.map(|(level, bytes, files, errors, start_time)| JobSummary {
            level,
            bytes: non_negative(bytes),
            files: non_negative(files),
            errors: non_negative(errors),
            start_time: start_time.unwrap_or_default(),
        }))
    }
}

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

#[async_trait]
impl JobStore for SqlJobStore {
    async fn list_clients(&self, now: NaiveDateTime) -> Result<Vec<String>> {
        let since = format_timestamp(discovery_since(now));
        debug!("Listing clients scheduled since {}", since);

        let names: Vec<String> = sqlx::query_scalar(&self.queries().list_clients)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        Ok(names
            .into_iter()
            .filter(|name| {
                let keep = !name.trim().is_empty();
                if !keep {
                    warn!("Skipping job with an empty name");
                }
                keep
            })
            .collect())
    }

    async fn total_bytes(&self, client: &str) -> Result<u64> {
        self.fetch_count(&self.queries().total_bytes, client).await
    }

    async fn total_files(&self, client: &str) -> Result<u64> {
        self.fetch_count(&self.queries().total_files, client).await
    }

    async fn last_job(&self, client: &str) -> Result<Option<JobSummary>> {
        self.fetch_job(&self.queries().last_job, client, None).await
    }

    async fn last_full_job(&self, client: &str) -> Result<Option<JobSummary>> {
        self.fetch_job(&self.queries().last_full_job, client, Some(FULL_LEVEL))
            .await
    }

    async fn last_job_status(&self, client: &str) -> Result<Option<TerminationStatus>> {
        let code: Option<String> = sqlx::query_scalar(&self.queries().last_job_status)
            .bind(client)
            .fetch_optional(&self.pool)
            .await?;

        let Some(code) = code else {
            return Ok(None);
        };

        let status = code.trim().chars().next().and_then(TerminationStatus::from_code);
        if status.is_none() {
            warn!(client, code = %code, "Unknown job termination status");
        }
        Ok(status)
    }

    async fn scheduled_jobs(&self, client: &str, now: NaiveDateTime) -> Result<u64> {
        let (start, end) = day_bounds(now);
        let value: i64 = sqlx::query_scalar(&self.queries().scheduled_jobs)
            .bind(client)
            .bind(format_timestamp(start))
            .bind(format_timestamp(end))
            .fetch_one(&self.pool)
            .await?;
        Ok(non_negative(value))
    }
}
