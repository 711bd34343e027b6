//! In-memory job store shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bareos_exporter::collector::Fact;
use bareos_exporter::status::TerminationStatus;
use bareos_exporter::store::{JobStore, JobSummary};
use bareos_exporter::{ExporterError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// Facts answered for one client.
#[derive(Debug, Clone, Default)]
pub struct ClientRecord {
    pub total_bytes: u64,
    pub total_files: u64,
    pub last_job: Option<JobSummary>,
    pub last_full_job: Option<JobSummary>,
    pub last_status: Option<TerminationStatus>,
    pub scheduled_jobs: u64,
}

#[derive(Default)]
pub struct FakeStore {
    clients: Vec<(String, ClientRecord)>,
    discovery_fails: bool,
    discovery_delay: Option<Duration>,
    failing: HashSet<(String, Fact)>,
    delays: HashMap<(String, Fact), Duration>,
    seen_now: Mutex<Vec<NaiveDateTime>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, name: &str, record: ClientRecord) -> Self {
        self.clients.push((name.to_string(), record));
        self
    }

    pub fn failing_discovery(mut self) -> Self {
        self.discovery_fails = true;
        self
    }

    pub fn delayed_discovery(mut self, delay: Duration) -> Self {
        self.discovery_delay = Some(delay);
        self
    }

    pub fn failing(mut self, client: &str, fact: Fact) -> Self {
        self.failing.insert((client.to_string(), fact));
        self
    }

    pub fn delayed(mut self, client: &str, fact: Fact, delay: Duration) -> Self {
        self.delays.insert((client.to_string(), fact), delay);
        self
    }

    /// Reference timestamps received by time-filtered queries.
    pub fn seen_now(&self) -> Vec<NaiveDateTime> {
        self.seen_now.lock().unwrap().clone()
    }

    fn record(&self, client: &str) -> ClientRecord {
        self.clients
            .iter()
            .find(|(name, _)| name == client)
            .map(|(_, record)| record.clone())
            .unwrap_or_default()
    }

    async fn check(&self, client: &str, fact: Fact) -> Result<()> {
        let key = (client.to_string(), fact);
        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&key) {
            return Err(ExporterError::Database(sqlx::Error::Protocol(format!(
                "{} failed for {}",
                fact.operation(),
                client
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for FakeStore {
    async fn list_clients(&self, now: NaiveDateTime) -> Result<Vec<String>> {
        self.seen_now.lock().unwrap().push(now);
        if let Some(delay) = self.discovery_delay {
            tokio::time::sleep(delay).await;
        }
        if self.discovery_fails {
            return Err(ExporterError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.clients.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn total_bytes(&self, client: &str) -> Result<u64> {
        self.check(client, Fact::TotalBytes).await?;
        Ok(self.record(client).total_bytes)
    }

    async fn total_files(&self, client: &str) -> Result<u64> {
        self.check(client, Fact::TotalFiles).await?;
        Ok(self.record(client).total_files)
    }

    async fn last_job(&self, client: &str) -> Result<Option<JobSummary>> {
        self.check(client, Fact::LastJob).await?;
        Ok(self.record(client).last_job)
    }

    async fn last_full_job(&self, client: &str) -> Result<Option<JobSummary>> {
        self.check(client, Fact::LastFullJob).await?;
        Ok(self.record(client).last_full_job)
    }

    async fn last_job_status(&self, client: &str) -> Result<Option<TerminationStatus>> {
        self.check(client, Fact::LastJobStatus).await?;
        Ok(self.record(client).last_status)
    }

    async fn scheduled_jobs(&self, client: &str, now: NaiveDateTime) -> Result<u64> {
        self.seen_now.lock().unwrap().push(now);
        self.check(client, Fact::ScheduledJobs).await?;
        Ok(self.record(client).scheduled_jobs)
    }
}

pub fn job(level: &str, bytes: u64, files: u64, errors: u64, start_time: i64) -> JobSummary {
    JobSummary {
        level: level.to_string(),
        bytes,
        files,
        errors,
        start_time,
    }
}

/// A client with every fact populated.
pub fn healthy_client() -> ClientRecord {
    ClientRecord {
        total_bytes: 10_000,
        total_files: 300,
        last_job: Some(job("I", 1_000, 30, 1, 1_703_635_200)),
        last_full_job: Some(job("F", 8_000, 250, 0, 1_703_030_400)),
        last_status: Some(TerminationStatus::Terminated),
        scheduled_jobs: 1,
    }
}

pub fn reference_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 8)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}
