//! Scrape-time collection of backup facts.
//!
//! Every call to [`BackupCollector::collect`] discovers the active clients,
//! fetches the facts of each client from the [`JobStore`] and turns them into
//! one [`Sample`] per declared metric and label combination. Nothing is kept
//! between calls.
//!
//! Failures are scoped: when client discovery fails the whole cycle fails,
//! while a failing fact only zeroes that fact for that client and is
//! reported in [`Scrape::failures`].

use crate::descriptors::{DescriptorRegistry, MetricId};
use crate::error::{ExporterError, Result};
use crate::status::TerminationStatus;
use crate::store::{JobStore, JobSummary};
use chrono::{Local, NaiveDateTime};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Level label used when a client has no successful job.
pub const UNKNOWN_LEVEL: &str = "unknown";

/// Tuning of a collection cycle.
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    /// Upper bound of a single store round trip
    pub query_timeout: Duration,
    /// Upper bound of a whole cycle
    pub scrape_timeout: Duration,
    /// Clients fetched in parallel
    pub concurrency: usize,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(5),
            scrape_timeout: Duration::from_secs(30),
            concurrency: 4,
        }
    }
}

/// A per-client fact fetched from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fact {
    TotalBytes,
    TotalFiles,
    LastJob,
    LastFullJob,
    LastJobStatus,
    ScheduledJobs,
}

impl Fact {
    pub const ALL: [Fact; 6] = [
        Fact::TotalBytes,
        Fact::TotalFiles,
        Fact::LastJob,
        Fact::LastFullJob,
        Fact::LastJobStatus,
        Fact::ScheduledJobs,
    ];

    /// Name of the store operation answering this fact.
    pub fn operation(self) -> &'static str {
        match self {
            Fact::TotalBytes => "TotalBytes",
            Fact::TotalFiles => "TotalFiles",
            Fact::LastJob => "LastJob",
            Fact::LastFullJob => "LastFullJob",
            Fact::LastJobStatus => "LastJobStatus",
            Fact::ScheduledJobs => "ScheduledJobs",
        }
    }
}

/// One value of one metric, with label values in descriptor order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: MetricId,
    pub labels: Vec<String>,
    pub value: f64,
}

/// A fact that could not be fetched and was zeroed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub client: String,
    pub fact: Fact,
    pub message: String,
}

/// Outcome of one collection cycle.
#[derive(Debug, Clone, Default)]
pub struct Scrape {
    pub samples: Vec<Sample>,
    pub failures: Vec<FetchFailure>,
}

impl Scrape {
    pub fn samples_for(&self, metric: MetricId) -> impl Iterator<Item = &Sample> {
        self.samples.iter().filter(move |s| s.metric == metric)
    }

    /// Value of the sample with exactly these label values.
    pub fn value(&self, metric: MetricId, labels: &[&str]) -> Option<f64> {
        self.samples_for(metric)
            .find(|s| s.labels == labels)
            .map(|s| s.value)
    }
}

#[derive(Debug, Default)]
struct ClientFacts {
    total_bytes: u64,
    total_files: u64,
    last_job: Option<JobSummary>,
    last_full_job: Option<JobSummary>,
    last_status: Option<TerminationStatus>,
    scheduled_jobs: u64,
}

/// Builds samples for every declared metric from the job store.
#[derive(Clone)]
pub struct BackupCollector {
    store: Arc<dyn JobStore>,
    registry: Arc<DescriptorRegistry>,
    options: CollectorOptions,
}

impl BackupCollector {
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<DescriptorRegistry>,
        options: CollectorOptions,
    ) -> Self {
        Self {
            store,
            registry,
            options,
        }
    }

    /// Descriptors of every metric this collector emits.
    pub fn describe(&self) -> &DescriptorRegistry {
        &self.registry
    }

    /// Run a collection cycle against the current local time.
    pub async fn collect(&self) -> Result<Scrape> {
        self.collect_at(Local::now().naive_local()).await
    }

    /// Run a collection cycle with `now` as the reference time of every
    /// time-filtered query.
    pub async fn collect_at(&self, now: NaiveDateTime) -> Result<Scrape> {
        let deadline = Instant::now() + self.options.scrape_timeout;

        let clients = match self
            .bounded(deadline, "ListClients", self.store.list_clients(now))
            .await
        {
            Ok(clients) => clients,
            Err(e) => {
                error!(method = "ListClients", "Client discovery failed: {}", e);
                return Err(ExporterError::Discovery(Box::new(e)));
            }
        };
        debug!("Discovered {} clients", clients.len());

        let fetched: Vec<(String, ClientFacts, Vec<FetchFailure>)> = stream::iter(clients)
            .map(|client| async move {
                let (facts, failures) = self.fetch_client(&client, now, deadline).await;
                (client, facts, failures)
            })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut scrape = Scrape::default();
        for (client, facts, failures) in fetched {
            self.emit(&client, &facts, &mut scrape.samples);
            scrape.failures.extend(failures);
        }

        info!(
            samples = scrape.samples.len(),
            failures = scrape.failures.len(),
            "Collection cycle finished"
        );
        Ok(scrape)
    }

    async fn fetch_client(
        &self,
        client: &str,
        now: NaiveDateTime,
        deadline: Instant,
    ) -> (ClientFacts, Vec<FetchFailure>) {
        let store = self.store.as_ref();
        let (total_bytes, total_files, last_job, last_full_job, last_status, scheduled_jobs) = tokio::join!(
            self.bounded(deadline, Fact::TotalBytes.operation(), store.total_bytes(client)),
            self.bounded(deadline, Fact::TotalFiles.operation(), store.total_files(client)),
            self.bounded(deadline, Fact::LastJob.operation(), store.last_job(client)),
            self.bounded(deadline, Fact::LastFullJob.operation(), store.last_full_job(client)),
            self.bounded(deadline, Fact::LastJobStatus.operation(), store.last_job_status(client)),
            self.bounded(deadline, Fact::ScheduledJobs.operation(), store.scheduled_jobs(client, now)),
        );

        let mut failures = Vec::new();
        let facts = ClientFacts {
            total_bytes: isolate(client, Fact::TotalBytes, total_bytes, &mut failures),
            total_files: isolate(client, Fact::TotalFiles, total_files, &mut failures),
            last_job: isolate(client, Fact::LastJob, last_job, &mut failures),
            last_full_job: isolate(client, Fact::LastFullJob, last_full_job, &mut failures),
            last_status: isolate(client, Fact::LastJobStatus, last_status, &mut failures),
            scheduled_jobs: isolate(client, Fact::ScheduledJobs, scheduled_jobs, &mut failures),
        };
        (facts, failures)
    }

    /// Await `fut` until the per-query timeout or the cycle deadline,
    /// whichever comes first.
    async fn bounded<T>(
        &self,
        deadline: Instant,
        operation: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let started = Instant::now();
        let limit = deadline.min(started + self.options.query_timeout);

        match tokio::time::timeout_at(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(ExporterError::Timeout {
                operation,
                after: limit.saturating_duration_since(started),
            }),
        }
    }

    fn emit(&self, client: &str, facts: &ClientFacts, samples: &mut Vec<Sample>) {
        let mut push = |metric: MetricId, labels: &[&str], value: f64| {
            debug_assert_eq!(labels.len(), self.registry.get(metric).labels.len());
            samples.push(Sample {
                metric,
                labels: labels.iter().map(|l| l.to_string()).collect(),
                value,
            });
        };

        push(MetricId::FilesSaved, &[client], facts.total_files as f64);
        push(MetricId::BytesSaved, &[client], facts.total_bytes as f64);

        let last = facts.last_job.clone().unwrap_or_default();
        let level = if last.level.trim().is_empty() {
            UNKNOWN_LEVEL
        } else {
            last.level.as_str()
        };
        push(MetricId::LastJobBytes, &[client, level], last.bytes as f64);
        push(MetricId::LastJobFiles, &[client, level], last.files as f64);
        push(MetricId::LastJobErrors, &[client, level], last.errors as f64);
        push(MetricId::LastJobTimestamp, &[client, level], last.start_time as f64);

        for status in TerminationStatus::ALL {
            let value = if facts.last_status == Some(status) { 1.0 } else { 0.0 };
            push(MetricId::LastJobStatus, &[client, status.label()], value);
        }

        let full = facts.last_full_job.clone().unwrap_or_default();
        push(MetricId::LastFullJobBytes, &[client], full.bytes as f64);
        push(MetricId::LastFullJobFiles, &[client], full.files as f64);
        push(MetricId::LastFullJobErrors, &[client], full.errors as f64);
        push(MetricId::LastFullJobTimestamp, &[client], full.start_time as f64);

        push(MetricId::ScheduledJobs, &[client], facts.scheduled_jobs as f64);
    }
}

/// Unwrap a fact, or log and record the failure and fall back to zero.
fn isolate<T: Default>(
    client: &str,
    fact: Fact,
    result: Result<T>,
    failures: &mut Vec<FetchFailure>,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!(client, method = fact.operation(), "Failed to fetch fact: {}", e);
            failures.push(FetchFailure {
                client: client.to_string(),
                fact,
                message: e.to_string(),
            });
            T::default()
        }
    }
}
