//! Prometheus exposition of collected samples.
//!
//! The [`MetricsSink`] owns the Prometheus registry. On every scrape it clears
//! the vectors declared by the descriptor registry, runs the collector and
//! writes the fresh samples, so clients that disappeared from the catalog
//! vanish from the output.

use crate::collector::{BackupCollector, Fact, Scrape};
use crate::descriptors::{MetricDescriptor, MetricKind};
use crate::error::{ExporterError, Result};
use prometheus::{CounterVec, Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::debug;

/// A labelled Prometheus vector for one descriptor.
#[derive(Clone)]
enum MetricVec {
    Counter(CounterVec),
    Gauge(GaugeVec),
}

impl MetricVec {
    fn new(namespace: &str, descriptor: &MetricDescriptor) -> Result<Self> {
        let opts = Opts::new(descriptor.name, descriptor.help).namespace(namespace);
        Ok(match descriptor.kind {
            MetricKind::Counter => MetricVec::Counter(CounterVec::new(opts, descriptor.labels)?),
            MetricKind::Gauge => MetricVec::Gauge(GaugeVec::new(opts, descriptor.labels)?),
        })
    }

    fn register(&self, registry: &Registry) -> Result<()> {
        match self {
            MetricVec::Counter(v) => registry.register(Box::new(v.clone()))?,
            MetricVec::Gauge(v) => registry.register(Box::new(v.clone()))?,
        }
        Ok(())
    }

    fn reset(&self) {
        match self {
            MetricVec::Counter(v) => v.reset(),
            MetricVec::Gauge(v) => v.reset(),
        }
    }

    fn set(&self, labels: &[&str], value: f64) {
        match self {
            // Vectors are reset before each scrape, so this sets the counter.
            MetricVec::Counter(v) => v.with_label_values(labels).inc_by(value),
            MetricVec::Gauge(v) => v.with_label_values(labels).set(value),
        }
    }
}

/// Serves the collector's samples in the Prometheus text format.
pub struct MetricsSink {
    collector: BackupCollector,
    registry: Registry,
    vecs: Vec<MetricVec>,
    scrape_lock: Mutex<()>,

    // Exporter metrics
    up: Gauge,
    fact_fetch_failures: GaugeVec,
    scrape_duration_seconds: Gauge,
}

impl MetricsSink {
    /// Create a sink exposing every metric the collector describes under
    /// `namespace`.
    pub fn new(collector: BackupCollector, namespace: &str) -> Result<Self> {
        let registry = Registry::new();

        let vecs = collector
            .describe()
            .iter()
            .map(|descriptor| -> Result<MetricVec> {
                let vec = MetricVec::new(namespace, descriptor)?;
                vec.register(&registry)?;
                Ok(vec)
            })
            .collect::<Result<Vec<_>>>()?;

        let up = Gauge::with_opts(
            Opts::new(
                "up",
                "Whether client discovery succeeded on the last scrape (1 = success, 0 = failure)",
            )
            .namespace(namespace),
        )?;
        registry.register(Box::new(up.clone()))?;

        let fact_fetch_failures = GaugeVec::new(
            Opts::new(
                "fact_fetch_failures",
                "Catalog queries that failed during the last scrape",
            )
            .namespace(namespace),
            &["method"],
        )?;
        registry.register(Box::new(fact_fetch_failures.clone()))?;

        let scrape_duration_seconds = Gauge::with_opts(
            Opts::new(
                "scrape_duration_seconds",
                "Duration of the last scrape in seconds",
            )
            .namespace(namespace),
        )?;
        registry.register(Box::new(scrape_duration_seconds.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            collector,
            registry,
            vecs,
            scrape_lock: Mutex::new(()),
            up,
            fact_fetch_failures,
            scrape_duration_seconds,
        })
    }

    /// Run one collection cycle and publish its samples.
    ///
    /// Returns the discovery error when the cycle produced no samples; the
    /// registry is still updated (`up` = 0).
    pub async fn scrape(&self) -> Result<()> {
        let started = Instant::now();

        for vec in &self.vecs {
            vec.reset();
        }
        for fact in Fact::ALL {
            self.fact_fetch_failures
                .with_label_values(&[fact.operation()])
                .set(0.0);
        }

        let result = match self.collector.collect().await {
            Ok(scrape) => {
                self.publish(&scrape);
                self.up.set(1.0);
                Ok(())
            }
            Err(e) => {
                self.up.set(0.0);
                Err(e)
            }
        };

        self.scrape_duration_seconds
            .set(started.elapsed().as_secs_f64());
        result
    }

    fn publish(&self, scrape: &Scrape) {
        debug!("Publishing {} samples", scrape.samples.len());

        for sample in &scrape.samples {
            let labels: Vec<&str> = sample.labels.iter().map(String::as_str).collect();
            self.vecs[sample.metric as usize].set(&labels, sample.value);
        }

        for failure in &scrape.failures {
            self.fact_fetch_failures
                .with_label_values(&[failure.fact.operation()])
                .inc();
        }
    }

    /// Scrape and encode under a lock, so concurrent requests do not
    /// interleave their resets and writes.
    pub async fn render(&self) -> Result<String> {
        let _guard = self.scrape_lock.lock().await;

        // The collector already logged the cause.
        if let Err(e) = self.scrape().await {
            debug!("Serving metrics of a failed scrape: {}", e);
        }
        self.encode()
    }

    /// Encode metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::with_capacity(8192);
        encoder.encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| ExporterError::Metrics(e.to_string()))
    }
}
