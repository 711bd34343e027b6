//! # Bareos Exporter
//!
//! A Prometheus metrics exporter for the Bareos backup catalog.
//!
//! ## Overview
//!
//! On every scrape the exporter reads the job catalog and exposes, per
//! client:
//!
//! - Bytes and files saved by all successful jobs
//! - Size, error count, level and start time of the last successful job
//! - The same facts for the last successful full job
//! - The termination status of the last job, one sample per status code
//! - The number of jobs scheduled for the current day
//!
//! ## Quick Start
//!
//! ```no_run
//! use bareos_exporter::{
//!     collector::{BackupCollector, CollectorOptions},
//!     config::Settings,
//!     descriptors::DescriptorRegistry,
//!     metrics::MetricsSink,
//!     server::start_server,
//!     store::SqlJobStore,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load(Some("config/default.toml"))?;
//!     settings.validate()?;
//!
//!     let store = SqlJobStore::connect(&settings.database).await?;
//!     let collector = BackupCollector::new(
//!         Arc::new(store),
//!         Arc::new(DescriptorRegistry::new()),
//!         CollectorOptions::default(),
//!     );
//!     let sink = MetricsSink::new(collector, &settings.exporter.namespace)?;
//!
//!     start_server(&settings.exporter.listen_address, &settings.exporter.endpoint, sink).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! The exporter can be configured via:
//! - TOML configuration file
//! - Environment variables (with `BAREOS_EXPORTER_` prefix)
//! - Command-line arguments
//!
//! See [`config::Settings`] for details.
//!
//! ## Modules
//!
//! - [`collector`] - Scrape-time collection with per-fact failure isolation
//! - [`config`] - Configuration management
//! - [`descriptors`] - Names, help texts and labels of exposed metrics
//! - [`error`] - Error types and handling
//! - [`metrics`] - Prometheus registry and text encoding
//! - [`server`] - HTTP server for exposing metrics
//! - [`status`] - Job termination status codes
//! - [`store`] - Catalog queries

pub mod collector;
pub mod config;
pub mod descriptors;
pub mod error;
pub mod metrics;
pub mod server;
pub mod status;
pub mod store;

pub use error::{ExporterError, Result};
