//! Error types for the Bareos exporter.
//!
//! This module defines custom error types using `thiserror` for structured
//! error handling throughout the application.

use std::time::Duration;
use thiserror::Error;

/// Main error type for exporter operations.
#[derive(Debug, Error)]
pub enum ExporterError {
    /// Error talking to the catalog database
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Catalog dialect not supported
    #[error("Unknown database dialect: {0}")]
    UnknownDialect(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A store round trip did not finish in time
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Client discovery failed, nothing could be collected this cycle
    #[error("Client discovery failed: {0}")]
    Discovery(Box<ExporterError>),

    /// Metrics error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// HTTP server error
    #[error("HTTP server error: {0}")]
    Server(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<prometheus::Error> for ExporterError {
    fn from(e: prometheus::Error) -> Self {
        ExporterError::Metrics(e.to_string())
    }
}

/// Result type alias for exporter operations.
pub type Result<T> = std::result::Result<T, ExporterError>;
